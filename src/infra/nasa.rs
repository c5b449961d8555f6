//! HTTP client for the NASA Mars Rover Photos API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::application::provider::{ProviderError, RoverProvider};
use crate::config::UpstreamSettings;
use crate::domain::{EarthDate, Manifest, PhotoSet, RoverId, Sol};

use super::error::InfraError;

#[derive(Deserialize)]
struct ManifestEnvelope {
    photo_manifest: Manifest,
}

#[derive(Clone, Debug)]
pub struct NasaClient {
    client: Client,
    base: Url,
    api_key: String,
}

impl NasaClient {
    pub fn new(base: Url, api_key: impl Into<String>, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::upstream(err.to_string()))?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
            api_key: api_key.into(),
        })
    }

    pub fn from_settings(settings: &UpstreamSettings) -> Result<Self, InfraError> {
        Self::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.timeout,
        )
    }

    pub fn user_agent() -> &'static str {
        concat!("marscache/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let mut url = self.base.join(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("api_key", &self.api_key);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        debug!(path = url.path(), "requesting upstream");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok());
            return Err(ProviderError::RateLimited { retry_after });
        }

        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(ProviderError::Decode)
    }
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl RoverProvider for NasaClient {
    async fn fetch_manifest(&self, rover: &RoverId) -> Result<Manifest, ProviderError> {
        let url = self.url(&format!("manifests/{rover}"), &[])?;
        let envelope: ManifestEnvelope = self.get(url).await?;
        Ok(envelope.photo_manifest)
    }

    async fn fetch_photos_by_sol(&self, rover: &RoverId, sol: Sol) -> Result<PhotoSet, ProviderError> {
        let sol = sol.to_string();
        let url = self.url(&format!("rovers/{rover}/photos"), &[("sol", &sol)])?;
        self.get(url).await
    }

    async fn fetch_photos_by_earth_date(
        &self,
        rover: &RoverId,
        date: &EarthDate,
    ) -> Result<PhotoSet, ProviderError> {
        let url = self.url(
            &format!("rovers/{rover}/photos"),
            &[("earth_date", date.as_str())],
        )?;
        self.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer, timeout: Duration) -> NasaClient {
        let base = Url::parse(&server.url("/mars-photos/api/v1")).expect("base url");
        NasaClient::new(base, "test-key", timeout).expect("client")
    }

    fn rover() -> RoverId {
        RoverId::parse("curiosity").expect("rover")
    }

    #[tokio::test]
    async fn manifest_is_unwrapped_from_envelope() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/mars-photos/api/v1/manifests/curiosity")
                    .query_param("api_key", "test-key");
                then.status(200).json_body(json!({
                    "photo_manifest": {
                        "name": "Curiosity",
                        "status": "active",
                        "max_sol": 4102,
                        "total_photos": 695670
                    }
                }));
            })
            .await;

        let manifest = client(&server, Duration::from_secs(5))
            .fetch_manifest(&rover())
            .await
            .expect("manifest");

        mock.assert_async().await;
        assert_eq!(manifest.name, "Curiosity");
        assert_eq!(manifest.max_sol, Some(4102));
        assert_eq!(manifest.total_photos, Some(695_670));
    }

    #[tokio::test]
    async fn photos_by_sol_sends_sol_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/mars-photos/api/v1/rovers/curiosity/photos")
                    .query_param("sol", "1000")
                    .query_param("api_key", "test-key");
                then.status(200).json_body(json!({
                    "photos": [{
                        "id": 102693,
                        "sol": 1000,
                        "camera": {"id": 20, "name": "FHAZ", "rover_id": 5, "full_name": "Front Hazard Avoidance Camera"},
                        "img_src": "http://mars.jpl.nasa.gov/msl-raw-images/fhaz.JPG",
                        "earth_date": "2015-05-30",
                        "rover": {"id": 5, "name": "Curiosity", "status": "active"}
                    }]
                }));
            })
            .await;

        let photos = client(&server, Duration::from_secs(5))
            .fetch_photos_by_sol(&rover(), Sol::new(1000))
            .await
            .expect("photos");

        mock.assert_async().await;
        assert_eq!(photos.len(), 1);
        assert_eq!(photos.photos[0].camera.name, "FHAZ");
    }

    #[tokio::test]
    async fn photos_by_earth_date_sends_date_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/mars-photos/api/v1/rovers/curiosity/photos")
                    .query_param("earth_date", "2015-6-3");
                then.status(200).json_body(json!({"photos": []}));
            })
            .await;

        let date = EarthDate::parse("2015-6-3").expect("date");
        let photos = client(&server, Duration::from_secs(5))
            .fetch_photos_by_earth_date(&rover(), &date)
            .await
            .expect("photos");

        mock.assert_async().await;
        assert!(photos.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_is_reported_with_retry_after() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(429).header("Retry-After", "30").body("slow down");
            })
            .await;

        let err = client(&server, Duration::from_secs(5))
            .fetch_manifest(&rover())
            .await
            .expect_err("rate limited");

        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after: Some(30)
            }
        ));
    }

    #[tokio::test]
    async fn non_success_status_keeps_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(500).body("upstream exploded");
            })
            .await;

        let err = client(&server, Duration::from_secs(5))
            .fetch_manifest(&rover())
            .await
            .expect_err("status error");

        match err {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body("not json");
            })
            .await;

        let err = client(&server, Duration::from_secs(5))
            .fetch_photos_by_sol(&rover(), Sol::new(1))
            .await
            .expect_err("decode error");

        assert_eq!(err.kind(), "decode");
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({"photos": []}));
            })
            .await;

        let err = client(&server, Duration::from_millis(50))
            .fetch_photos_by_sol(&rover(), Sol::new(1))
            .await
            .expect_err("timeout");

        assert!(matches!(err, ProviderError::Timeout));
    }

    #[test]
    fn base_without_trailing_slash_keeps_its_path() {
        let base = with_trailing_slash(Url::parse("https://api.nasa.gov/mars-photos/api/v1").expect("url"));
        assert_eq!(
            base.join("manifests/spirit").expect("join").as_str(),
            "https://api.nasa.gov/mars-photos/api/v1/manifests/spirit"
        );
    }
}
