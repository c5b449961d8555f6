//! Upstream data provider contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{EarthDate, Manifest, PhotoSet, RoverId, Sol};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream request failed: {0}")]
    Http(#[source] reqwest::Error),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("upstream url is invalid: {0}")]
    Url(#[from] url::ParseError),
}

impl ProviderError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Http(_) => "http",
            ProviderError::Status { .. } => "status",
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::Timeout => "timeout",
            ProviderError::Decode(_) => "decode",
            ProviderError::Url(_) => "url",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// Source of truth for rover manifests and photo listings.
#[async_trait]
pub trait RoverProvider: Send + Sync {
    async fn fetch_manifest(&self, rover: &RoverId) -> Result<Manifest, ProviderError>;

    async fn fetch_photos_by_sol(&self, rover: &RoverId, sol: Sol)
    -> Result<PhotoSet, ProviderError>;

    async fn fetch_photos_by_earth_date(
        &self,
        rover: &RoverId,
        date: &EarthDate,
    ) -> Result<PhotoSet, ProviderError>;
}
