use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{Instrument, debug, error, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::cache::ResourceClass;

use super::error::ApiError;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// What a request asks the gateway for, read from its path.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub class: Option<ResourceClass>,
    pub rover: Option<String>,
}

impl RequestContext {
    pub fn from_path(path: &str) -> Self {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let (class, rover) = match segments.as_slice() {
            ["mars", "manifest", rover] => (Some(ResourceClass::Manifest), Some(*rover)),
            ["mars", "photos", rover, "sol", _] => (Some(ResourceClass::Sol), Some(*rover)),
            ["mars", "photos", rover, "earthdate", _] => {
                (Some(ResourceClass::EarthDate), Some(*rover))
            }
            _ => (None, None),
        };
        Self {
            request_id: Uuid::new_v4(),
            class,
            rover: rover.map(str::to_ascii_lowercase),
        }
    }

    fn class_name(&self) -> &'static str {
        self.class.map_or("other", ResourceClass::namespace)
    }
}

/// Tag the request with a context and run it inside a span carrying the
/// resource class and rover. The id is echoed back in `x-request-id`.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_path(request.uri().path());
    let span = info_span!(
        "request",
        request_id = %ctx.request_id,
        class = ctx.class_name(),
        rover = ctx.rover.as_deref().unwrap_or("-"),
    );
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Answer 504 when the inner service has not produced a response within `limit`.
pub async fn enforce_request_timeout(
    State(limit): State<Duration>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError::request_timeout(limit).into_response(),
    }
}

/// Log each response under its resource class and rover. Failures carry the
/// attached [`ErrorReport`].
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let ctx = request.extensions().get::<RequestContext>().cloned();
    let class = ctx.as_ref().map_or("other", RequestContext::class_name);
    let rover = ctx.and_then(|ctx| ctx.rover).unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();

    if status.is_success() {
        debug!(status = status.as_u16(), class, rover = %rover, elapsed_ms, "lookup served");
        return response;
    }

    let (cause, chain) = failure_detail(response.extensions_mut().remove::<ErrorReport>());
    if status.is_server_error() {
        error!(
            status = status.as_u16(),
            class,
            rover = %rover,
            elapsed_ms,
            cause = %cause,
            chain = ?chain,
            "lookup failed"
        );
    } else if status.is_client_error() {
        warn!(
            status = status.as_u16(),
            class,
            rover = %rover,
            elapsed_ms,
            cause = %cause,
            "lookup rejected"
        );
    }

    response
}

fn failure_detail(report: Option<ErrorReport>) -> (String, Vec<String>) {
    let Some(report) = report else {
        return ("no diagnostic available".to_string(), Vec::new());
    };
    let cause = report
        .messages
        .first()
        .cloned()
        .unwrap_or_else(|| report.source.to_string());
    (cause, report.messages)
}
