use std::error::Error as StdError;
use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::application::provider::ProviderError;
use crate::domain::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const UPSTREAM: &str = "upstream_error";
    pub const UPSTREAM_TIMEOUT: &str = "upstream_timeout";
    pub const REQUEST_TIMEOUT: &str = "request_timeout";
    pub const SERIALIZATION: &str = "serialization_error";
    pub const UNAVAILABLE: &str = "unavailable";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    chain: Vec<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            chain: Vec::new(),
        }
    }

    /// Keep the error's source chain for the response log without exposing it to clients.
    fn caused_by(mut self, error: &dyn StdError) -> Self {
        self.chain = ErrorReport::from_error("infra::http", self.status, error).messages;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn not_found(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, hint)
    }

    pub fn request_timeout(limit: Duration) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            codes::REQUEST_TIMEOUT,
            "Request timed out",
            Some(format!("No response within {} seconds", limit.as_secs())),
        )
    }

    pub fn serialization(error: &serde_json::Error) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::SERIALIZATION,
            "Response could not be serialized",
            None,
        )
        .caused_by(error)
    }

    pub fn unavailable(message: &'static str, error: &dyn StdError) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::UNAVAILABLE,
            message,
            None,
        )
        .caused_by(error)
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        let hint = match &error {
            DomainError::Validation { message, .. } => Some(message.clone()),
        };
        let api_error = match error.field() {
            "earth_date" => ApiError::bad_request("Earth date is required", hint),
            "sol" => ApiError::not_found("No such sol", hint),
            _ => ApiError::not_found("No such rover", hint),
        };
        api_error.caused_by(&error)
    }
}

impl From<ProviderError> for ApiError {
    fn from(error: ProviderError) -> Self {
        let api_error = match &error {
            ProviderError::Timeout => ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                codes::UPSTREAM_TIMEOUT,
                "Upstream provider timed out",
                None,
            ),
            ProviderError::RateLimited { retry_after } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                codes::RATE_LIMITED,
                "Upstream provider rate limit exceeded",
                Some(match retry_after {
                    Some(seconds) => format!("Retry after {seconds} seconds"),
                    None => "Retry later or configure a dedicated API key".to_string(),
                }),
            ),
            ProviderError::Status { status, .. } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM,
                "Upstream provider request failed",
                Some(format!("Upstream responded with status {status}")),
            ),
            ProviderError::Http(_) | ProviderError::Decode(_) | ProviderError::Url(_) => {
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    codes::UPSTREAM,
                    "Upstream provider request failed",
                    None,
                )
            }
        };
        api_error.caused_by(&error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let hint = self.hint.clone();
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();

        let mut messages = vec![format!(
            "{}: {}",
            self.code,
            hint.as_deref().unwrap_or(self.message)
        )];
        messages.extend(self.chain);
        ErrorReport {
            source: "infra::http",
            status: self.status,
            messages,
        }
        .attach(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sol_maps_to_not_found() {
        let err = ApiError::from(DomainError::validation("sol", "`abc` is not a sol"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), codes::NOT_FOUND);
    }

    #[test]
    fn empty_date_maps_to_bad_request() {
        let err = ApiError::from(DomainError::validation("earth_date", "empty"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failures_map_to_gateway_errors() {
        let timeout = ApiError::from(ProviderError::Timeout);
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.code(), codes::UPSTREAM_TIMEOUT);

        let limited = ApiError::from(ProviderError::RateLimited {
            retry_after: Some(60),
        });
        assert_eq!(limited.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(limited.code(), codes::RATE_LIMITED);

        let status = ApiError::from(ProviderError::Status {
            status: 500,
            body: String::new(),
        });
        assert_eq!(status.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(status.code(), codes::UPSTREAM);
    }

    #[test]
    fn response_carries_report_with_chain() {
        let response = ApiError::from(ProviderError::Status {
            status: 503,
            body: "maintenance".to_string(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[1].contains("maintenance"));
    }
}
