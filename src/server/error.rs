use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::responses::ErrorBody;
use crate::domain::schema::ValidationError;
use crate::outbound::discord::DeliveryError;

/// Every way the webhook endpoint can refuse a request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Invalid webhook payload: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::Delivery(_) => StatusCode::BAD_REQUEST,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::RateLimited { .. } => ErrorBody::with_code(
                "Too many requests, please try again later",
                "rate_limit_exceeded",
            ),
            ApiError::InvalidSignature => {
                ErrorBody::with_code("Signature verification failed", "invalid_signature")
            }
            ApiError::Validation(_) | ApiError::Delivery(_) => {
                ErrorBody::new("Request processing failed")
            }
            ApiError::Unexpected(_) => ErrorBody::new("Internal server error"),
        }
    }
}

/// Whole seconds, rounded up, never below one.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::RateLimited { .. } | ApiError::InvalidSignature => {
                tracing::warn!(status = status.as_u16(), "{self}")
            }
            ApiError::Validation(_) | ApiError::Delivery(_) => {
                tracing::warn!(status = status.as_u16(), error = %self, "Webhook rejected")
            }
            ApiError::Unexpected(_) => {
                tracing::error!(status = status.as_u16(), error = %self, "Webhook handling failed")
            }
        }

        let mut response = (status, Json(self.body())).into_response();

        if let ApiError::RateLimited { retry_after } = self {
            response.headers_mut().insert(
                RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::RateLimited { retry_after: Duration::from_secs(1) }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ApiError::InvalidSignature.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Validation(ValidationError::new("id", "must not be empty")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unexpected("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), 2);
        assert_eq!(retry_after_secs(Duration::from_secs(42)), 42);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn test_rate_limited_response_sets_header() {
        let response = ApiError::RateLimited {
            retry_after: Duration::from_secs(30),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "30");
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = ApiError::Validation(ValidationError::new("payload.links.deployment", "url"));
        let body = serde_json::to_value(err.body()).unwrap();

        assert_eq!(body["error"], "Request processing failed");
        assert!(!body.to_string().contains("payload.links"));
    }
}
