//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ValidationError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Missing or wrong `x-api-key`.
    Unauthorized,
    /// Rejected input.
    Validation(ValidationError),
    /// Error raised by a context handler.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Configuration(_) | DomainError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        DomainError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Publish(_) => StatusCode::BAD_GATEWAY,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, status = status.as_u16(), "request failed");
    }
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{ConfigurationError, PublishError};
    use order_store::StoreError;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn domain_errors_map_to_distinct_statuses() {
        assert_eq!(
            status_of(DomainError::from(ValidationError::BlankOrderId).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::OrderNotFound("o1".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::from(ConfigurationError::Missing("EDA_API")).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(DomainError::from(StoreError::Unavailable("down".into())).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(DomainError::from(PublishError::Transport("down".into())).into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn unauthorized_is_401() {
        assert_eq!(status_of(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
    }
}
