//! Shared-credential guard for the external context.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Requires `x-api-key` to match the configured key. No key configured
/// means the routes are open.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = &state.external_api_key {
        let presented = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if presented != Some(expected.as_str()) {
            tracing::warn!(path = %request.uri().path(), "rejected request without valid api key");
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}
