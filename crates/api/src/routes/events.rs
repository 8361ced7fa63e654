//! Shared event API: the ingress gateway over HTTP.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub event_id: String,
    pub deliveries: usize,
}

/// POST /events: validate an envelope and publish it on the bus.
///
/// The raw body is decoded by the gateway so that malformed JSON is
/// rejected like any other invalid envelope.
#[tracing::instrument(skip(state, body))]
pub async fn publish(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AcceptedResponse>, ApiError> {
    let receipt = state.ingress.accept_body(&body)?;

    Ok(Json(AcceptedResponse {
        status: "accepted",
        event_id: receipt.event_id().to_string(),
        deliveries: receipt.len(),
    }))
}
