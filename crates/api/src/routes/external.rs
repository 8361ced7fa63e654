//! External context endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{CreateOrder, DeleteOrder, EventName, Order, OrderId, ValidationError};
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;

/// POST /external/orders: store an order in the external context.
///
/// Accepts a bare order or a bus envelope whose `data` is the order, which
/// is how the bus delivers `OrderCreated` here.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let cmd = decode_create(body)?;
    let order = state.external.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// DELETE /external/orders/{id}: remove an order and raise `OrderCancelled`.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let removed = state.external.delete_order(DeleteOrder::new(id)).await?;
    Ok(Json(removed))
}

/// GET /external/orders/{id}: fetch an order as the external context sees it.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id = OrderId::new(id);
    state
        .external
        .get_order(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {id}")))
}

fn decode_create(body: Value) -> Result<CreateOrder, ValidationError> {
    if body.get("metadata").is_some() {
        let event = event_bus::parse_envelope(body)?;
        if event.event_name() != EventName::OrderCreated {
            return Err(ValidationError::UnexpectedEvent {
                expected: EventName::OrderCreated.as_str(),
                actual: event.event_name().to_string(),
            });
        }
        return event.decode_data();
    }

    serde_json::from_value(body).map_err(|e| ValidationError::MalformedPayload(e.to_string()))
}
