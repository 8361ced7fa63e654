//! Internal context endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{CreateOrder, Order, OrderId, ValidationError};

use crate::AppState;
use crate::error::ApiError;

/// POST /internal/orders: create an order and publish `OrderCreated`.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let cmd: CreateOrder = serde_json::from_value(body)
        .map_err(|e| ValidationError::MalformedPayload(e.to_string()))?;

    let order = state.internal.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /internal/orders/{id}: fetch an order as the internal context sees it.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id = OrderId::new(id);
    state
        .internal
        .get_order(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {id}")))
}
