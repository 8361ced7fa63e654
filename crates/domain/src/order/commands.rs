//! Order commands.

use common::OrderId;
use serde::Deserialize;

/// Command to create (or idempotently re-create) an order.
///
/// Quantity is signed so that a negative value reaches validation and is
/// reported as such instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub id: OrderId,
    pub product_id: String,
    pub quantity: i64,
}

impl CreateOrder {
    /// Creates a new CreateOrder command.
    pub fn new(id: impl Into<OrderId>, product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Command to record an order as cancelled, decoded from `OrderCancelled`
/// event data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrder {
    pub id: OrderId,
    pub product_id: String,
    pub quantity: i64,
}

impl CancelOrder {
    /// Creates a new CancelOrder command.
    pub fn new(id: impl Into<OrderId>, product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Command to delete an order from the external context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOrder {
    pub id: OrderId,
}

impl DeleteOrder {
    /// Creates a new DeleteOrder command.
    pub fn new(id: impl Into<OrderId>) -> Self {
        Self { id: id.into() }
    }
}
