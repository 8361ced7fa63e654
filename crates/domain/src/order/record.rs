//! The order record as stored by each bounded context.

use common::OrderId;
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// A stored order.
///
/// The external context never reads `status`, so its records leave it out
/// entirely rather than storing a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub product_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl Order {
    /// Returns true if the order carries the cancelled status.
    pub fn is_cancelled(&self) -> bool {
        self.status == Some(OrderStatus::Cancelled)
    }
}
