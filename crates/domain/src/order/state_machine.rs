//! Pure transitions from a command (and the current record) to a new record.
//!
//! Nothing here touches a store or the bus. Handlers call these functions and
//! persist whatever they return, which keeps every write a full overwrite.

use common::{BoundedContext, OrderId};

use crate::error::{DomainError, ValidationError};

use super::{CancelOrder, CreateOrder, DeleteOrder, Order, OrderStatus};

/// `absent → created`. Re-running with the same input yields the same record.
///
/// The external context's record shape has no status.
pub fn create(cmd: &CreateOrder, context: BoundedContext) -> Result<Order, ValidationError> {
    let quantity = validate(&cmd.id, cmd.quantity)?;
    let status = match context {
        BoundedContext::Internal => Some(OrderStatus::Created),
        BoundedContext::External => None,
    };

    Ok(Order {
        id: cmd.id.clone(),
        product_id: cmd.product_id.clone(),
        quantity,
        status,
    })
}

/// `* → cancelled`, with or without a prior record.
///
/// A cancellation that overtakes its creation still converges, since the
/// result depends only on the event payload.
pub fn cancel(cmd: &CancelOrder) -> Result<Order, ValidationError> {
    let quantity = validate(&cmd.id, cmd.quantity)?;

    Ok(Order {
        id: cmd.id.clone(),
        product_id: cmd.product_id.clone(),
        quantity,
        status: Some(OrderStatus::Cancelled),
    })
}

/// `present → absent`, returning the record being removed.
pub fn delete(cmd: &DeleteOrder, current: Option<Order>) -> Result<Order, DomainError> {
    if cmd.id.is_blank() {
        return Err(ValidationError::BlankOrderId.into());
    }
    current.ok_or_else(|| DomainError::OrderNotFound(cmd.id.clone()))
}

fn validate(id: &OrderId, quantity: i64) -> Result<u32, ValidationError> {
    if id.is_blank() {
        return Err(ValidationError::BlankOrderId);
    }
    if quantity < 0 {
        return Err(ValidationError::NegativeQuantity { quantity });
    }
    u32::try_from(quantity).map_err(|_| ValidationError::QuantityTooLarge { quantity })
}
