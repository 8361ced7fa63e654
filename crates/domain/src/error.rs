//! Domain error types.

use common::{OrderId, UnknownIdentifier};
use order_store::StoreError;
use thiserror::Error;

use crate::publisher::PublishError;

/// Bad or missing input. The caller fixes and resubmits; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The order id is empty.
    #[error("Order id is required")]
    BlankOrderId,

    /// Quantity is below zero.
    #[error("Invalid quantity: {quantity} (must be zero or greater)")]
    NegativeQuantity { quantity: i64 },

    /// Quantity does not fit the record.
    #[error("Invalid quantity: {quantity} (too large)")]
    QuantityTooLarge { quantity: i64 },

    /// A required envelope field is missing or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field that must be a JSON object is something else.
    #[error("Field {0} must be an object")]
    NotAnObject(&'static str),

    /// The source or event name is not one the bus knows.
    #[error(transparent)]
    UnknownIdentifier(#[from] UnknownIdentifier),

    /// The envelope uses a schema version this system cannot read.
    #[error("Unsupported event schema version: {0}")]
    UnsupportedSchemaVersion(String),

    /// The event is not the kind the handler consumes.
    #[error("Unexpected event {actual}, expected {expected}")]
    UnexpectedEvent {
        expected: &'static str,
        actual: String,
    },

    /// The payload could not be decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// A required runtime setting is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input was rejected before any state changed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The handler is missing configuration it needs.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The order store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The resulting event could not be handed to the bus.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
