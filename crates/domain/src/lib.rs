//! Domain layer for the order choreography system.
//!
//! This crate provides:
//! - The order record and its state machine
//! - The `DomainEvent` envelope exchanged between bounded contexts
//! - The `EventPublisher` seam the handlers publish through
//! - Command handlers for the internal and external contexts

pub mod error;
pub mod event;
pub mod handlers;
pub mod order;
pub mod publisher;

pub use common::{BoundedContext, EventName, OrderId};
pub use error::{ConfigurationError, DomainError, ValidationError};
pub use event::{DomainEvent, DomainEventBuilder, EventId, EventMetadata, SCHEMA_VERSION};
pub use handlers::{ExternalOrders, ExternalSettings, InternalOrders, InternalSettings};
pub use order::{CancelOrder, CreateOrder, DeleteOrder, Order, OrderStatus, state_machine};
pub use publisher::{EventPublisher, PublishError, RecordingPublisher};
