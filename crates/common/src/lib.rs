//! Identities shared by both bounded contexts and the event bus.

mod types;

pub use types::{BoundedContext, EventName, OrderId, UnknownIdentifier};
