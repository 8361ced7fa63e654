//! Command handlers for the two bounded contexts.
//!
//! Each handler validates input, runs the state machine, writes the result
//! to its own store, and publishes the resulting event where the flow has one.
//! Required settings are checked before anything else happens.

mod external;
mod internal;
mod settings;

pub use external::ExternalOrders;
pub use internal::InternalOrders;
pub use settings::{ExternalSettings, InternalSettings};
