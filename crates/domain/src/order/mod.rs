//! Order record, commands, and state machine.

mod commands;
mod record;
pub mod state_machine;
mod status;

pub use commands::{CancelOrder, CreateOrder, DeleteOrder};
pub use record::Order;
pub use status::OrderStatus;
