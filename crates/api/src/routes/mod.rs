pub mod auth;
pub mod events;
pub mod external;
pub mod internal;
pub mod observability;
