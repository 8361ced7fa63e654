//! Event bus error types.

use domain::ConfigurationError;
use thiserror::Error;

/// A single failed delivery attempt.
///
/// Every variant is treated as transient and retried until the target's
/// attempt budget runs out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The destination could not be reached or did not answer in time.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The destination answered with a non-2xx status.
    #[error("Destination responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// A local handler returned an error.
    #[error("Handler failed: {0}")]
    Handler(String),
}

/// Errors raised while assembling the bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// A rate limit of zero requests per second.
    #[error("Rate limit must be at least one request per second")]
    InvalidRateLimit,

    /// A destination setting is missing or empty.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}
