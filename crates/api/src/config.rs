//! Application configuration loaded from environment variables.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use domain::{ConfigurationError, ExternalSettings, InternalSettings};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_INTERNAL_TABLE: &str = "InternalOrdersTable";
pub const DEFAULT_EXTERNAL_TABLE: &str = "ExternalOrdersTable";
pub const DEFAULT_EVENT_BUS: &str = "shared-event-bus";
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 10;
pub const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 50;
pub const DEFAULT_MAX_EVENT_AGE_SECS: u64 = 3600;
pub const DEFAULT_DEAD_LETTER_QUEUE: &str = "external-orders-api-dlq";

/// Server, context and bus configuration.
///
/// Reads from environment variables:
/// - `HOST` (default: `"0.0.0.0"`) and `PORT` (default: `3000`)
/// - `RUST_LOG` (default: `"info"`)
/// - `INTERNAL_TABLE_NAME` / `EXTERNAL_TABLE_NAME`
/// - `SHARED_EVENT_BUS`
/// - `EDA_API` (default: `http://127.0.0.1:$PORT`)
/// - `EXTERNAL_API` (default: `http://127.0.0.1:$PORT/external`)
/// - `EXTERNAL_API_KEY` (unset by default)
/// - `RETRY_ATTEMPTS`, `RATE_LIMIT_PER_SECOND`, `MAX_EVENT_AGE_SECS`
/// - `DEAD_LETTER_QUEUE`
/// - `DATABASE_URL` (PostgreSQL when set, in-memory otherwise)
///
/// Handler settings keep an explicitly empty value as `Some("")`; the
/// handlers then report it as missing configuration on first use.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub internal_table_name: Option<String>,
    pub external_table_name: Option<String>,
    pub shared_event_bus: Option<String>,
    pub eda_api: Option<String>,
    pub external_api: Option<String>,
    pub external_api_key: Option<String>,
    pub retry_attempts: u32,
    pub rate_limit_per_second: u32,
    pub max_event_age: Duration,
    pub dead_letter_queue: String,
    pub database_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);
        let setting = |key: &str, default: String| Some(lookup(key).unwrap_or(default));

        Self {
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            internal_table_name: setting("INTERNAL_TABLE_NAME", DEFAULT_INTERNAL_TABLE.into()),
            external_table_name: setting("EXTERNAL_TABLE_NAME", DEFAULT_EXTERNAL_TABLE.into()),
            shared_event_bus: setting("SHARED_EVENT_BUS", DEFAULT_EVENT_BUS.into()),
            eda_api: setting("EDA_API", format!("http://127.0.0.1:{port}")),
            external_api: setting("EXTERNAL_API", format!("http://127.0.0.1:{port}/external")),
            external_api_key: lookup("EXTERNAL_API_KEY").filter(|key| !key.is_empty()),
            retry_attempts: parse_or(&lookup, "RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS),
            rate_limit_per_second: parse_or(
                &lookup,
                "RATE_LIMIT_PER_SECOND",
                DEFAULT_RATE_LIMIT_PER_SECOND,
            ),
            max_event_age: Duration::from_secs(parse_or(
                &lookup,
                "MAX_EVENT_AGE_SECS",
                DEFAULT_MAX_EVENT_AGE_SECS,
            )),
            dead_letter_queue: lookup("DEAD_LETTER_QUEUE")
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_DEAD_LETTER_QUEUE.to_string()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn internal_settings(&self) -> InternalSettings {
        InternalSettings {
            table_name: self.internal_table_name.clone(),
            event_bus: self.shared_event_bus.clone(),
        }
    }

    pub fn external_settings(&self) -> ExternalSettings {
        ExternalSettings {
            table_name: self.external_table_name.clone(),
            event_api: self.eda_api.clone(),
        }
    }

    /// Endpoint the bus delivers `OrderCreated` to.
    ///
    /// An empty `EXTERNAL_API` is missing configuration rather than a
    /// relative endpoint.
    pub fn external_orders_endpoint(&self) -> Result<String, ConfigurationError> {
        let base = self
            .external_api
            .as_deref()
            .map(|base| base.trim().trim_end_matches('/'))
            .filter(|base| !base.is_empty())
            .ok_or(ConfigurationError::Missing("EXTERNAL_API"))?;
        Ok(format!("{base}/orders/"))
    }

    /// Dead-letter queue for failed cancellations into the internal context.
    pub fn cancellation_dead_letter_queue(&self) -> String {
        format!("{}-cancellations", self.dead_letter_queue)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Parses a numeric setting. Unparseable or zero values fall back to the
/// default with a warning.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + PartialEq + Default + Display + Copy,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => value,
        Ok(_) => {
            tracing::warn!(key, %default, "setting must be greater than zero, using default");
            default
        }
        Err(err) => {
            tracing::warn!(key, value = %raw, error = %err, %default, "invalid setting, using default");
            default
        }
    }
}
