//! Runtime settings the handlers require.

use crate::error::ConfigurationError;

/// Settings for the internal context's handlers.
#[derive(Debug, Clone, Default)]
pub struct InternalSettings {
    /// Store table holding internal order records.
    pub table_name: Option<String>,
    /// Name of the shared bus `OrderCreated` is published to.
    pub event_bus: Option<String>,
}

impl InternalSettings {
    pub fn table_name(&self) -> Result<&str, ConfigurationError> {
        require(&self.table_name, "INTERNAL_TABLE_NAME")
    }

    pub fn event_bus(&self) -> Result<&str, ConfigurationError> {
        require(&self.event_bus, "SHARED_EVENT_BUS")
    }
}

/// Settings for the external context's handlers.
#[derive(Debug, Clone, Default)]
pub struct ExternalSettings {
    /// Store table holding external order records.
    pub table_name: Option<String>,
    /// Base URL of the shared event API that cancellations are posted to.
    pub event_api: Option<String>,
}

impl ExternalSettings {
    pub fn table_name(&self) -> Result<&str, ConfigurationError> {
        require(&self.table_name, "EXTERNAL_TABLE_NAME")
    }

    pub fn event_api(&self) -> Result<&str, ConfigurationError> {
        require(&self.event_api, "EDA_API")
    }
}

/// An empty value counts as missing.
fn require<'a>(
    value: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, ConfigurationError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigurationError::Missing(name)),
    }
}
