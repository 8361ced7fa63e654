//! Ingress gateway: validates envelopes submitted over HTTP and republishes
//! them onto the router as if they were published locally.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{BoundedContext, EventName};
use domain::{DomainEvent, EventId, SCHEMA_VERSION, ValidationError};
use serde_json::{Map, Value};

use crate::router::{EventRouter, PublishReceipt};

/// Front door for events arriving from outside the process.
#[derive(Debug, Clone)]
pub struct IngressGateway {
    router: EventRouter,
}

impl IngressGateway {
    pub fn new(router: EventRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Decodes a raw request body as JSON and hands it to [`accept`].
    ///
    /// [`accept`]: IngressGateway::accept
    pub fn accept_body(&self, body: &[u8]) -> Result<PublishReceipt, ValidationError> {
        let envelope = serde_json::from_slice(body)
            .map_err(|e| ValidationError::MalformedPayload(e.to_string()))
            .inspect_err(reject)?;
        self.accept(envelope)
    }

    /// Validates `envelope` and publishes it. Nothing is published on error.
    #[tracing::instrument(skip(self, envelope))]
    pub fn accept(&self, envelope: Value) -> Result<PublishReceipt, ValidationError> {
        let event = parse_envelope(envelope).inspect_err(reject)?;

        tracing::info!(
            event_id = %event.event_id(),
            source = %event.source(),
            event_name = %event.event_name(),
            "envelope accepted"
        );
        Ok(self.router.publish(event))
    }
}

fn reject(err: &ValidationError) {
    tracing::warn!(error = %err, "envelope rejected");
    metrics::counter!("ingress_rejected_total").increment(1);
}

/// Parses a raw JSON envelope into a [`DomainEvent`].
///
/// `metadata.source` and `metadata.eventName` must name a known context and
/// event. `eventSchemaVersion` defaults to `"1"`; `eventId` and `time` are
/// stamped when absent. `data` passes through untouched.
pub fn parse_envelope(envelope: Value) -> Result<DomainEvent, ValidationError> {
    let Value::Object(mut envelope) = envelope else {
        return Err(ValidationError::NotAnObject("envelope"));
    };

    let metadata = match envelope.remove("metadata") {
        Some(Value::Object(metadata)) => metadata,
        Some(_) => return Err(ValidationError::NotAnObject("metadata")),
        None => return Err(ValidationError::MissingField("metadata")),
    };

    let source = BoundedContext::from_str(required_str(&metadata, "source", "metadata.source")?)?;
    let event_name =
        EventName::from_str(required_str(&metadata, "eventName", "metadata.eventName")?)?;

    match metadata.get("eventSchemaVersion") {
        None | Some(Value::Null) => {}
        Some(Value::String(version)) if version == SCHEMA_VERSION => {}
        Some(other) => {
            return Err(ValidationError::UnsupportedSchemaVersion(other.to_string()));
        }
    }

    let data = match envelope.remove("data") {
        Some(Value::Null) | None => return Err(ValidationError::MissingField("data")),
        Some(data) => data,
    };

    let mut builder = DomainEvent::builder()
        .source(source)
        .event_name(event_name)
        .data_raw(data);

    if let Some(id) = optional::<EventId>(&metadata, "eventId")? {
        builder = builder.event_id(id);
    }
    if let Some(time) = optional::<DateTime<Utc>>(&metadata, "time")? {
        builder = builder.time(time);
    }

    builder.build()
}

fn required_str<'a>(
    metadata: &'a Map<String, Value>,
    key: &str,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn optional<T: serde::de::DeserializeOwned>(
    metadata: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>, ValidationError> {
    match metadata.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ValidationError::MalformedPayload(format!("metadata.{key}: {e}"))),
    }
}
