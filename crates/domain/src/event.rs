//! The domain event envelope exchanged between bounded contexts.

use chrono::{DateTime, Utc};
use common::{BoundedContext, EventName};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::order::Order;

/// The only envelope schema version this system reads and writes.
pub const SCHEMA_VERSION: &str = "1";

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Provenance carried in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    /// The bounded context that emitted the event.
    pub source: BoundedContext,

    /// Envelope schema version, currently always `"1"`.
    pub event_schema_version: String,

    /// What happened.
    pub event_name: EventName,

    /// Unique identifier for this event. Generated on read when absent.
    #[serde(default)]
    pub event_id: EventId,

    /// When the event was emitted. Defaults to the time it was read.
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
}

/// An immutable envelope describing a state change.
///
/// The `data` payload is kept as raw JSON: the bus never reshapes it, and
/// each consumer decodes the part it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    metadata: EventMetadata,
    data: serde_json::Value,
}

impl DomainEvent {
    /// Creates a new event builder.
    pub fn builder() -> DomainEventBuilder {
        DomainEventBuilder::default()
    }

    /// `OrderCreated` carrying the full order record.
    pub fn order_created(source: BoundedContext, order: &Order) -> serde_json::Result<Self> {
        Self::for_order(source, EventName::OrderCreated, order)
    }

    /// `OrderCancelled` carrying the full order record.
    pub fn order_cancelled(source: BoundedContext, order: &Order) -> serde_json::Result<Self> {
        Self::for_order(source, EventName::OrderCancelled, order)
    }

    fn for_order(
        source: BoundedContext,
        event_name: EventName,
        order: &Order,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            metadata: EventMetadata {
                source,
                event_schema_version: SCHEMA_VERSION.to_string(),
                event_name,
                event_id: EventId::new(),
                time: Utc::now(),
            },
            data: serde_json::to_value(order)?,
        })
    }

    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    pub fn source(&self) -> BoundedContext {
        self.metadata.source
    }

    pub fn event_name(&self) -> EventName {
        self.metadata.event_name
    }

    pub fn event_id(&self) -> EventId {
        self.metadata.event_id
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.metadata.time
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// How long ago the event was emitted, relative to `now`.
    ///
    /// Events stamped in the future report a zero age.
    pub fn age_at(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.metadata.time).to_std().unwrap_or_default()
    }

    /// Decodes the payload into a concrete type.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| ValidationError::MalformedPayload(e.to_string()))
    }
}

/// Builder for constructing events.
#[derive(Debug, Default)]
pub struct DomainEventBuilder {
    source: Option<BoundedContext>,
    event_name: Option<EventName>,
    event_id: Option<EventId>,
    time: Option<DateTime<Utc>>,
    data: Option<serde_json::Value>,
}

impl DomainEventBuilder {
    pub fn source(mut self, source: BoundedContext) -> Self {
        self.source = Some(source);
        self
    }

    pub fn event_name(mut self, event_name: EventName) -> Self {
        self.event_name = Some(event_name);
        self
    }

    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the emission time. If not set, the current time will be used.
    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn data<T: Serialize>(mut self, data: &T) -> Result<Self, serde_json::Error> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn data_raw(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Builds the event, failing if source, event name or data are missing.
    pub fn build(self) -> Result<DomainEvent, ValidationError> {
        Ok(DomainEvent {
            metadata: EventMetadata {
                source: self.source.ok_or(ValidationError::MissingField("metadata.source"))?,
                event_schema_version: SCHEMA_VERSION.to_string(),
                event_name: self
                    .event_name
                    .ok_or(ValidationError::MissingField("metadata.eventName"))?,
                event_id: self.event_id.unwrap_or_default(),
                time: self.time.unwrap_or_else(Utc::now),
            },
            data: self.data.ok_or(ValidationError::MissingField("data"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use chrono::Duration;
    use serde_json::json;

    fn order() -> Order {
        Order {
            id: "o1".into(),
            product_id: "p1".to_string(),
            quantity: 2,
            status: Some(OrderStatus::Created),
        }
    }

    #[test]
    fn order_created_envelope_has_expected_wire_shape() {
        let event = DomainEvent::order_created(BoundedContext::Internal, &order()).unwrap();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["metadata"]["source"], "com.internal.orders");
        assert_eq!(json["metadata"]["eventSchemaVersion"], "1");
        assert_eq!(json["metadata"]["eventName"], "OrderCreated");
        assert!(json["metadata"]["eventId"].is_string());
        assert_eq!(
            json["data"],
            json!({"id": "o1", "productId": "p1", "quantity": 2, "status": "created"})
        );
    }

    #[test]
    fn envelope_without_id_or_time_gets_them_on_read() {
        let raw = json!({
            "metadata": {
                "source": "com.external.orders",
                "eventSchemaVersion": "1",
                "eventName": "OrderCancelled"
            },
            "data": {"id": "o1"}
        });

        let before = Utc::now();
        let event: DomainEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.source(), BoundedContext::External);
        assert_eq!(event.event_name(), EventName::OrderCancelled);
        assert!(event.time() >= before);
    }

    #[test]
    fn age_is_measured_from_emission_time() {
        let emitted = Utc::now() - Duration::minutes(90);
        let event = DomainEvent::builder()
            .source(BoundedContext::Internal)
            .event_name(EventName::OrderCreated)
            .time(emitted)
            .data_raw(json!({}))
            .build()
            .unwrap();

        let age = event.age_at(emitted + Duration::minutes(61));
        assert_eq!(age, std::time::Duration::from_secs(61 * 60));
    }

    #[test]
    fn future_events_have_zero_age() {
        let event = DomainEvent::builder()
            .source(BoundedContext::Internal)
            .event_name(EventName::OrderCreated)
            .time(Utc::now() + Duration::minutes(5))
            .data_raw(json!({}))
            .build()
            .unwrap();

        assert_eq!(event.age_at(Utc::now()), std::time::Duration::ZERO);
    }

    #[test]
    fn builder_reports_missing_fields() {
        let err = DomainEvent::builder()
            .source(BoundedContext::Internal)
            .data_raw(json!({}))
            .build()
            .unwrap_err();

        assert_eq!(err, ValidationError::MissingField("metadata.eventName"));
    }

    #[test]
    fn decode_data_reports_malformed_payload() {
        let event = DomainEvent::builder()
            .source(BoundedContext::External)
            .event_name(EventName::OrderCancelled)
            .data_raw(json!({"id": 5}))
            .build()
            .unwrap();

        let result: Result<Order, _> = event.decode_data();
        assert!(matches!(result, Err(ValidationError::MalformedPayload(_))));
    }
}
