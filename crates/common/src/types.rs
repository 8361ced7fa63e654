use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-supplied identifier of an order.
///
/// Orders are keyed by the id the caller chose, so this is a plain string
/// rather than a generated UUID. Emptiness is checked by the state machine,
/// not here, so that invalid input can still be reported back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the ID is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error returned when a source or event name string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownIdentifier {
    pub kind: &'static str,
    pub value: String,
}

/// The bounded contexts that publish onto the shared bus.
///
/// Serialized as the namespace string carried in `metadata.source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundedContext {
    #[serde(rename = "com.internal.orders")]
    Internal,

    #[serde(rename = "com.external.orders")]
    External,
}

impl BoundedContext {
    /// Returns the source namespace of this context.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundedContext::Internal => "com.internal.orders",
            BoundedContext::External => "com.external.orders",
        }
    }
}

impl std::fmt::Display for BoundedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundedContext {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "com.internal.orders" => Ok(BoundedContext::Internal),
            "com.external.orders" => Ok(BoundedContext::External),
            other => Err(UnknownIdentifier {
                kind: "event source",
                value: other.to_string(),
            }),
        }
    }
}

/// Kinds of domain events exchanged between the contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    OrderCreated,
    OrderCancelled,
}

impl EventName {
    /// Returns the event name as carried in `metadata.eventName`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::OrderCreated => "OrderCreated",
            EventName::OrderCancelled => "OrderCancelled",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OrderCreated" => Ok(EventName::OrderCreated),
            "OrderCancelled" => Ok(EventName::OrderCancelled),
            other => Err(UnknownIdentifier {
                kind: "event name",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_blank_detection() {
        assert!(OrderId::new("").is_blank());
        assert!(OrderId::new("   ").is_blank());
        assert!(!OrderId::new("o1").is_blank());
    }

    #[test]
    fn order_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&OrderId::new("o1")).unwrap();
        assert_eq!(json, "\"o1\"");
    }

    #[test]
    fn bounded_context_uses_namespace_on_the_wire() {
        let json = serde_json::to_string(&BoundedContext::External).unwrap();
        assert_eq!(json, "\"com.external.orders\"");

        let parsed: BoundedContext = serde_json::from_str("\"com.internal.orders\"").unwrap();
        assert_eq!(parsed, BoundedContext::Internal);
    }

    #[test]
    fn bounded_context_from_str_matches_serde() {
        for context in [BoundedContext::Internal, BoundedContext::External] {
            assert_eq!(context.as_str().parse::<BoundedContext>().unwrap(), context);
        }
    }

    #[test]
    fn unknown_source_is_rejected() {
        let err = "com.other.orders".parse::<BoundedContext>().unwrap_err();
        assert_eq!(err.kind, "event source");
        assert_eq!(err.to_string(), "unknown event source: com.other.orders");
    }

    #[test]
    fn event_name_round_trips_through_str() {
        assert_eq!("OrderCancelled".parse::<EventName>().unwrap(), EventName::OrderCancelled);
        assert_eq!(EventName::OrderCreated.to_string(), "OrderCreated");
        assert!("OrderShipped".parse::<EventName>().is_err());
    }
}
