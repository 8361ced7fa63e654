//! Audit log sink: a local target that records every event it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use domain::DomainEvent;

use crate::delivery::EventHandler;
use crate::error::DeliveryError;

/// Bounded, append-only log of delivered events.
///
/// Each entry is also written as a structured `tracing` event so the log
/// survives in whatever the subscriber ships to.
#[derive(Debug, Clone)]
pub struct AuditLog {
    name: String,
    entries: Arc<Mutex<VecDeque<DomainEvent>>>,
    max_size: usize,
}

impl AuditLog {
    pub const DEFAULT_MAX_SIZE: usize = 10_000;

    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, Self::DEFAULT_MAX_SIZE)
    }

    pub fn with_capacity(name: impl Into<String>, max_size: usize) -> Self {
        Self {
            name: name.into(),
            entries: Arc::new(Mutex::new(VecDeque::new())),
            max_size: max_size.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logged events, oldest first.
    pub fn entries(&self) -> Vec<DomainEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventHandler for AuditLog {
    async fn handle(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| DeliveryError::Handler(format!("unserializable event: {e}")))?;
        tracing::info!(target: "audit", log = %self.name, event = %payload, "event");

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= self.max_size {
            entries.pop_front();
        }
        entries.push_back(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BoundedContext, EventName};

    fn event(id: &str) -> DomainEvent {
        DomainEvent::builder()
            .source(BoundedContext::Internal)
            .event_name(EventName::OrderCreated)
            .data_raw(serde_json::json!({"id": id}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn records_events_in_order() {
        let log = AuditLog::new("shared-event-logs");
        log.handle(&event("o1")).await.unwrap();
        log.handle(&event("o2")).await.unwrap();

        let ids: Vec<_> = log.entries().iter().map(|e| e.data()["id"].clone()).collect();
        assert_eq!(ids, vec!["o1", "o2"]);
    }

    #[tokio::test]
    async fn bounded_capacity_drops_oldest() {
        let log = AuditLog::with_capacity("shared-event-logs", 1);
        log.handle(&event("o1")).await.unwrap();
        log.handle(&event("o2")).await.unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].data()["id"], "o2");
    }
}
