//! A queue in front of the router.
//!
//! Lets a handler hold a bus publisher before the router (whose rules may
//! point back at that same handler) exists. Events are forwarded to the
//! router in the order they were enqueued.

use async_trait::async_trait;
use domain::{DomainEvent, EventPublisher, PublishError};
use tokio::sync::mpsc;

use crate::router::EventRouter;

/// Creates a publisher for `bus` and the queue it feeds.
pub fn queue(bus: impl Into<String>, capacity: usize) -> (QueuedPublisher, EventQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        QueuedPublisher {
            bus: bus.into(),
            tx,
        },
        EventQueue { rx },
    )
}

/// Enqueues events addressed to one named bus.
#[derive(Debug, Clone)]
pub struct QueuedPublisher {
    bus: String,
    tx: mpsc::Sender<DomainEvent>,
}

impl QueuedPublisher {
    pub fn bus(&self) -> &str {
        &self.bus
    }
}

#[async_trait]
impl EventPublisher for QueuedPublisher {
    async fn publish(&self, bus: &str, event: DomainEvent) -> Result<(), PublishError> {
        if bus != self.bus {
            return Err(PublishError::UnknownBus {
                requested: bus.to_string(),
            });
        }
        self.tx
            .send(event)
            .await
            .map_err(|_| PublishError::Transport("event bus stopped".to_string()))
    }
}

/// Receiving end of [`queue`].
#[derive(Debug)]
pub struct EventQueue {
    rx: mpsc::Receiver<DomainEvent>,
}

impl EventQueue {
    /// Publishes every queued event on `router` until all publishers are gone.
    pub async fn forward_to(mut self, router: EventRouter) {
        while let Some(event) = self.rx.recv().await {
            router.publish(event);
        }
        tracing::info!(bus = %router.name(), "event queue closed");
    }

    /// Takes the next queued event, if one is waiting.
    pub fn try_next(&mut self) -> Option<DomainEvent> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleTable;
    use common::{BoundedContext, EventName};

    fn event() -> DomainEvent {
        DomainEvent::builder()
            .source(BoundedContext::Internal)
            .event_name(EventName::OrderCreated)
            .data_raw(serde_json::json!({"id": "o1"}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn enqueues_events_for_its_bus() {
        let (publisher, mut queue) = queue("shared-event-bus", 8);
        let event = event();

        publisher.publish("shared-event-bus", event.clone()).await.unwrap();
        assert_eq!(queue.try_next(), Some(event));
        assert_eq!(queue.try_next(), None);
    }

    #[tokio::test]
    async fn rejects_other_bus_names() {
        let (publisher, mut queue) = queue("shared-event-bus", 8);

        let err = publisher.publish("elsewhere", event()).await.unwrap_err();
        assert!(matches!(err, PublishError::UnknownBus { .. }));
        assert_eq!(queue.try_next(), None);
    }

    #[tokio::test]
    async fn publishing_after_queue_dropped_is_transport_error() {
        let (publisher, queue) = queue("shared-event-bus", 8);
        drop(queue);

        let err = publisher.publish("shared-event-bus", event()).await.unwrap_err();
        assert!(matches!(err, PublishError::Transport(_)));
    }

    #[tokio::test]
    async fn forwarding_ends_when_publishers_are_dropped() {
        let (publisher, queue) = queue("shared-event-bus", 8);
        let router = EventRouter::new("shared-event-bus", RuleTable::default());
        let forwarder = tokio::spawn(queue.forward_to(router));

        publisher.publish("shared-event-bus", event()).await.unwrap();
        drop(publisher);

        forwarder.await.unwrap();
    }
}
