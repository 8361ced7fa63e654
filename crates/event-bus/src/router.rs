//! Fan-out of published events to every matching rule target.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainEvent, EventId, EventPublisher, PublishError};
use futures_util::future::join_all;
use tokio::task::JoinHandle;

use crate::delivery::{DeliveryOutcome, deliver};
use crate::rules::RuleTable;

/// Routes events on one named bus.
///
/// Each (event, target) pair is delivered on its own spawned task, so a slow
/// or failing target never holds up the others or the publisher.
#[derive(Debug, Clone)]
pub struct EventRouter {
    name: String,
    rules: Arc<RuleTable>,
}

impl EventRouter {
    pub fn new(name: impl Into<String>, rules: RuleTable) -> Self {
        Self {
            name: name.into(),
            rules: Arc::new(rules),
        }
    }

    /// The bus name events must be addressed to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Dispatches `event` to every matching target and returns immediately.
    ///
    /// Must be called from within a tokio runtime. Dropping the receipt
    /// leaves the deliveries running.
    #[tracing::instrument(
        skip(self, event),
        fields(
            bus = %self.name,
            event_id = %event.event_id(),
            source = %event.source(),
            event_name = %event.event_name()
        )
    )]
    pub fn publish(&self, event: DomainEvent) -> PublishReceipt {
        metrics::counter!("events_published_total", "event_name" => event.event_name().as_str())
            .increment(1);

        let event_id = event.event_id();
        let event = Arc::new(event);
        let mut deliveries = Vec::new();

        for rule in self.rules.matching(&event) {
            for rule_target in rule.targets() {
                let rule_name = rule.name().to_string();
                let target_id = rule_target.target.id().to_string();
                let rule_target = rule_target.clone();
                let event = Arc::clone(&event);

                tracing::debug!(rule = %rule_name, target = %target_id, "dispatching");
                let task_rule = rule_name.clone();
                let handle =
                    tokio::spawn(async move { deliver(&task_rule, &rule_target, &event).await });

                deliveries.push(DeliveryTicket {
                    rule: rule_name,
                    target: target_id,
                    handle,
                });
            }
        }

        if deliveries.is_empty() {
            tracing::debug!("no rule matched, event dropped");
        }

        PublishReceipt {
            event_id,
            deliveries,
        }
    }
}

#[async_trait]
impl EventPublisher for EventRouter {
    async fn publish(&self, bus: &str, event: DomainEvent) -> Result<(), PublishError> {
        if bus != self.name {
            return Err(PublishError::UnknownBus {
                requested: bus.to_string(),
            });
        }
        EventRouter::publish(self, event);
        Ok(())
    }
}

struct DeliveryTicket {
    rule: String,
    target: String,
    handle: JoinHandle<DeliveryOutcome>,
}

/// The set of deliveries started for one published event.
pub struct PublishReceipt {
    event_id: EventId,
    deliveries: Vec<DeliveryTicket>,
}

impl PublishReceipt {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Number of deliveries dispatched.
    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// `(rule, target)` for every dispatched delivery.
    pub fn targets(&self) -> Vec<(String, String)> {
        self.deliveries
            .iter()
            .map(|d| (d.rule.clone(), d.target.clone()))
            .collect()
    }

    /// Waits for every delivery to finish.
    pub async fn wait_all(self) -> Vec<DeliveryReport> {
        let (labels, handles): (Vec<_>, Vec<_>) = self
            .deliveries
            .into_iter()
            .map(|d| ((d.rule, d.target), d.handle))
            .unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(labels)
            .map(|(result, (rule, target))| {
                let outcome = result.unwrap_or_else(|err| {
                    tracing::error!(%rule, %target, error = %err, "delivery task aborted");
                    DeliveryOutcome::Aborted
                });
                DeliveryReport {
                    rule,
                    target,
                    outcome,
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for PublishReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishReceipt")
            .field("event_id", &self.event_id)
            .field("deliveries", &self.targets())
            .finish()
    }
}

/// Result of one delivery from a [`PublishReceipt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub rule: String,
    pub target: String,
    pub outcome: DeliveryOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{DeliveryPolicy, SubscriptionRule, Target};
    use crate::{DeliveryError, EventHandler};
    use common::{BoundedContext, EventName};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        seen: Mutex<Vec<EventId>>,
    }

    #[async_trait]
    impl EventHandler for Collecting {
        async fn handle(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
            self.seen.lock().unwrap().push(event.event_id());
            Ok(())
        }
    }

    fn created() -> DomainEvent {
        DomainEvent::builder()
            .source(BoundedContext::Internal)
            .event_name(EventName::OrderCreated)
            .data_raw(serde_json::json!({"id": "o1", "productId": "p1", "quantity": 2}))
            .build()
            .unwrap()
    }

    fn router(handler: Arc<Collecting>) -> EventRouter {
        EventRouter::new(
            "shared-event-bus",
            RuleTable::new(vec![
                SubscriptionRule::new("created")
                    .from_source(BoundedContext::Internal)
                    .for_events([EventName::OrderCreated])
                    .target(Target::local("collector", handler), DeliveryPolicy::new()),
            ]),
        )
    }

    #[tokio::test]
    async fn publish_dispatches_to_matching_target() {
        let handler = Arc::new(Collecting::default());
        let router = router(handler.clone());
        let event = created();
        let event_id = event.event_id();

        let receipt = router.publish(event);
        assert_eq!(receipt.event_id(), event_id);
        assert_eq!(
            receipt.targets(),
            vec![("created".to_string(), "collector".to_string())]
        );

        let reports = receipt.wait_all().await;
        assert_eq!(reports[0].outcome, DeliveryOutcome::Delivered { attempts: 1 });
        assert_eq!(*handler.seen.lock().unwrap(), vec![event_id]);
    }

    #[tokio::test]
    async fn unmatched_event_yields_empty_receipt() {
        let router = router(Arc::new(Collecting::default()));
        let cancelled = DomainEvent::builder()
            .source(BoundedContext::External)
            .event_name(EventName::OrderCancelled)
            .data_raw(serde_json::json!({}))
            .build()
            .unwrap();

        let receipt = router.publish(cancelled);
        assert!(receipt.is_empty());
        assert!(receipt.wait_all().await.is_empty());
    }

    #[tokio::test]
    async fn publisher_seam_rejects_other_bus_names() {
        let router = router(Arc::new(Collecting::default()));

        let err = EventPublisher::publish(&router, "another-bus", created())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::UnknownBus { requested } if requested == "another-bus"));

        EventPublisher::publish(&router, "shared-event-bus", created())
            .await
            .unwrap();
    }
}
