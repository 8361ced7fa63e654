//! Internal context: order creation and inbound cancellations.

use common::{BoundedContext, EventName, OrderId};
use order_store::{OrderStore, OrderStoreExt};

use crate::error::{DomainError, ValidationError};
use crate::event::DomainEvent;
use crate::order::{CancelOrder, CreateOrder, Order, state_machine};
use crate::publisher::EventPublisher;

use super::settings::InternalSettings;

/// Entry points of the internal bounded context.
///
/// `create_order` is driven by the HTTP API; `cancel_order` is driven by
/// `OrderCancelled` events routed from the external context.
pub struct InternalOrders<S: OrderStore, P: EventPublisher> {
    store: S,
    publisher: P,
    settings: InternalSettings,
}

impl<S: OrderStore, P: EventPublisher> InternalOrders<S, P> {
    /// Creates the internal handlers over a store and a bus publisher.
    pub fn new(store: S, publisher: P, settings: InternalSettings) -> Self {
        Self {
            store,
            publisher,
            settings,
        }
    }

    /// Persists a new order and announces it with `OrderCreated`.
    ///
    /// The record is written before the event is published. If publishing
    /// fails the record stays and the caller may retry safely.
    #[tracing::instrument(
        skip(self, cmd),
        fields(correlation_id = %uuid::Uuid::new_v4(), order_id = %cmd.id)
    )]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        let table = self.settings.table_name()?;
        let bus = self.settings.event_bus()?;

        let order = state_machine::create(&cmd, BoundedContext::Internal)?;
        self.store.put_as(table, &order.id, &order).await?;
        tracing::info!(table, "order stored");

        let event = DomainEvent::order_created(BoundedContext::Internal, &order)?;
        let event_id = event.event_id();
        self.publisher.publish(bus, event).await?;
        tracing::info!(bus, %event_id, "OrderCreated published");

        metrics::counter!("orders_created_total", "context" => "internal").increment(1);
        Ok(order)
    }

    /// Upserts a cancelled record from an `OrderCancelled` event.
    ///
    /// Works whether or not the order was ever seen here, so duplicates and
    /// out-of-order arrivals converge on the same record.
    #[tracing::instrument(
        skip(self, event),
        fields(correlation_id = %uuid::Uuid::new_v4(), event_id = %event.event_id())
    )]
    pub async fn cancel_order(&self, event: &DomainEvent) -> Result<Order, DomainError> {
        let table = self.settings.table_name()?;

        if event.event_name() != EventName::OrderCancelled {
            return Err(ValidationError::UnexpectedEvent {
                expected: EventName::OrderCancelled.as_str(),
                actual: event.event_name().to_string(),
            }
            .into());
        }

        let cmd: CancelOrder = event.decode_data()?;
        let order = state_machine::cancel(&cmd)?;
        self.store.put_as(table, &order.id, &order).await?;
        tracing::info!(order_id = %order.id, table, "order cancelled");

        metrics::counter!("orders_cancelled_total", "context" => "internal").increment(1);
        Ok(order)
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let table = self.settings.table_name()?;
        Ok(self.store.get_as(table, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;
    use crate::order::OrderStatus;
    use crate::publisher::RecordingPublisher;
    use order_store::InMemoryOrderStore;
    use serde_json::json;

    const TABLE: &str = "InternalOrdersTable";
    const BUS: &str = "shared-event-bus";

    fn settings() -> InternalSettings {
        InternalSettings {
            table_name: Some(TABLE.to_string()),
            event_bus: Some(BUS.to_string()),
        }
    }

    fn handlers() -> (
        InternalOrders<InMemoryOrderStore, RecordingPublisher>,
        InMemoryOrderStore,
        RecordingPublisher,
    ) {
        let store = InMemoryOrderStore::new();
        let publisher = RecordingPublisher::new();
        let orders = InternalOrders::new(store.clone(), publisher.clone(), settings());
        (orders, store, publisher)
    }

    fn cancelled_event(data: serde_json::Value) -> DomainEvent {
        DomainEvent::builder()
            .source(BoundedContext::External)
            .event_name(EventName::OrderCancelled)
            .data_raw(data)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn create_stores_and_publishes() {
        let (orders, store, publisher) = handlers();

        let order = orders
            .create_order(CreateOrder::new("o1", "p1", 2))
            .await
            .unwrap();
        assert_eq!(order.status, Some(OrderStatus::Created));

        let stored = store.get(TABLE, &"o1".into()).await.unwrap().unwrap();
        assert_eq!(
            stored,
            json!({"id": "o1", "productId": "p1", "quantity": 2, "status": "created"})
        );

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, BUS);
        assert_eq!(published[0].1.source(), BoundedContext::Internal);
        assert_eq!(published[0].1.event_name(), EventName::OrderCreated);
        assert_eq!(published[0].1.data(), &stored);
    }

    #[tokio::test]
    async fn create_twice_leaves_one_identical_record() {
        let (orders, store, _) = handlers();
        let cmd = CreateOrder::new("o1", "p1", 2);

        let first = orders.create_order(cmd.clone()).await.unwrap();
        let second = orders.create_order(cmd).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.record_count(TABLE).await, 1);
    }

    #[tokio::test]
    async fn invalid_create_changes_nothing() {
        let (orders, store, publisher) = handlers();

        let err = orders
            .create_order(CreateOrder::new("o1", "p1", -3))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(store.record_count(TABLE).await, 0);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn missing_bus_is_a_configuration_error_before_any_write() {
        let store = InMemoryOrderStore::new();
        let publisher = RecordingPublisher::new();
        let orders = InternalOrders::new(
            store.clone(),
            publisher,
            InternalSettings {
                table_name: Some(TABLE.to_string()),
                event_bus: None,
            },
        );

        let err = orders
            .create_order(CreateOrder::new("o1", "p1", 2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Configuration(ConfigurationError::Missing("SHARED_EVENT_BUS"))
        ));
        assert_eq!(store.record_count(TABLE).await, 0);
    }

    #[tokio::test]
    async fn storage_failure_propagates_without_publishing() {
        let (orders, store, publisher) = handlers();
        store.set_unavailable(true);

        let err = orders
            .create_order(CreateOrder::new("o1", "p1", 2))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Storage(_)));
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn publish_failure_is_reported_after_the_write() {
        let (orders, store, publisher) = handlers();
        publisher.set_fail_on_publish(true);

        let err = orders
            .create_order(CreateOrder::new("o1", "p1", 2))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Publish(_)));
        assert_eq!(store.record_count(TABLE).await, 1);
    }

    #[tokio::test]
    async fn cancel_without_prior_record_upserts() {
        let (orders, store, _) = handlers();

        let order = orders
            .cancel_order(&cancelled_event(
                json!({"id": "o9", "productId": "p9", "quantity": 4}),
            ))
            .await
            .unwrap();

        assert!(order.is_cancelled());
        let stored = store.get(TABLE, &"o9".into()).await.unwrap().unwrap();
        assert_eq!(
            stored,
            json!({"id": "o9", "productId": "p9", "quantity": 4, "status": "cancelled"})
        );
    }

    #[tokio::test]
    async fn cancel_overwrites_created_record() {
        let (orders, _, _) = handlers();
        orders
            .create_order(CreateOrder::new("o1", "p1", 2))
            .await
            .unwrap();

        orders
            .cancel_order(&cancelled_event(
                json!({"id": "o1", "productId": "p1", "quantity": 2}),
            ))
            .await
            .unwrap();

        let order = orders.get_order(&"o1".into()).await.unwrap().unwrap();
        assert_eq!(order.status, Some(OrderStatus::Cancelled));
    }

    #[tokio::test]
    async fn duplicate_cancellations_converge() {
        let (orders, store, _) = handlers();
        let event = cancelled_event(json!({"id": "o1", "productId": "p1", "quantity": 2}));

        let first = orders.cancel_order(&event).await.unwrap();
        let second = orders.cancel_order(&event).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.record_count(TABLE).await, 1);
    }

    #[tokio::test]
    async fn cancel_rejects_other_event_kinds() {
        let (orders, _, _) = handlers();
        let event = DomainEvent::builder()
            .source(BoundedContext::Internal)
            .event_name(EventName::OrderCreated)
            .data_raw(json!({"id": "o1", "productId": "p1", "quantity": 2}))
            .build()
            .unwrap();

        let err = orders.cancel_order(&event).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::UnexpectedEvent { .. })
        ));
    }

    #[tokio::test]
    async fn cancel_rejects_malformed_payload() {
        let (orders, _, _) = handlers();

        let err = orders
            .cancel_order(&cancelled_event(json!({"id": "o1"})))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::MalformedPayload(_))
        ));
    }
}
