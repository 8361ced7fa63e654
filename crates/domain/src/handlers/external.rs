//! External context: order creation (fed by the bus) and deletion.

use common::{BoundedContext, OrderId};
use order_store::{OrderStore, OrderStoreExt};

use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::order::{CreateOrder, DeleteOrder, Order, state_machine};
use crate::publisher::EventPublisher;

use super::settings::ExternalSettings;

/// Entry points of the external bounded context.
///
/// This context has no direct access to the bus: its publisher posts to the
/// shared event API, whose base URL is the bus identifier passed on publish.
pub struct ExternalOrders<S: OrderStore, P: EventPublisher> {
    store: S,
    publisher: P,
    settings: ExternalSettings,
}

impl<S: OrderStore, P: EventPublisher> ExternalOrders<S, P> {
    /// Creates the external handlers over a store and an event API publisher.
    pub fn new(store: S, publisher: P, settings: ExternalSettings) -> Self {
        Self {
            store,
            publisher,
            settings,
        }
    }

    /// Persists an order received from the internal context. Emits nothing.
    #[tracing::instrument(
        skip(self, cmd),
        fields(correlation_id = %uuid::Uuid::new_v4(), order_id = %cmd.id)
    )]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        let table = self.settings.table_name()?;

        let order = state_machine::create(&cmd, BoundedContext::External)?;
        self.store.put_as(table, &order.id, &order).await?;
        tracing::info!(table, "order stored");

        metrics::counter!("orders_created_total", "context" => "external").increment(1);
        Ok(order)
    }

    /// Removes an order and announces it with `OrderCancelled`.
    ///
    /// The event is only emitted when a record was actually removed; an
    /// unknown id is `OrderNotFound` and leaves the bus untouched. If the
    /// event cannot be published the record is put back, so a retried
    /// delete still finds it and raises the cancellation.
    #[tracing::instrument(
        skip(self, cmd),
        fields(correlation_id = %uuid::Uuid::new_v4(), order_id = %cmd.id)
    )]
    pub async fn delete_order(&self, cmd: DeleteOrder) -> Result<Order, DomainError> {
        let table = self.settings.table_name()?;
        let event_api = self.settings.event_api()?;

        let current: Option<Order> = self.store.get_as(table, &cmd.id).await?;
        let removed = state_machine::delete(&cmd, current)?;

        self.store.delete(table, &removed.id).await?;
        tracing::info!(table, "order deleted");

        let event = DomainEvent::order_cancelled(BoundedContext::External, &removed)?;
        let event_id = event.event_id();
        if let Err(err) = self.publisher.publish(event_api, event).await {
            tracing::warn!(error = %err, "OrderCancelled not published, restoring order");
            self.store.put_as(table, &removed.id, &removed).await?;
            return Err(err.into());
        }
        tracing::info!(%event_id, "OrderCancelled raised via event api");

        metrics::counter!("orders_deleted_total", "context" => "external").increment(1);
        Ok(removed)
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let table = self.settings.table_name()?;
        Ok(self.store.get_as(table, id).await?)
    }
}
