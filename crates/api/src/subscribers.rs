//! Bus subscribers backed by context handlers.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{DomainEvent, EventPublisher, InternalOrders};
use event_bus::{DeliveryError, EventHandler};
use order_store::OrderStore;

/// Feeds `OrderCancelled` events into the internal context.
pub struct CancelOrderSubscriber<S: OrderStore, P: EventPublisher> {
    orders: Arc<InternalOrders<S, P>>,
}

impl<S: OrderStore, P: EventPublisher> CancelOrderSubscriber<S, P> {
    pub fn new(orders: Arc<InternalOrders<S, P>>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl<S: OrderStore, P: EventPublisher> EventHandler for CancelOrderSubscriber<S, P> {
    async fn handle(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
        self.orders
            .cancel_order(event)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::Handler(e.to_string()))
    }
}
