//! HTTP API server hosting both order contexts and the shared event bus.
//!
//! Provides REST endpoints for the internal and external contexts, the
//! event ingress endpoint, and observability via structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod subscribers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use common::{BoundedContext, EventName};
use domain::{ExternalOrders, InternalOrders};
use event_bus::{
    AuditLog, BackoffPolicy, BusError, DeliveryPolicy, EventRouter, HttpDestination,
    HttpEventPublisher, InMemoryDeadLetterSink, IngressGateway, QueuedPublisher, RuleTable,
    SubscriptionRule, Target,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use subscribers::CancelOrderSubscriber;

/// Store shared by both contexts; each context writes its own table.
pub type SharedStore = Arc<dyn OrderStore>;

pub type InternalContext = InternalOrders<SharedStore, QueuedPublisher>;
pub type ExternalContext = ExternalOrders<SharedStore, HttpEventPublisher>;

pub const EXTERNAL_ORDERS_RULE: &str = "ExternalOrdersApiDestinationsRule";
pub const ORDER_CANCELLED_RULE: &str = "OrderCancelledRule";
pub const AUDIT_RULE: &str = "LogAllEventsToAuditLog";
pub const AUDIT_LOG_NAME: &str = "shared-event-logs";

const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub internal: Arc<InternalContext>,
    pub external: ExternalContext,
    pub ingress: IngressGateway,
    pub external_api_key: Option<String>,
}

/// The bus and the sinks its rules write to.
#[derive(Clone)]
pub struct Bus {
    pub router: EventRouter,
    pub dead_letters: Arc<InMemoryDeadLetterSink>,
    pub cancellation_dead_letters: Arc<InMemoryDeadLetterSink>,
    pub audit_log: Arc<AuditLog>,
}

/// Builds the rule table and router for the shared bus.
///
/// Installs three rules: internal `OrderCreated` to the external API,
/// external `OrderCancelled` to the internal cancel handler, and every event
/// to the audit log.
pub fn build_bus(config: &Config, internal: Arc<InternalContext>) -> Result<Bus, BusError> {
    let dead_letters = Arc::new(InMemoryDeadLetterSink::new(&config.dead_letter_queue));
    let cancellation_dead_letters = Arc::new(InMemoryDeadLetterSink::new(
        config.cancellation_dead_letter_queue(),
    ));
    let audit_log = Arc::new(AuditLog::new(AUDIT_LOG_NAME));

    let backoff = BackoffPolicy::new(Duration::from_millis(200), Duration::from_secs(60), 2.0);
    let retried = DeliveryPolicy::new()
        .max_attempts(config.retry_attempts)
        .max_event_age(config.max_event_age)
        .backoff(backoff);

    let external_api = HttpDestination::new(
        config.external_orders_endpoint()?,
        config.external_api_key.clone(),
        config.rate_limit_per_second,
    )?;

    let rules = RuleTable::new(vec![
        SubscriptionRule::new(EXTERNAL_ORDERS_RULE)
            .from_source(BoundedContext::Internal)
            .for_events([EventName::OrderCreated])
            .target(
                Target::remote(external_api),
                retried.clone().dead_letter(dead_letters.clone()),
            ),
        SubscriptionRule::new(ORDER_CANCELLED_RULE)
            .from_source(BoundedContext::External)
            .for_events([EventName::OrderCancelled])
            .target(
                Target::local(
                    "internal-cancel-order",
                    Arc::new(CancelOrderSubscriber::new(internal)),
                ),
                retried.dead_letter(cancellation_dead_letters.clone()),
            ),
        SubscriptionRule::new(AUDIT_RULE).target(
            Target::local(AUDIT_LOG_NAME, audit_log.clone()),
            DeliveryPolicy::new().max_attempts(3),
        ),
    ]);

    let bus_name = config.shared_event_bus.clone().unwrap_or_default();
    tracing::info!(bus = %bus_name, rules = rules.len(), "event bus configured");

    Ok(Bus {
        router: EventRouter::new(bus_name, rules),
        dead_letters,
        cancellation_dead_letters,
        audit_log,
    })
}

/// Wires both contexts to the bus and starts forwarding queued events.
///
/// Must be called from within a tokio runtime.
pub fn create_state(
    config: &Config,
    store: SharedStore,
) -> Result<(Arc<AppState>, Bus), BusError> {
    let bus_name = config.shared_event_bus.clone().unwrap_or_default();
    let (publisher, queue) = event_bus::queue(bus_name, EVENT_QUEUE_CAPACITY);

    let internal = Arc::new(InternalOrders::new(
        store.clone(),
        publisher,
        config.internal_settings(),
    ));
    let bus = build_bus(config, internal.clone())?;
    tokio::spawn(queue.forward_to(bus.router.clone()));

    let external = ExternalOrders::new(
        store,
        HttpEventPublisher::new()?,
        config.external_settings(),
    );

    let state = Arc::new(AppState {
        internal,
        external,
        ingress: IngressGateway::new(bus.router.clone()),
        external_api_key: config.external_api_key.clone(),
    });
    Ok((state, bus))
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::observability::metrics))
        .with_state(metrics_handle);

    let internal = Router::new()
        .route("/orders", post(routes::internal::create))
        .route("/orders/{id}", get(routes::internal::get));

    let external = Router::new()
        .route("/orders", post(routes::external::create))
        .route("/orders/", post(routes::external::create))
        .route(
            "/orders/{id}",
            get(routes::external::get).delete(routes::external::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(routes::observability::health))
        .route("/events", post(routes::events::publish))
        .nest("/internal", internal)
        .nest("/external", external)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
