//! The shared event bus connecting the internal and external contexts.
//!
//! This crate provides:
//! - Subscription rules matching events by source and event name
//! - An `EventRouter` that fans each event out to every matching target
//! - Retried delivery with backoff, expiry, rate limiting and dead letters
//! - The ingress gateway validating envelopes submitted over HTTP
//! - A queued publisher feeding the router
//! - An HTTP publisher for contexts that reach the bus through its API

pub mod audit;
pub mod dead_letter;
pub mod delivery;
pub mod destination;
pub mod error;
pub mod http_publisher;
pub mod ingress;
pub mod queue;
pub mod retry;
pub mod router;
pub mod rules;

pub use audit::AuditLog;
pub use dead_letter::{DeadLetter, DeadLetterSink, InMemoryDeadLetterSink};
pub use delivery::{DeliveryOutcome, EventHandler, deliver};
pub use destination::HttpDestination;
pub use error::{BusError, DeliveryError};
pub use http_publisher::HttpEventPublisher;
pub use ingress::{IngressGateway, parse_envelope};
pub use queue::{EventQueue, QueuedPublisher, queue};
pub use retry::BackoffPolicy;
pub use router::{DeliveryReport, EventRouter, PublishReceipt};
pub use rules::{
    DeliveryPolicy, EventPattern, RuleTable, RuleTarget, SourcePattern, SubscriptionRule, Target,
};
