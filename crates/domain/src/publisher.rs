//! The seam command handlers publish domain events through.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::event::DomainEvent;

/// Errors raised while handing an event to a bus.
///
/// A successful publish only means the bus accepted the event; delivery to
/// subscribers happens later and never reports back here.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The named bus is not the one this publisher reaches.
    #[error("Unknown event bus: {requested}")]
    UnknownBus { requested: String },

    /// The bus could not be reached.
    #[error("Event bus unreachable: {0}")]
    Transport(String),

    /// The bus answered but refused the event.
    #[error("Event bus rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Trait for publishing events onto a named bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes `event` to `bus`. Ownership of delivery passes to the bus.
    async fn publish(&self, bus: &str, event: DomainEvent) -> Result<(), PublishError>;
}

#[async_trait]
impl<P: EventPublisher + ?Sized> EventPublisher for Arc<P> {
    async fn publish(&self, bus: &str, event: DomainEvent) -> Result<(), PublishError> {
        (**self).publish(bus, event).await
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    published: Vec<(String, DomainEvent)>,
    fail_on_publish: bool,
}

/// In-memory publisher that records what was published.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    state: Arc<RwLock<RecordingState>>,
}

impl RecordingPublisher {
    /// Creates a new recording publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to fail every publish call.
    pub fn set_fail_on_publish(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_on_publish = fail;
        }
    }

    /// Returns every `(bus, event)` pair published so far.
    pub fn published(&self) -> Vec<(String, DomainEvent)> {
        self.state
            .read()
            .map(|s| s.published.clone())
            .unwrap_or_default()
    }

    /// Returns the events published so far, regardless of bus.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.published().into_iter().map(|(_, e)| e).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, bus: &str, event: DomainEvent) -> Result<(), PublishError> {
        let mut state = self
            .state
            .write()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        if state.fail_on_publish {
            return Err(PublishError::Transport("bus offline".to_string()));
        }

        state.published.push((bus.to_string(), event));
        Ok(())
    }
}
