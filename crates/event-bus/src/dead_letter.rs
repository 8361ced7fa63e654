//! Dead-letter sinks for deliveries that exhausted their attempts.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::DomainEvent;
use serde::Serialize;

/// A delivery that failed on every attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    /// The original event, untouched.
    pub event: DomainEvent,
    /// Rule that matched the event.
    pub rule: String,
    /// Target identifier (handler name or endpoint URL).
    pub target: String,
    /// Number of attempts made.
    pub attempts: u32,
    /// Error from the final attempt.
    pub last_error: String,
    /// One message per failed attempt, oldest first.
    pub failures: Vec<String>,
    pub first_failed_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
}

/// Append-only destination for dead letters.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Identifier of the queue, e.g. `external-orders-api-dlq`.
    fn name(&self) -> &str;

    async fn push(&self, letter: DeadLetter);
}

/// Bounded in-memory dead-letter queue.
///
/// When full, the oldest entry is dropped to make room.
#[derive(Debug, Clone)]
pub struct InMemoryDeadLetterSink {
    name: String,
    queue: Arc<Mutex<VecDeque<DeadLetter>>>,
    max_size: usize,
}

impl InMemoryDeadLetterSink {
    pub const DEFAULT_MAX_SIZE: usize = 10_000;

    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, Self::DEFAULT_MAX_SIZE)
    }

    pub fn with_capacity(name: impl Into<String>, max_size: usize) -> Self {
        Self {
            name: name.into(),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            max_size: max_size.max(1),
        }
    }

    /// Copies of every entry, oldest first.
    pub fn entries(&self) -> Vec<DeadLetter> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every entry.
    pub fn drain(&self) -> Vec<DeadLetter> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let entries: Vec<_> = queue.drain(..).collect();
        metrics::gauge!("dead_letter_queue_size", "queue" => self.name.clone()).set(0.0);
        entries
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, letter: DeadLetter) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);

        if queue.len() >= self.max_size {
            queue.pop_front();
            tracing::warn!(
                queue = %self.name,
                max_size = self.max_size,
                "dead-letter queue at capacity, dropping oldest entry"
            );
        }

        tracing::error!(
            queue = %self.name,
            rule = %letter.rule,
            target = %letter.target,
            event_id = %letter.event.event_id(),
            attempts = letter.attempts,
            last_error = %letter.last_error,
            "event dead-lettered"
        );
        queue.push_back(letter);

        metrics::counter!("dead_letters_total", "queue" => self.name.clone()).increment(1);
        metrics::gauge!("dead_letter_queue_size", "queue" => self.name.clone())
            .set(queue.len() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BoundedContext, EventName};

    fn letter(target: &str) -> DeadLetter {
        let event = DomainEvent::builder()
            .source(BoundedContext::Internal)
            .event_name(EventName::OrderCreated)
            .data_raw(serde_json::json!({"id": "o1"}))
            .build()
            .unwrap();
        let now = Utc::now();
        DeadLetter {
            event,
            rule: "rule".to_string(),
            target: target.to_string(),
            attempts: 2,
            last_error: "boom".to_string(),
            failures: vec!["boom".to_string(), "boom".to_string()],
            first_failed_at: now,
            last_failed_at: now,
        }
    }

    #[tokio::test]
    async fn push_and_drain() {
        let sink = InMemoryDeadLetterSink::new("dlq");
        sink.push(letter("a")).await;
        sink.push(letter("b")).await;

        assert_eq!(sink.len(), 2);
        let drained = sink.drain();
        assert_eq!(drained[0].target, "a");
        assert_eq!(drained[1].target, "b");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn oldest_entry_dropped_when_full() {
        let sink = InMemoryDeadLetterSink::with_capacity("dlq", 2);
        sink.push(letter("a")).await;
        sink.push(letter("b")).await;
        sink.push(letter("c")).await;

        let targets: Vec<_> = sink.entries().into_iter().map(|l| l.target).collect();
        assert_eq!(targets, vec!["b", "c"]);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(letter("a")).unwrap();
        assert_eq!(json["lastError"], "boom");
        assert_eq!(json["event"]["metadata"]["eventName"], "OrderCreated");
    }
}
