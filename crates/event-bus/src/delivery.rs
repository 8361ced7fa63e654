//! Delivery of one event to one target under its policy.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use domain::DomainEvent;

use crate::dead_letter::DeadLetter;
use crate::error::DeliveryError;
use crate::rules::RuleTarget;

/// In-process subscriber invoked by the bus.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one delivery. An `Err` counts as a failed attempt.
    async fn handle(&self, event: &DomainEvent) -> Result<(), DeliveryError>;
}

/// How a delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The target accepted the event.
    Delivered { attempts: u32 },
    /// The event outlived its maximum age before it could be delivered.
    Expired { attempts: u32 },
    /// Every attempt failed; one dead letter was written.
    DeadLettered { attempts: u32 },
    /// Every attempt failed and the target has no dead-letter sink.
    Dropped { attempts: u32 },
    /// The delivery task stopped before finishing.
    Aborted,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered { .. } => "delivered",
            DeliveryOutcome::Expired { .. } => "expired",
            DeliveryOutcome::DeadLettered { .. } => "dead_lettered",
            DeliveryOutcome::Dropped { .. } => "dropped",
            DeliveryOutcome::Aborted => "aborted",
        }
    }

    /// Attempts actually made against the target.
    pub fn attempts(&self) -> u32 {
        match *self {
            DeliveryOutcome::Delivered { attempts }
            | DeliveryOutcome::Expired { attempts }
            | DeliveryOutcome::DeadLettered { attempts }
            | DeliveryOutcome::Dropped { attempts } => attempts,
            DeliveryOutcome::Aborted => 0,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Delivers `event` to `rule_target`, retrying until it succeeds, expires,
/// or runs out of attempts.
///
/// Never returns an error: failures end in a dead letter or a log line.
#[tracing::instrument(
    skip(rule_target, event),
    fields(target = %rule_target.target.id(), event_id = %event.event_id())
)]
pub async fn deliver(
    rule: &str,
    rule_target: &RuleTarget,
    event: &DomainEvent,
) -> DeliveryOutcome {
    let RuleTarget { target, policy } = rule_target;
    let started = Instant::now();
    let mut failures: Vec<String> = Vec::new();
    let mut first_failed_at = None;

    let mut outcome = None;
    for attempt in 1..=policy.attempts() {
        if let Some(max_age) = policy.event_age_limit() {
            let age = event.age_at(Utc::now());
            if age > max_age {
                tracing::warn!(?age, ?max_age, "event expired, dropping");
                outcome = Some(DeliveryOutcome::Expired {
                    attempts: attempt - 1,
                });
                break;
            }
        }

        metrics::counter!("delivery_attempts_total", "target" => target.id().to_string())
            .increment(1);

        match target.send(event).await {
            Ok(()) => {
                if attempt > 1 {
                    tracing::info!(attempt, "delivered after retry");
                } else {
                    tracing::debug!("delivered");
                }
                outcome = Some(DeliveryOutcome::Delivered { attempts: attempt });
                break;
            }
            Err(err) => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.attempts(),
                    error = %err,
                    "delivery attempt failed"
                );
                first_failed_at.get_or_insert_with(Utc::now);
                failures.push(err.to_string());

                if attempt < policy.attempts() {
                    tokio::time::sleep(policy.backoff_policy().delay_after(attempt)).await;
                }
            }
        }
    }

    let outcome = match outcome {
        Some(outcome) => outcome,
        None => exhaust(rule, rule_target, event, failures, first_failed_at).await,
    };

    metrics::counter!("event_deliveries_total", "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!("delivery_duration_seconds").record(started.elapsed().as_secs_f64());
    outcome
}

async fn exhaust(
    rule: &str,
    rule_target: &RuleTarget,
    event: &DomainEvent,
    failures: Vec<String>,
    first_failed_at: Option<chrono::DateTime<Utc>>,
) -> DeliveryOutcome {
    let attempts = failures.len() as u32;
    let last_error = failures.last().cloned().unwrap_or_default();

    let Some(sink) = rule_target.policy.dead_letter_sink() else {
        tracing::error!(
            attempts,
            %last_error,
            "delivery exhausted with no dead-letter queue, event lost"
        );
        return DeliveryOutcome::Dropped { attempts };
    };

    let now = Utc::now();
    sink.push(DeadLetter {
        event: event.clone(),
        rule: rule.to_string(),
        target: rule_target.target.id().to_string(),
        attempts,
        last_error,
        failures,
        first_failed_at: first_failed_at.unwrap_or(now),
        last_failed_at: now,
    })
    .await;

    DeliveryOutcome::DeadLettered { attempts }
}
