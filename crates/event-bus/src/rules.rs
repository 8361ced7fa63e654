//! Subscription rules: which events go where, and under what policy.
//!
//! Rules are assembled once at start-up and never change afterwards; the
//! router shares the table behind an `Arc`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use common::{BoundedContext, EventName};
use domain::DomainEvent;

use crate::dead_letter::DeadLetterSink;
use crate::delivery::EventHandler;
use crate::destination::HttpDestination;
use crate::error::DeliveryError;
use crate::retry::BackoffPolicy;

/// Which sources a rule accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePattern {
    Any,
    Exactly(BoundedContext),
}

impl SourcePattern {
    pub fn matches(&self, source: BoundedContext) -> bool {
        match self {
            SourcePattern::Any => true,
            SourcePattern::Exactly(expected) => *expected == source,
        }
    }
}

/// Which event names a rule accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPattern {
    Any,
    OneOf(Vec<EventName>),
}

impl EventPattern {
    pub fn matches(&self, name: EventName) -> bool {
        match self {
            EventPattern::Any => true,
            EventPattern::OneOf(names) => names.contains(&name),
        }
    }
}

/// Where a matched event is delivered.
#[derive(Clone)]
pub enum Target {
    /// An in-process handler, identified by name in logs and dead letters.
    Local {
        name: String,
        handler: Arc<dyn EventHandler>,
    },
    /// A remote HTTP endpoint.
    Remote(Arc<HttpDestination>),
}

impl Target {
    pub fn local(name: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Target::Local {
            name: name.into(),
            handler,
        }
    }

    pub fn remote(destination: HttpDestination) -> Self {
        Target::Remote(Arc::new(destination))
    }

    /// Identifier used in logs, metrics and dead-letter entries.
    pub fn id(&self) -> &str {
        match self {
            Target::Local { name, .. } => name,
            Target::Remote(destination) => destination.endpoint(),
        }
    }

    /// Makes one delivery attempt.
    pub async fn send(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
        match self {
            Target::Local { handler, .. } => handler.handle(event).await,
            Target::Remote(destination) => destination.send(event).await,
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local { name, .. } => f.debug_struct("Local").field("name", name).finish(),
            Target::Remote(destination) => f.debug_tuple("Remote").field(destination).finish(),
        }
    }
}

/// Per-target retry, expiry and dead-letter settings.
#[derive(Clone)]
pub struct DeliveryPolicy {
    max_attempts: u32,
    max_event_age: Option<Duration>,
    backoff: BackoffPolicy,
    dead_letter: Option<Arc<dyn DeadLetterSink>>,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            max_event_age: None,
            backoff: BackoffPolicy::default(),
            dead_letter: None,
        }
    }
}

impl DeliveryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of attempts, including the first. Clamped to at least one.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Events older than this are dropped instead of delivered.
    pub fn max_event_age(mut self, age: Duration) -> Self {
        self.max_event_age = Some(age);
        self
    }

    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn dead_letter(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letter = Some(sink);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn event_age_limit(&self) -> Option<Duration> {
        self.max_event_age
    }

    pub fn backoff_policy(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub fn dead_letter_sink(&self) -> Option<&Arc<dyn DeadLetterSink>> {
        self.dead_letter.as_ref()
    }
}

impl fmt::Debug for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("max_event_age", &self.max_event_age)
            .field("backoff", &self.backoff)
            .field("dead_letter", &self.dead_letter.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}

/// A target together with the policy used to reach it.
#[derive(Debug, Clone)]
pub struct RuleTarget {
    pub target: Target,
    pub policy: DeliveryPolicy,
}

impl RuleTarget {
    pub fn new(target: Target, policy: DeliveryPolicy) -> Self {
        Self { target, policy }
    }
}

/// A named predicate over `(source, eventName)` with one or more targets.
#[derive(Debug, Clone)]
pub struct SubscriptionRule {
    name: String,
    source: SourcePattern,
    events: EventPattern,
    targets: Vec<RuleTarget>,
}

impl SubscriptionRule {
    /// A rule matching every event until narrowed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: SourcePattern::Any,
            events: EventPattern::Any,
            targets: Vec::new(),
        }
    }

    pub fn from_source(mut self, source: BoundedContext) -> Self {
        self.source = SourcePattern::Exactly(source);
        self
    }

    pub fn for_events(mut self, names: impl IntoIterator<Item = EventName>) -> Self {
        self.events = EventPattern::OneOf(names.into_iter().collect());
        self
    }

    pub fn target(mut self, target: Target, policy: DeliveryPolicy) -> Self {
        self.targets.push(RuleTarget::new(target, policy));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> SourcePattern {
        self.source
    }

    pub fn events(&self) -> &EventPattern {
        &self.events
    }

    pub fn targets(&self) -> &[RuleTarget] {
        &self.targets
    }

    pub fn matches(&self, source: BoundedContext, name: EventName) -> bool {
        self.source.matches(source) && self.events.matches(name)
    }
}

/// The immutable set of rules installed on a bus.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<SubscriptionRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<SubscriptionRule>) -> Self {
        Self { rules }
    }

    /// Every rule whose predicate accepts the event, in installation order.
    pub fn matching<'a>(
        &'a self,
        event: &'a DomainEvent,
    ) -> impl Iterator<Item = &'a SubscriptionRule> + 'a {
        let (source, name) = (event.source(), event.event_name());
        self.rules.iter().filter(move |rule| rule.matches(source, name))
    }

    pub fn get(&self, name: &str) -> Option<&SubscriptionRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn rules(&self) -> &[SubscriptionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<SubscriptionRule> for RuleTable {
    fn from_iter<I: IntoIterator<Item = SubscriptionRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
