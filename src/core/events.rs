//! Lifecycle event notification sink.
//!
//! The resilience components can publish fire-and-forget lifecycle events
//! (circuit opened, circuit closed, ...) to an external notification bus.
//! Only the interface lives here: components accept any [`EventSink`] and
//! expect nothing back. [`InMemoryEventSink`] is provided for tests and dev.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::util::clock::now_ms;

/// A single lifecycle event.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    /// Unique event identifier.
    pub event_id: String,
    /// Component that published the event (e.g. `"circuit_breaker"`).
    pub component: String,
    /// Action taken (open, close, reset).
    pub action: String,
    /// Optional free-form detail.
    pub detail: Option<String>,
    /// Timestamp in milliseconds since epoch.
    pub created_at_ms: u64,
}

/// Notification bus abstraction. Publishing is best-effort and one-way.
pub trait EventSink: Send {
    /// Publish an event. No return value is expected.
    fn publish(&mut self, event: LifecycleEvent);
}

/// Shared handle to an event sink, as held by publishing components.
pub type SharedEventSink = Arc<Mutex<Box<dyn EventSink>>>;

/// Build a lifecycle event with a fresh id and timestamp.
#[must_use]
pub fn build_event(
    component: impl Into<String>,
    action: impl Into<String>,
    detail: Option<String>,
) -> LifecycleEvent {
    LifecycleEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        component: component.into(),
        action: action.into(),
        detail,
        created_at_ms: now_ms(),
    }
}

/// In-memory event sink for testing and dev.
///
/// Storage is shared between clones, so a test can keep one handle and hand
/// another to a component.
#[derive(Clone)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<VecDeque<LifecycleEvent>>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().iter().cloned().collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn publish(&mut self, event: LifecycleEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}
