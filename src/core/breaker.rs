//! Circuit breaker: consecutive-failure state machine over the result model.
//!
//! Wraps a fallible operation and refuses to call through while a dependency
//! is known to be failing. States: `Closed` (normal) -> `Open` (refusing) ->
//! `HalfOpen` (single probe) -> back to `Closed` or `Open`. The half-open
//! probe limits retry cost to one attempt per reset-timeout window.
//!
//! All operations are synchronous state transitions; the breaker never
//! suspends. State lives behind its own mutex and is mutated only inside
//! `execute` and `reset`.

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::core::error::ToolkitError;
use crate::core::events::{build_event, SharedEventSink};
use crate::core::outcome::{run_fallible, FailureRecord, Outcome};

/// Category of the synthetic failure returned while the circuit is open.
pub const CIRCUIT_OPEN_ERROR: &str = "CircuitOpenError";

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; calls pass through.
    Closed,
    /// Dependency considered unhealthy; calls are refused.
    Open,
    /// Probing recovery with a single trial call.
    HalfOpen,
}

type StateCallback = Arc<dyn Fn() + Send + Sync>;

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Failure-rate state machine wrapping a fallible synchronous operation.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
    on_open: Option<StateCallback>,
    on_close: Option<StateCallback>,
    events: Option<SharedEventSink>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and probes recovery after `reset_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ToolkitError::InvalidConfig` if `failure_threshold` is zero
    /// or `reset_timeout` is zero.
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Result<Self, ToolkitError> {
        if failure_threshold == 0 {
            return Err(ToolkitError::InvalidConfig(
                "failure_threshold must be greater than 0".into(),
            ));
        }
        if reset_timeout.is_zero() {
            return Err(ToolkitError::InvalidConfig(
                "reset_timeout must be greater than 0".into(),
            ));
        }
        Ok(Self {
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
            on_open: None,
            on_close: None,
            events: None,
        })
    }

    /// Register a callback invoked whenever the circuit transitions to open.
    #[must_use]
    pub fn with_on_open(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(callback));
        self
    }

    /// Register a callback invoked whenever the circuit closes again.
    #[must_use]
    pub fn with_on_close(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(callback));
        self
    }

    /// Attach a lifecycle event sink. Publishing is fire-and-forget.
    #[must_use]
    pub fn with_events(mut self, sink: SharedEventSink) -> Self {
        self.events = Some(sink);
        self
    }

    /// Execute `f` under circuit protection.
    ///
    /// While open and inside the reset-timeout window, or while another
    /// caller's half-open probe is in flight, returns a
    /// [`CIRCUIT_OPEN_ERROR`] failure without invoking `f`. Otherwise runs
    /// `f` through [`run_fallible`] and updates the state machine: a success
    /// zeroes the failure counter (and closes a half-open circuit); a
    /// failure counts toward the threshold (and reopens a half-open circuit
    /// immediately). The operation's own failure is always returned as-is.
    #[track_caller]
    pub fn execute<T, E, F>(&self, f: F) -> Outcome<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error + Send + Sync + 'static,
    {
        {
            let mut inner = self.inner.lock();
            match inner.state {
                CircuitState::Closed => {}
                // The caller that moved the circuit to half-open owns the
                // probe; concurrent callers are refused until it resolves.
                CircuitState::HalfOpen => {
                    drop(inner);
                    return Outcome::Failure(FailureRecord::new(
                        CIRCUIT_OPEN_ERROR,
                        "circuit is half-open; a recovery probe is already in flight",
                    ));
                }
                CircuitState::Open => {
                    let elapsed = inner
                        .opened_at
                        .map_or(true, |at| at.elapsed() >= self.reset_timeout);
                    if elapsed {
                        tracing::info!("reset timeout elapsed, probing half-open");
                        inner.state = CircuitState::HalfOpen;
                    } else {
                        drop(inner);
                        return Outcome::Failure(FailureRecord::new(
                            CIRCUIT_OPEN_ERROR,
                            "circuit is open; call refused without invoking the operation",
                        ));
                    }
                }
            }
        }

        let outcome = run_fallible(f);
        match &outcome {
            Outcome::Success(_) => {
                let closed_now = {
                    let mut inner = self.inner.lock();
                    inner.consecutive_failures = 0;
                    if inner.state == CircuitState::HalfOpen {
                        inner.state = CircuitState::Closed;
                        inner.opened_at = None;
                        true
                    } else {
                        false
                    }
                };
                if closed_now {
                    tracing::info!("half-open probe succeeded, circuit closed");
                    self.publish("close");
                    if let Some(callback) = &self.on_close {
                        callback();
                    }
                }
            }
            Outcome::Failure(record) => {
                let opened_now = {
                    let mut inner = self.inner.lock();
                    inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                    let trip = inner.state == CircuitState::HalfOpen
                        || inner.consecutive_failures >= self.failure_threshold;
                    if trip {
                        inner.state = CircuitState::Open;
                        inner.opened_at = Some(Instant::now());
                        inner.consecutive_failures = 0;
                        true
                    } else {
                        false
                    }
                };
                if opened_now {
                    tracing::warn!(category = record.category(), "circuit opened");
                    self.publish("open");
                    if let Some(callback) = &self.on_open {
                        callback();
                    }
                }
            }
        }
        outcome
    }

    /// Current state of the circuit.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Current consecutive-failure count.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Force the circuit closed and zero the counter.
    ///
    /// Does not invoke the `on_open`/`on_close` callbacks.
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock();
            inner.state = CircuitState::Closed;
            inner.consecutive_failures = 0;
            inner.opened_at = None;
        }
        self.publish("reset");
    }

    // Callbacks and events run outside the state lock so a handler that
    // re-enters the breaker cannot deadlock.
    fn publish(&self, action: &str) {
        if let Some(sink) = &self.events {
            sink.lock().publish(build_event("circuit_breaker", action, None));
        }
    }
}
