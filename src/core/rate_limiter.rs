//! Rate limiter: concurrency admission control for async operations.
//!
//! Admits fallible asynchronous operations under a concurrency ceiling with
//! optional minimum spacing between starts. Operations beyond capacity are
//! queued as admission tickets and suspended until admitted, strictly FIFO.
//! No operation is ever dropped, only delayed; the limiter itself never
//! fails an admitted operation.
//!
//! Admission is permit-based: each admitted operation holds an
//! [`AdmissionPermit`] whose drop releases the slot, so a caller cancelled
//! while queued or mid-operation cannot leak capacity.

use std::collections::VecDeque;
use std::error::Error;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::core::error::ToolkitError;
use crate::core::outcome::{run_fallible_async_at, Outcome};

struct LimiterInner {
    active: usize,
    /// Admission tickets for suspended callers, FIFO.
    waiters: VecDeque<oneshot::Sender<AdmissionPermit>>,
    /// Earliest instant the next operation may start (spacing accumulator).
    next_start_at: Option<Instant>,
}

/// Slot held by one admitted operation. Dropping it releases the slot and
/// admits the next live waiter.
struct AdmissionPermit {
    inner: Arc<Mutex<LimiterInner>>,
    max_concurrent: usize,
    armed: bool,
}

impl AdmissionPermit {
    fn grant(inner: &Arc<Mutex<LimiterInner>>, max_concurrent: usize) -> Self {
        Self {
            inner: Arc::clone(inner),
            max_concurrent,
            armed: true,
        }
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        if self.armed {
            release_slot(&self.inner, self.max_concurrent);
        }
    }
}

fn release_slot(inner_arc: &Arc<Mutex<LimiterInner>>, max_concurrent: usize) {
    let mut inner = inner_arc.lock();
    inner.active = inner.active.saturating_sub(1);
    while inner.active < max_concurrent {
        let Some(ticket) = inner.waiters.pop_front() else {
            break;
        };
        inner.active += 1;
        match ticket.send(AdmissionPermit::grant(inner_arc, max_concurrent)) {
            Ok(()) => break,
            // The waiter was dropped while queued. Defuse the returned
            // permit (its drop would re-lock) and try the next ticket so a
            // dead ticket never consumes a slot.
            Err(mut dead) => {
                dead.armed = false;
                inner.active -= 1;
            }
        }
    }
}

/// Concurrency admission gate wrapping a single logical operation type.
///
/// Stateless from the caller's perspective: each [`execute`](Self::execute)
/// call is independent, unlike the persistent
/// [`WorkQueue`](crate::core::WorkQueue) worker pool.
pub struct RateLimiter {
    max_concurrent: usize,
    min_delay: Option<Duration>,
    inner: Arc<Mutex<LimiterInner>>,
}

impl RateLimiter {
    /// Create a limiter admitting at most `max_concurrent` operations.
    ///
    /// # Errors
    ///
    /// Returns `ToolkitError::InvalidConfig` if `max_concurrent` is zero.
    pub fn new(max_concurrent: usize) -> Result<Self, ToolkitError> {
        if max_concurrent == 0 {
            return Err(ToolkitError::InvalidConfig(
                "max_concurrent must be greater than 0".into(),
            ));
        }
        Ok(Self {
            max_concurrent,
            min_delay: None,
            inner: Arc::new(Mutex::new(LimiterInner {
                active: 0,
                waiters: VecDeque::new(),
                next_start_at: None,
            })),
        })
    }

    /// Require at least `min_delay` between operation starts.
    #[must_use]
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = Some(min_delay);
        self
    }

    /// Execute `f` under the concurrency ceiling.
    ///
    /// Suspends the caller until admitted (capacity free and, with a
    /// configured `min_delay`, the spacing window reached), then runs `f`
    /// through the result model. The wrapped operation's own failure is
    /// returned to its caller as a normal `Failure`; admission has no error
    /// path. A caller dropped while queued or while its operation runs
    /// releases its slot to the next waiter.
    #[track_caller]
    pub fn execute<'a, T, E, F, Fut>(&'a self, f: F) -> impl Future<Output = Outcome<T>> + 'a
    where
        T: 'a,
        E: Error + Send + Sync + 'static,
        F: FnOnce() -> Fut + 'a,
        Fut: Future<Output = Result<T, E>> + 'a,
    {
        let site = Location::caller();
        async move {
            let permit = self.admit().await;
            self.pace().await;
            let outcome = run_fallible_async_at(site, f).await;
            drop(permit);
            outcome
        }
    }

    /// Number of currently admitted (running or about to start) operations.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.lock().active
    }

    /// Number of operations suspended waiting for admission.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    async fn admit(&self) -> AdmissionPermit {
        let ticket = {
            let mut inner = self.inner.lock();
            // Immediate admission only when nobody is queued ahead of us.
            if inner.active < self.max_concurrent && inner.waiters.is_empty() {
                inner.active += 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.waiters.push_back(tx);
                tracing::debug!(queued = inner.waiters.len(), "operation queued for admission");
                Some(rx)
            }
        };
        match ticket {
            None => AdmissionPermit::grant(&self.inner, self.max_concurrent),
            Some(rx) => match rx.await {
                Ok(permit) => permit,
                // The sender side lives in the waiter queue as long as the
                // limiter does; a recv error means teardown, in which case
                // proceeding without accounting is the only useful option.
                Err(_) => AdmissionPermit {
                    inner: Arc::clone(&self.inner),
                    max_concurrent: self.max_concurrent,
                    armed: false,
                },
            },
        }
    }

    async fn pace(&self) {
        let Some(delay) = self.min_delay else {
            return;
        };
        let wait = {
            let mut inner = self.inner.lock();
            let now = Instant::now();
            let start_at = inner.next_start_at.map_or(now, |at| at.max(now));
            inner.next_start_at = Some(start_at + delay);
            start_at.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
