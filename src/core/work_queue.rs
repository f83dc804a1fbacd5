//! Async work queue: a persistent FIFO worker pool over the result model.
//!
//! Unlike the [`RateLimiter`](crate::core::RateLimiter) admission gate, the
//! queue is a long-lived component intended for batch submission: jobs are
//! pulled FIFO by at most `concurrency` workers, each caller receives its own
//! per-call [`Outcome`], and failures are additionally reported to an
//! optional best-effort `on_error` side channel.

use std::collections::VecDeque;
use std::error::Error;
use std::future::Future;
use std::panic::{AssertUnwindSafe, Location};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::core::error::ToolkitError;
use crate::core::outcome::{run_fallible_async_at, FailureRecord, Outcome};
use crate::runtime::TokioSpawner;

/// Category of the synthetic failure delivered to callers whose pending work
/// was discarded by [`WorkQueue::clear`].
pub const QUEUE_CLEARED_ERROR: &str = "QueueClearedError";

/// Abstraction for spawning queue workers on a runtime.
pub trait Spawn {
    /// Spawn an async task that runs to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

enum JobCommand {
    Run,
    Discard,
}

/// A pending job: type-erased closure that either runs the submitted
/// operation or resolves its caller with a cleared failure.
type Job = Box<dyn FnOnce(JobCommand) -> BoxFuture<'static, ()> + Send>;

type ErrorCallback = Arc<dyn Fn(&FailureRecord) + Send + Sync>;

struct QueueInner {
    active: usize,
    pending: VecDeque<Job>,
}

/// Persistent worker queue with a configurable concurrency width.
pub struct WorkQueue<S: Spawn + Clone + Send + Sync + 'static = TokioSpawner> {
    concurrency: usize,
    on_error: Option<ErrorCallback>,
    inner: Arc<Mutex<QueueInner>>,
    spawner: S,
}

impl<S: Spawn + Clone + Send + Sync + 'static> Clone for WorkQueue<S> {
    fn clone(&self) -> Self {
        Self {
            concurrency: self.concurrency,
            on_error: self.on_error.clone(),
            inner: Arc::clone(&self.inner),
            spawner: self.spawner.clone(),
        }
    }
}

impl WorkQueue<TokioSpawner> {
    /// Create a queue spawning workers on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ToolkitError::InvalidConfig` if `concurrency` is zero, or
    /// `ToolkitError::NoRuntime` outside a tokio runtime context.
    pub fn new(concurrency: usize) -> Result<Self, ToolkitError> {
        Self::with_spawner(concurrency, TokioSpawner::current()?)
    }
}

impl<S: Spawn + Clone + Send + Sync + 'static> WorkQueue<S> {
    /// Create a queue with an explicit spawner.
    ///
    /// # Errors
    ///
    /// Returns `ToolkitError::InvalidConfig` if `concurrency` is zero.
    pub fn with_spawner(concurrency: usize, spawner: S) -> Result<Self, ToolkitError> {
        if concurrency == 0 {
            return Err(ToolkitError::InvalidConfig(
                "concurrency must be greater than 0".into(),
            ));
        }
        Ok(Self {
            concurrency,
            on_error: None,
            inner: Arc::new(Mutex::new(QueueInner {
                active: 0,
                pending: VecDeque::new(),
            })),
            spawner,
        })
    }

    /// Register a best-effort failure notification callback.
    ///
    /// Invoked for every `Failure` outcome the queue processes. A panicking
    /// callback is swallowed and never stops subsequent items.
    #[must_use]
    pub fn with_on_error(mut self, callback: impl Fn(&FailureRecord) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Submit `f` to the queue and await its per-call outcome.
    ///
    /// The job is enqueued immediately (before the returned future is first
    /// polled) and started FIFO as worker capacity frees up. If the pending
    /// job is discarded by [`clear`](Self::clear), the caller receives a
    /// [`QUEUE_CLEARED_ERROR`] failure instead of its operation's outcome.
    #[track_caller]
    pub fn add<T, E, F, Fut>(&self, f: F) -> impl Future<Output = Outcome<T>>
    where
        T: Send + 'static,
        E: Error + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let site = Location::caller();
        let (tx, rx) = oneshot::channel::<Outcome<T>>();
        let on_error = self.on_error.clone();
        let job: Job = Box::new(move |command| match command {
            JobCommand::Discard => {
                let _ = tx.send(Outcome::Failure(FailureRecord::at(
                    site,
                    QUEUE_CLEARED_ERROR.to_string(),
                    "pending operation discarded by clear".to_string(),
                )));
                future::ready(()).boxed()
            }
            JobCommand::Run => async move {
                let outcome = run_fallible_async_at(site, f).await;
                if let Outcome::Failure(record) = &outcome {
                    if let Some(callback) = &on_error {
                        // Side channel is best-effort: a panicking callback
                        // must not take down the dispatch loop (or skip the
                        // caller's outcome delivery).
                        let guarded =
                            std::panic::catch_unwind(AssertUnwindSafe(|| callback(record)));
                        if guarded.is_err() {
                            tracing::warn!("on_error callback panicked; ignoring");
                        }
                    }
                }
                let _ = tx.send(outcome);
            }
            .boxed(),
        });

        {
            let mut inner = self.inner.lock();
            inner.pending.push_back(job);
        }
        self.pump();

        async move {
            match rx.await {
                Ok(outcome) => outcome,
                // Sender dropped without a send; only possible if the queue's
                // dispatch state was torn down mid-flight.
                Err(_) => Outcome::Failure(FailureRecord::at(
                    site,
                    QUEUE_CLEARED_ERROR.to_string(),
                    "queue dropped before the operation was resolved".to_string(),
                )),
            }
        }
    }

    /// Number of pending (not yet started) jobs.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Number of jobs currently running.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.lock().active
    }

    /// Discard all pending jobs, resolving each suspended caller with a
    /// [`QUEUE_CLEARED_ERROR`] failure. Running jobs are unaffected.
    ///
    /// Returns the number of jobs discarded.
    pub fn clear(&self) -> usize {
        let drained: Vec<Job> = {
            let mut inner = self.inner.lock();
            inner.pending.drain(..).collect()
        };
        let discarded = drained.len();
        for job in drained {
            // The discard path resolves the caller synchronously; the
            // returned ready future carries nothing.
            drop(job(JobCommand::Discard));
        }
        if discarded > 0 {
            tracing::debug!(discarded, "cleared pending operations");
        }
        discarded
    }

    /// Start pending jobs while worker capacity is available.
    fn pump(&self) {
        loop {
            let job = {
                let mut inner = self.inner.lock();
                if inner.active >= self.concurrency {
                    return;
                }
                let Some(job) = inner.pending.pop_front() else {
                    return;
                };
                inner.active += 1;
                job
            };
            let queue = self.clone();
            self.spawner.spawn(async move {
                job(JobCommand::Run).await;
                {
                    let mut inner = queue.inner.lock();
                    inner.active = inner.active.saturating_sub(1);
                }
                queue.pump();
            });
        }
    }
}
