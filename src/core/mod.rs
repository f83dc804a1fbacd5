//! Core failure-as-value components.

pub mod breaker;
pub mod error;
pub mod events;
pub mod failure_pool;
pub mod outcome;
pub mod rate_limiter;
pub mod work_queue;

pub use breaker::{CircuitBreaker, CircuitState, CIRCUIT_OPEN_ERROR};
pub use error::{AppResult, ToolkitError};
pub use events::{build_event, EventSink, InMemoryEventSink, LifecycleEvent, SharedEventSink};
pub use failure_pool::{FailurePool, PoolStats};
pub use outcome::{
    run_fallible, run_fallible_async, FailureContext, FailureRecord, Outcome, UNKNOWN_ERROR,
};
pub use rate_limiter::RateLimiter;
pub use work_queue::{Spawn, WorkQueue, QUEUE_CLEARED_ERROR};
