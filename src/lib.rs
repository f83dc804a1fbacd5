//! # Outcome Toolkit
//!
//! Failure-as-value resilience primitives for application code that wants
//! explicit, typed failure handling without adopting a full functional
//! effects system.
//!
//! The library represents failure as ordinary return values instead of
//! unwinding, and layers a small set of resilience and concurrency-control
//! primitives on top of that value model:
//!
//! - **Result model**: [`core::Outcome`] and [`core::FailureRecord`], with
//!   the [`core::run_fallible`] / [`core::run_fallible_async`] capture
//!   boundaries that convert errors *and* panics into values — a wrapped
//!   operation returns exactly one `Outcome` and never unwinds.
//! - **Error object pool**: [`core::FailurePool`] recycles failure-record
//!   storage on high-frequency failure paths.
//! - **Circuit breaker**: [`core::CircuitBreaker`] stops calling a failing
//!   dependency after a threshold and probes recovery with a single
//!   half-open trial per reset window.
//! - **Rate limiter**: [`core::RateLimiter`] admits async operations under a
//!   concurrency ceiling with optional start spacing; excess callers queue
//!   FIFO and are never dropped.
//! - **Async work queue**: [`core::WorkQueue`] is a persistent FIFO worker
//!   pool that delivers a per-call `Outcome` to each submitter and reports
//!   failures to a best-effort side channel.
//!
//! ## Example
//!
//! ```rust,ignore
//! use outcome_toolkit::core::{CircuitBreaker, Outcome};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(3, Duration::from_millis(500))?;
//! match breaker.execute(|| fetch_quote()) {
//!     Outcome::Success(quote) => println!("{quote}"),
//!     Outcome::Failure(record) => {
//!         eprintln!("{} at {}: {}", record.category(), record.origin_site(), record.message());
//!     }
//! }
//! ```
//!
//! ## Concurrency model
//!
//! The components assume cooperative async interleaving but tolerate true
//! parallelism: every shared mutable resource (breaker state and counter,
//! pool free-list, limiter/queue admission state) sits behind its own
//! `parking_lot` mutex, and no component reaches into another's state.
//! Cancellation is not natively supported; an operation that never resolves
//! leaves its caller suspended.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core failure-as-value components: result model, pool, breaker, limiter, queue.
pub mod core;
/// Configuration models for the resilience components.
pub mod config;
/// Builders to construct component sets from configuration.
pub mod builders;
/// Runtime adapters for spawning queue workers.
pub mod runtime;
/// Shared utilities.
pub mod util;
