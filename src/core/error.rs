//! Error types for toolkit construction.
//!
//! The resilience components are infallible at their own API surface: domain
//! failures travel as [`Outcome`](crate::core::Outcome) values, never as
//! errors from `execute`/`add`/`acquire`/`release`. The only thing that can
//! fail in the conventional sense is constructing a component from invalid
//! configuration, which is what this module covers.

use thiserror::Error;

/// Errors produced when constructing toolkit components.
#[derive(Debug, Error)]
pub enum ToolkitError {
    /// Component configuration was rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No async runtime was available to drive a component.
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
