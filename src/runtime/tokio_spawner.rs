//! Tokio runtime spawner implementation.

use std::future::Future;

use crate::core::error::ToolkitError;
use crate::core::work_queue::Spawn;

/// Tokio-based spawner that executes queue workers on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Create a spawner bound to the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns `ToolkitError::NoRuntime` when called outside a tokio runtime.
    pub fn current() -> Result<Self, ToolkitError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| ToolkitError::NoRuntime(e.to_string()))
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
