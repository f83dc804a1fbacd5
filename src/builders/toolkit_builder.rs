//! Builders to construct resilience components from configuration.

use std::time::Duration;

use crate::config::ToolkitConfig;
use crate::core::{CircuitBreaker, FailurePool, RateLimiter, Spawn, ToolkitError, WorkQueue};
use crate::runtime::TokioSpawner;

/// A ready-to-use set of resilience components built from one configuration.
pub struct Toolkit<S: Spawn + Clone + Send + Sync + 'static = TokioSpawner> {
    /// Error object pool.
    pub pool: FailurePool,
    /// Circuit breaker.
    pub breaker: CircuitBreaker,
    /// Rate limiter.
    pub limiter: RateLimiter,
    /// Async work queue.
    pub queue: WorkQueue<S>,
}

/// Build a component set from validated configuration using the provided
/// spawner for queue workers.
///
/// # Errors
///
/// Returns `ToolkitError::InvalidConfig` if any section fails validation.
pub fn build_toolkit<S>(cfg: &ToolkitConfig, spawner: S) -> Result<Toolkit<S>, ToolkitError>
where
    S: Spawn + Clone + Send + Sync + 'static,
{
    cfg.validate().map_err(ToolkitError::InvalidConfig)?;

    let pool = FailurePool::new(cfg.pool.max_size);
    let breaker = CircuitBreaker::new(
        cfg.breaker.failure_threshold,
        Duration::from_millis(cfg.breaker.reset_timeout_ms),
    )?;
    let mut limiter = RateLimiter::new(cfg.limiter.max_concurrent)?;
    if let Some(ms) = cfg.limiter.min_delay_ms {
        limiter = limiter.with_min_delay(Duration::from_millis(ms));
    }
    let queue = WorkQueue::with_spawner(cfg.queue.concurrency, spawner)?;

    Ok(Toolkit {
        pool,
        breaker,
        limiter,
        queue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BreakerConfig, ToolkitConfig};

    #[tokio::test]
    async fn test_build_from_defaults() {
        let cfg = ToolkitConfig::default();
        let spawner = TokioSpawner::current().expect("inside runtime");
        let toolkit = build_toolkit(&cfg, spawner).expect("valid defaults");
        assert_eq!(toolkit.pool.stats().max_size, cfg.pool.max_size);
        assert_eq!(toolkit.queue.size(), 0);
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let cfg = ToolkitConfig {
            breaker: BreakerConfig {
                failure_threshold: 0,
                reset_timeout_ms: 100,
            },
            ..Default::default()
        };
        let spawner = TokioSpawner::current().expect("inside runtime");
        assert!(build_toolkit(&cfg, spawner).is_err());
    }
}
