//! Configuration models for the resilience components.

pub mod resilience;

pub use resilience::{
    BreakerConfig, LimiterConfig, PoolConfig, QueueConfig, ToolkitConfig, CONFIG_ENV_VAR,
};
