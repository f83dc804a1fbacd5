//! Resilience component configuration models.

use serde::{Deserialize, Serialize};

/// Environment variable read by [`ToolkitConfig::from_env`], expected to
/// hold the full configuration as a JSON document.
pub const CONFIG_ENV_VAR: &str = "OUTCOME_TOOLKIT_CONFIG";

/// Error object pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of released records retained for reuse.
    pub max_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_size: 32 }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Milliseconds to wait before the half-open probe.
    pub reset_timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
        }
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum concurrently admitted operations.
    pub max_concurrent: usize,
    /// Optional minimum spacing between operation starts, in milliseconds.
    #[serde(default)]
    pub min_delay_ms: Option<u64>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            min_delay_ms: None,
        }
    }
}

/// Async work queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Worker pool width.
    pub concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get().max(1),
        }
    }
}

/// Root toolkit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// Error object pool settings.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Circuit breaker settings.
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Rate limiter settings.
    #[serde(default)]
    pub limiter: LimiterConfig,
    /// Work queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
}

impl BreakerConfig {
    /// Validate breaker configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".into());
        }
        if self.reset_timeout_ms == 0 {
            return Err("reset_timeout_ms must be greater than 0".into());
        }
        Ok(())
    }
}

impl LimiterConfig {
    /// Validate limiter configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        Ok(())
    }
}

impl QueueConfig {
    /// Validate queue configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".into());
        }
        Ok(())
    }
}

impl ToolkitConfig {
    /// Validate all component sections.
    ///
    /// # Errors
    ///
    /// Returns a description naming the invalid section.
    pub fn validate(&self) -> Result<(), String> {
        self.breaker
            .validate()
            .map_err(|e| format!("breaker invalid: {e}"))?;
        self.limiter
            .validate()
            .map_err(|e| format!("limiter invalid: {e}"))?;
        self.queue
            .validate()
            .map_err(|e| format!("queue invalid: {e}"))?;
        Ok(())
    }

    /// Parse toolkit configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the environment.
    ///
    /// Reads `.env` if present, then parses [`CONFIG_ENV_VAR`] as JSON.
    /// Falls back to defaults when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(_) => {
                let cfg = Self::default();
                cfg.validate()?;
                Ok(cfg)
            }
        }
    }
}
