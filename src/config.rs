//! Configuration management for Keygate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for a Keygate limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeygateConfig {
    /// Rate limiting policy
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Attempt record storage
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for KeygateConfig {
    fn default() -> Self {
        Self {
            limiter: LimiterConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Rate limiting policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Length of the counting window in milliseconds
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Maximum attempts allowed per window
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Minimum spacing between consecutive attempts in milliseconds
    #[serde(default)]
    pub duration_ms: u64,

    /// Maximum time a blocking caller will wait in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
            limit: default_limit(),
            duration_ms: 0,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl LimiterConfig {
    /// Length of the counting window.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Cooldown between consecutive attempts.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Maximum time a blocking caller will wait.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_period_ms() -> u64 {
    60_000
}

fn default_limit() -> u32 {
    60
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Attempt record storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type tag, `memory` or `redis`
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Connection URI for remote backends
    #[serde(default)]
    pub uri: String,

    /// Interval between stale record sweeps in milliseconds, 0 disables
    #[serde(default)]
    pub purge_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            uri: String::new(),
            purge_interval_ms: 0,
        }
    }
}

impl StoreConfig {
    /// Interval between stale record sweeps, zero when disabled.
    pub fn purge_interval(&self) -> Duration {
        Duration::from_millis(self.purge_interval_ms)
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

impl KeygateConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: KeygateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::KeygateError::Config(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KeygateConfig::default();
        assert_eq!(config.limiter.limit, 60);
        assert_eq!(config.limiter.duration(), Duration::ZERO);
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.store.purge_interval(), Duration::ZERO);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
limiter:
  period_ms: 1000
  limit: 10
  duration_ms: 30
store:
  backend: redis
  uri: redis://127.0.0.1/
"#;
        let config: KeygateConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.limiter.period(), Duration::from_secs(1));
        assert_eq!(config.limiter.limit, 10);
        assert_eq!(config.limiter.duration(), Duration::from_millis(30));
        // unset fields fall back to defaults
        assert_eq!(config.limiter.timeout(), Duration::from_secs(30));
        assert_eq!(config.store.backend, "redis");
        assert_eq!(config.store.uri, "redis://127.0.0.1/");
    }
}
