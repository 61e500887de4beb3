//! Memory status configuration.

use crate::broadcaster::STATUS_INTERVAL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the memory status broadcaster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStatusConfig {
    /// Time between two samples, in milliseconds
    pub interval_ms: u64,

    /// Ceiling reported as the runtime's max memory (bytes)
    /// Default: total physical memory
    pub max_runtime_memory: Option<u64>,
}

impl Default for MemoryStatusConfig {
    fn default() -> Self {
        Self {
            interval_ms: STATUS_INTERVAL.as_millis() as u64,
            max_runtime_memory: None,
        }
    }
}

impl MemoryStatusConfig {
    /// Sampling period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_runtime_memory == Some(0) {
            return Err(ConfigError::ZeroMaxMemory);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("Max runtime memory must be greater than zero when set")]
    ZeroMaxMemory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MemoryStatusConfig::default();

        assert_eq!(config.interval(), Duration::from_secs(5));
        assert!(config.max_runtime_memory.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = MemoryStatusConfig::default();
        config.interval_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));

        let config = MemoryStatusConfig {
            max_runtime_memory: Some(0),
            ..MemoryStatusConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxMemory));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MemoryStatusConfig = serde_json::from_str(r#"{"max_runtime_memory": 1048576}"#).unwrap();

        assert_eq!(config.interval_ms, 5_000);
        assert_eq!(config.max_runtime_memory, Some(1_048_576));
    }
}
