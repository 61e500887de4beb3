//! Daemon configuration.

use anyhow::{bail, Context, Result};
use mempulse_memory::MemoryStatusConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "MEMPULSE_CONFIG";

/// Environment variable overriding `log_level`
pub const LOG_ENV: &str = "MEMPULSE_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// One of trace, debug, info, warn, error
    pub log_level: String,

    pub status: MemoryStatusConfig,

    /// Exit after this many seconds instead of waiting for ctrl-c
    pub run_for_secs: Option<u64>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            status: MemoryStatusConfig::default(),
            run_for_secs: None,
        }
    }
}

impl DaemonConfig {
    /// Load from the first CLI argument, then `MEMPULSE_CONFIG`, then defaults.
    pub fn load() -> Result<Self> {
        Self::resolve(
            std::env::args().nth(1),
            std::env::var(CONFIG_ENV).ok(),
            std::env::var(LOG_ENV).ok(),
        )
    }

    fn resolve(arg_path: Option<String>, env_path: Option<String>, env_level: Option<String>) -> Result<Self> {
        let mut config = match arg_path.or(env_path) {
            Some(path) => Self::from_path(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(level) = env_level {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.status.validate().context("Invalid status config")?;
        self.level()?;
        if self.run_for_secs == Some(0) {
            bail!("run_for_secs must be greater than zero when set");
        }
        Ok(())
    }

    pub fn level(&self) -> Result<Level> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown log level '{}'", self.log_level))
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        let config = DaemonConfig::resolve(None, None, None).unwrap();

        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.level().unwrap(), Level::INFO);
        assert!(config.run_for().is_none());
    }

    #[test]
    fn test_cli_path_wins_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let cli = dir.path().join("cli.json");
        let env = dir.path().join("env.json");
        std::fs::write(&cli, r#"{"run_for_secs": 3}"#).unwrap();
        std::fs::write(&env, r#"{"run_for_secs": 9}"#).unwrap();

        let config = DaemonConfig::resolve(
            Some(cli.display().to_string()),
            Some(env.display().to_string()),
            None,
        )
        .unwrap();

        assert_eq!(config.run_for(), Some(Duration::from_secs(3)));
        assert_eq!(config.status.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_log_env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mempulse.json");
        std::fs::write(&path, r#"{"log_level": "warn", "status": {"interval_ms": 250}}"#).unwrap();

        let config =
            DaemonConfig::resolve(None, Some(path.display().to_string()), Some("debug".to_string())).unwrap();

        assert_eq!(config.level().unwrap(), Level::DEBUG);
        assert_eq!(config.status.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(DaemonConfig::resolve(None, None, Some("loud".to_string())).is_err());

        let config = DaemonConfig {
            run_for_secs: Some(0),
            ..DaemonConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.status.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = DaemonConfig::from_path(Path::new("/nonexistent/mempulse.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mempulse.json"));
    }
}
