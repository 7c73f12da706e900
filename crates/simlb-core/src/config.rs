//! Balancer configuration, loadable from TOML.
//!
//! ```toml
//! window_size = 5
//! weight_mode = "inverse"
//! duplicate_policy = "reject"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DuplicatePolicy, WeightMode};

/// Number of samples kept per worker when nothing else is configured.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Errors raised while validating a configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("window size must be at least 1, got {0}")]
    InvalidWindowSize(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Most recent execution-time samples kept per worker.
    pub window_size: usize,
    pub weight_mode: WeightMode,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            weight_mode: WeightMode::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl BalancerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: BalancerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::InvalidWindowSize(self.window_size));
        }
        Ok(())
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_weight_mode(mut self, weight_mode: WeightMode) -> Self {
        self.weight_mode = weight_mode;
        self
    }

    pub fn with_duplicate_policy(mut self, duplicate_policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = duplicate_policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BalancerConfig::default();
        assert_eq!(config.window_size, 5);
        assert_eq!(config.weight_mode, WeightMode::Inverse);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = BalancerConfig::from_toml_str("").unwrap();
        assert_eq!(config, BalancerConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
window_size = 8
weight_mode = "raw"
duplicate_policy = "update"
"#;
        let config = BalancerConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.window_size, 8);
        assert_eq!(config.weight_mode, WeightMode::Raw);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Update);
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = BalancerConfig::from_toml_str("window_size = 0").unwrap_err();
        assert!(err.to_string().contains("window size"));
        assert_eq!(
            BalancerConfig::default().with_window_size(0).validate(),
            Err(ConfigError::InvalidWindowSize(0))
        );
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(BalancerConfig::from_toml_str("weight_mode = \"fastest\"").is_err());
    }

    #[test]
    fn test_toml_roundtrip_keeps_mode() {
        let config = BalancerConfig::default().with_weight_mode(WeightMode::Raw);
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("weight_mode = \"raw\""));
        assert_eq!(BalancerConfig::from_toml_str(&toml_str).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("balancer.toml");
        std::fs::write(&path, "window_size = 3\n").unwrap();

        let config = BalancerConfig::from_file(&path).unwrap();
        assert_eq!(config.window_size, 3);
        assert!(BalancerConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
