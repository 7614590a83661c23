//! Configuration - memory layout and training parameters
//!
//! Loaded from TOML with defaults for every field:
//!
//! ```toml
//! seed = 10
//!
//! [memory]
//! nominal_page_params_count = 1024
//! min_page_gates_count = 8
//! max_page_gates_count = 64
//!
//! [training]
//! epochs = 100
//! cycles = 100
//! reward = 10000
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BitGateError, Result};

/// Page sizing configuration for the width-to-pages translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Parameter slots a page should hold (gates per page = this / gate width)
    pub nominal_page_params_count: usize,
    /// Lower clamp on gates per base page
    pub min_page_gates_count: usize,
    /// Upper clamp on gates per base page
    pub max_page_gates_count: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            nominal_page_params_count: 1024,
            min_page_gates_count: 8,
            max_page_gates_count: 64,
        }
    }
}

impl MemoryConfig {
    /// Small pages, mostly useful to exercise page boundaries in tests
    pub fn compact() -> Self {
        Self {
            nominal_page_params_count: 64,
            min_page_gates_count: 1,
            max_page_gates_count: 8,
        }
    }

    /// Reject configurations the layout computation cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.nominal_page_params_count == 0 {
            return Err(BitGateError::Config(
                "nominal_page_params_count must be positive".into(),
            ));
        }
        if self.min_page_gates_count == 0 {
            return Err(BitGateError::Config(
                "min_page_gates_count must be positive".into(),
            ));
        }
        if self.min_page_gates_count > self.max_page_gates_count {
            log::warn!(
                "min_page_gates_count {} exceeds max_page_gates_count {}",
                self.min_page_gates_count,
                self.max_page_gates_count
            );
            return Err(BitGateError::Config(format!(
                "min_page_gates_count ({}) > max_page_gates_count ({})",
                self.min_page_gates_count, self.max_page_gates_count
            )));
        }
        Ok(())
    }
}

/// Training driver parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of epochs
    pub epochs: usize,
    /// Training samples per epoch
    pub cycles: usize,
    /// Feedback magnitude injected on the output layer (+ on hit, - on miss)
    pub reward: i32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            cycles: 100,
            reward: 10_000,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitGateConfig {
    /// Seed for the arena's random source
    pub seed: u64,
    /// Page sizing
    pub memory: MemoryConfig,
    /// Training driver parameters
    pub training: TrainingConfig,
}

impl Default for BitGateConfig {
    fn default() -> Self {
        Self {
            seed: 10,
            memory: MemoryConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl BitGateConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|err| BitGateError::Config(err.to_string()))?;
        config.memory.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|err| BitGateError::Config(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = BitGateConfig::default();
        assert_eq!(config.seed, 10);
        assert_eq!(config.memory.nominal_page_params_count, 1024);
        assert_eq!(config.memory.min_page_gates_count, 8);
        assert_eq!(config.memory.max_page_gates_count, 64);
        assert_eq!(config.training.reward, 10_000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BitGateConfig::from_toml_str(
            r#"
seed = 7

[memory]
max_page_gates_count = 32
"#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.memory.max_page_gates_count, 32);
        assert_eq!(config.memory.min_page_gates_count, 8);
        assert_eq!(config.training, TrainingConfig::default());
    }

    #[test]
    fn test_invalid_memory_config_rejected() {
        let err = BitGateConfig::from_toml_str(
            r#"
[memory]
min_page_gates_count = 100
max_page_gates_count = 10
"#,
        )
        .unwrap_err();
        assert!(matches!(err, BitGateError::Config(_)));

        let zero = MemoryConfig {
            min_page_gates_count: 0,
            ..MemoryConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = BitGateConfig::from_toml_str("seed = \"ten\"").unwrap_err();
        assert!(matches!(err, BitGateError::Config(_)));
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let config = BitGateConfig {
            seed: 99,
            memory: MemoryConfig::compact(),
            training: TrainingConfig {
                epochs: 3,
                cycles: 5,
                reward: 500,
            },
        };

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = BitGateConfig::load_from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = BitGateConfig::load_from_file("/nonexistent/bitgate.toml").unwrap_err();
        assert!(matches!(err, BitGateError::Io(_)));
    }
}
