//! Configuration management for the compatibility engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schema-compat.toml)
//! - Environment variables (SCHEMA_COMPAT__*)
//!
//! ## Example config file (schema-compat.toml):
//! ```toml
//! [engine]
//! max_nesting_depth = 32
//! strict_mode = true
//! fail_on_breaking = false
//!
//! [cache]
//! capacity = 128
//!
//! [scheduler]
//! debounce_ms = 300
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::parser::DEFAULT_MAX_DEPTH;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatConfig {
    /// Parsing and classification settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Report cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Background comparison settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of nested schema levels
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,

    /// Treat every type change as breaking, including pure widening
    #[serde(default = "default_true")]
    pub strict_mode: bool,

    /// Exit non-zero from the CLI when breaking changes are found
    #[serde(default)]
    pub fail_on_breaking: bool,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached reports (0 disables caching)
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Quiet period after a submission before the comparison starts
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON output format (pretty or compact)
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_cache_capacity() -> usize {
    128
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: default_max_nesting_depth(),
            strict_mode: true,
            fail_on_breaking: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl CompatConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "schema-compat.toml",
            ".schema-compat.toml",
            "config/schema-compat.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "schema-compat") {
            let xdg_config = config_dir.config_dir().join("schema-compat.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (SCHEMA_COMPAT__ENGINE__STRICT_MODE=false)
        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_COMPAT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_nesting_depth == 0 {
            return Err(ConfigError::Message(
                "engine.max_nesting_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompatConfig::default();
        assert_eq!(config.engine.max_nesting_depth, 32);
        assert!(config.engine.strict_mode);
        assert!(!config.engine.fail_on_breaking);
        assert_eq!(config.cache.capacity, 128);
        assert_eq!(config.scheduler.debounce(), Duration::from_millis(300));
        assert_eq!(config.output.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let config = CompatConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("strict_mode = true"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compat.toml");
        std::fs::write(&path, "[engine]\nstrict_mode = false\n\n[cache]\ncapacity = 4\n").unwrap();

        let config = CompatConfig::load_from(path.to_str()).unwrap();
        assert!(!config.engine.strict_mode);
        assert_eq!(config.engine.max_nesting_depth, 32);
        assert_eq!(config.cache.capacity, 4);
        assert_eq!(config.scheduler.debounce_ms, 300);
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = CompatConfig::default();
        config.output.format = OutputFormat::Compact;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = CompatConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let mut config = CompatConfig::default();
        config.engine.max_nesting_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(CompatConfig::load_from(Some("/nonexistent/schema-compat.toml")).is_err());
    }
}
