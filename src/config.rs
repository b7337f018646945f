//! Configuration management for the validator engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (terse-schema.toml)
//! - Environment variables (TERSE_SCHEMA__*)
//!
//! ## Example config file (terse-schema.toml):
//! ```toml
//! [validation]
//! validate_model = true
//! max_depth = 64
//!
//! [cache]
//! capacity = 4096
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::validator::ValidateOptions;

/// Main configuration for the validator engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Decode cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Check schemas against the meta-schema before validating data
    #[serde(default)]
    pub validate_model: bool,

    /// Maximum nesting of nested and referenced schemas
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Decode cache configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum stored descriptors (unbounded when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

fn default_max_depth() -> usize {
    ValidateOptions::default().max_depth
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validate_model: false,
            max_depth: default_max_depth(),
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file when `config_path` is set
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "terse-schema.toml",
            ".terse-schema.toml",
            "config/terse-schema.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "terse-schema") {
            let xdg_config = config_dir.config_dir().join("terse-schema.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TERSE_SCHEMA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Options for [`crate::Validator`] calls
    pub fn options(&self) -> ValidateOptions {
        ValidateOptions {
            validate_model: self.validation.validate_model,
            max_depth: self.validation.max_depth,
        }
    }
}
