//! Error types for schema decoding and engine setup
//!
//! Data that does not match a schema is never an error: it is reported
//! through [`crate::ValidationResult`]. The variants here cover schemas that
//! cannot be understood at all.

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema authoring and environment errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid enum literal in `{notation}`: {reason}")]
    InvalidEnum { notation: String, reason: String },

    #[error("Invalid bound in `{notation}`: {reason}")]
    InvalidBound { notation: String, reason: String },

    #[error("Unknown kind prefix `{prefix}` in `{notation}`")]
    UnknownKind { notation: String, prefix: char },

    #[error("Unsupported schema at `{path}`: {reason}")]
    UnsupportedSchema { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl SchemaError {
    pub(crate) fn unsupported(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::UnsupportedSchema {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
