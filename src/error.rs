//! Error types for the compatibility engine

use thiserror::Error;

/// Result type for compatibility operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Compatibility engine errors
///
/// Every variant is fatal to the call that produced it; no partial report
/// is ever returned alongside an error.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Invalid schema at {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error("Nesting depth exceeds maximum of {max_depth} at {path}")]
    DepthExceeded { max_depth: usize, path: String },

    #[error("Internal invariant violated at {path}: {message}")]
    InternalInvariant { path: String, message: String },

    #[error("Comparison for document '{document}' was superseded by a newer request")]
    Superseded { document: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// Build a syntax error from a serde_json parse failure
    pub fn from_json(err: &serde_json::Error) -> Self {
        SchemaError::Syntax {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::InvalidSchema {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from the input text rather than the engine
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SchemaError::Syntax { .. }
                | SchemaError::InvalidSchema { .. }
                | SchemaError::DepthExceeded { .. }
        )
    }
}
