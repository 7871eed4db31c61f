//! CLI Error Types

use scratch_engine::{EngineError, ErrorKind};
use scratch_store::StoreError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Engine rejected the operation
    #[error("{0}")]
    EngineError(#[from] EngineError),

    /// Store could not be opened
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        CliError::ConfigError {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigError { .. } => 1,
            CliError::InvalidArgument { .. } => 2,
            CliError::IoError(_) => 5,
            CliError::JsonError(_) => 6,
            CliError::EngineError(e) => match e.kind() {
                ErrorKind::Validation => 10,
                ErrorKind::Conflict => 11,
                ErrorKind::Integrity => 12,
                ErrorKind::External => 13,
                ErrorKind::Fatal => 30,
            },
            CliError::StoreError(_) => 31,
        }
    }
}
