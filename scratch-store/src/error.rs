//! Store Error Types

use thiserror::Error;

/// Store Result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store Error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// Duplicate entity
    #[error("Duplicate entity: {entity_type} with id {id}")]
    Duplicate { entity_type: String, id: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend I/O or corruption
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Concurrent unit touched the same rows; the backend retries
    #[error("Transaction conflict")]
    Conflict,
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Create a duplicate error
    pub fn duplicate(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
