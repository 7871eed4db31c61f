//! Core Error Types

use thiserror::Error;

/// Core Result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core domain error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Pool has no tickets left to draw
    #[error("Prize pool sold out")]
    SoldOut,

    /// Level inventory exceeds the pool's unsold tickets
    #[error("Inventory inconsistent: {level_remaining} prize slots for {remaining_tickets} unsold tickets")]
    InventoryInconsistent {
        level_remaining: u64,
        remaining_tickets: u64,
    },

    /// Prize level has nothing left to hand out
    #[error("Prize level {level} exhausted")]
    LevelExhausted { level: u32 },

    /// Malformed lottery rules or catalog configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed security code
    #[error("Invalid security code format: {0}")]
    InvalidFormat(String),

    /// Unique code generation ran out of attempts
    #[error("Security code generation exhausted after {attempts} attempts")]
    SecurityCodeExhausted { attempts: u32 },

    /// Key material has the wrong shape
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Ciphertext could not be authenticated or decoded
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    StateTransition(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
