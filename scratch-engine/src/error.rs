//! Engine Error Types

use scratch_core::CoreError;
use scratch_store::StoreError;
use thiserror::Error;

/// Engine Result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Broad error class, used by callers to decide how to respond
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; nothing changed, fix and retry
    Validation,
    /// Current state forbids the operation; nothing changed
    Conflict,
    /// Stored data failed authentication or decoding
    Integrity,
    /// Rejected message from an external party
    External,
    /// Storage or internal failure; the unit was rolled back
    Fatal,
}

/// Engine Error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Non-positive or overflowing amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Purchase quantity out of range
    #[error("Invalid quantity {quantity}, allowed 1..={max}")]
    InvalidQuantity { quantity: u32, max: u32 },

    /// Malformed security code
    #[error("Invalid security code format: {0}")]
    InvalidFormat(String),

    /// Malformed catalog or rules configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration missing or unusable at startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Lottery type withdrawn
    #[error("Lottery type {0} is disabled")]
    TypeDisabled(u64),

    /// No tickets left
    #[error("Sold out")]
    SoldOut,

    /// A pool is already open for this lottery type
    #[error("Lottery type {0} already has an active pool")]
    PoolAlreadyActive(u64),

    /// Debit would make the balance negative
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    /// Not enough points to redeem a product
    #[error("Insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: i64, available: i64 },

    /// Product has no redeemable key
    #[error("No available card key for product {0}")]
    NoAvailableKey(u64),

    /// Product not redeemable
    #[error("Product {0} is disabled")]
    ProductDisabled(u64),

    /// Ticket already revealed
    #[error("Ticket {0} already scratched")]
    AlreadyScratched(u64),

    /// Ticket outcome not revealed yet
    #[error("Ticket {0} has not been scratched")]
    Sealed(u64),

    /// Ticket cannot be claimed in its current state
    #[error("Ticket {0} cannot be claimed: {1}")]
    NotClaimable(u64, String),

    /// Ticket belongs to someone else
    #[error("Ticket {0} is not owned by the caller")]
    NotOwned(u64),

    /// Wallet already created
    #[error("Wallet already exists for user {0}")]
    WalletExists(u64),

    /// Payment callback signature mismatch
    #[error("Invalid payment signature")]
    InvalidSignature,

    /// Callback money differs from the order
    #[error("Amount mismatch: order {expected}, callback {declared}")]
    AmountMismatch { expected: String, declared: String },

    /// Callback for an unknown order
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Order already settled
    #[error("Order {0} already paid")]
    AlreadyPaid(String),

    /// Unique code generation gave up
    #[error("Security code generation exhausted after {0} attempts")]
    SecurityCodeExhausted(u32),

    /// Ticket content could not be decrypted or decoded
    #[error("Ticket integrity error: {0}")]
    Integrity(String),

    /// Inventory counters disagree
    #[error("Inventory inconsistent: {0}")]
    InventoryInconsistent(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create a not found error
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidAmount(_)
            | EngineError::InvalidQuantity { .. }
            | EngineError::InvalidFormat(_)
            | EngineError::InvalidConfig(_) => ErrorKind::Validation,

            EngineError::NotFound { .. }
            | EngineError::Forbidden(_)
            | EngineError::TypeDisabled(_)
            | EngineError::SoldOut
            | EngineError::PoolAlreadyActive(_)
            | EngineError::InsufficientBalance { .. }
            | EngineError::InsufficientPoints { .. }
            | EngineError::NoAvailableKey(_)
            | EngineError::ProductDisabled(_)
            | EngineError::AlreadyScratched(_)
            | EngineError::Sealed(_)
            | EngineError::NotClaimable(..)
            | EngineError::NotOwned(_)
            | EngineError::WalletExists(_)
            | EngineError::AlreadyPaid(_) => ErrorKind::Conflict,

            EngineError::Integrity(_) | EngineError::InventoryInconsistent(_) => {
                ErrorKind::Integrity
            }

            EngineError::InvalidSignature
            | EngineError::AmountMismatch { .. }
            | EngineError::OrderNotFound(_) => ErrorKind::External,

            EngineError::Configuration(_)
            | EngineError::SecurityCodeExhausted(_)
            | EngineError::Storage(_)
            | EngineError::Internal(_) => ErrorKind::Fatal,
        }
    }

    /// Whether an identical retry could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Storage(StoreError::Conflict) | EngineError::Storage(StoreError::Backend(_))
        )
    }
}

impl From<CoreError> for EngineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::SoldOut => EngineError::SoldOut,
            CoreError::InventoryInconsistent {
                level_remaining,
                remaining_tickets,
            } => EngineError::InventoryInconsistent(format!(
                "{} prize slots for {} unsold tickets",
                level_remaining, remaining_tickets
            )),
            CoreError::LevelExhausted { level } => {
                EngineError::InventoryInconsistent(format!("prize level {} exhausted", level))
            }
            CoreError::InvalidConfig(msg) => EngineError::InvalidConfig(msg),
            CoreError::InvalidFormat(msg) => EngineError::InvalidFormat(msg),
            CoreError::SecurityCodeExhausted { attempts } => {
                EngineError::SecurityCodeExhausted(attempts)
            }
            CoreError::InvalidKey(msg) => EngineError::Configuration(msg),
            CoreError::Decryption(msg) => EngineError::Integrity(msg),
            CoreError::Encryption(msg)
            | CoreError::Serialization(msg)
            | CoreError::StateTransition(msg) => EngineError::Internal(msg),
        }
    }
}
