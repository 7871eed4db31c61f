//! Scratch Store - Transactional Persistence
//!
//! Every read and write goes through [`LotteryStore::transaction`], which
//! runs a closure against a [`StoreTx`] and commits all of its writes or
//! none of them. Reads inside the closure see the authoritative committed
//! state plus the closure's own writes, so engine code always re-reads rows
//! inside the unit that mutates them.
//!
//! # Backends
//!
//! - [`MemoryStore`]: a single lock over a B-tree with a write overlay.
//!   Units are fully serialized. Intended for tests and development.
//! - [`SledStore`]: sled's optimistic serializable transactions. A unit
//!   that loses a conflict is re-run by sled, so closures must be
//!   re-runnable (`Fn`) and free of external side effects.
//!
//! # Usage
//!
//! ```rust
//! use scratch_store::{LotteryStore, MemoryStore, Sequence};
//!
//! let store = MemoryStore::new();
//! let id = store
//!     .transaction(|tx| tx.next_id(Sequence::Ticket))
//!     .unwrap();
//! assert_eq!(id, 1);
//! ```

pub mod error;
mod kv;
pub mod memory;
pub mod sled;
mod tx;

pub use error::{StoreError, StoreResult};
pub use kv::KvTx;
pub use memory::MemoryStore;
pub use self::sled::SledStore;
pub use tx::{Sequence, StoreTx};

/// Transactional store
pub trait LotteryStore: Send + Sync + 'static {
    /// Run `f` as one atomic unit
    ///
    /// If `f` returns `Err`, nothing it wrote becomes visible. `f` may be
    /// invoked more than once by backends that retry on conflict.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: Fn(&mut StoreTx<'_>) -> Result<T, E>,
        E: From<StoreError>;

    /// Persist buffered writes
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Data directory (empty = in-memory)
    pub data_dir: String,
    /// sled page cache size in bytes
    pub cache_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: "./scratch_data".to_string(),
            cache_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl StoreConfig {
    /// Load from `SCRATCH_DATA_DIR`, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("SCRATCH_DATA_DIR") {
            config.data_dir = dir;
        }
        config
    }

    /// Development configuration
    pub fn development() -> Self {
        Self {
            data_dir: "./scratch_dev_data".to_string(),
            cache_size: 16 * 1024 * 1024, // 16MB
        }
    }

    /// Test configuration (in-memory)
    pub fn test() -> Self {
        Self {
            data_dir: String::new(),
            cache_size: 4 * 1024 * 1024, // 4MB
        }
    }

    /// Whether this config selects the in-memory backend
    pub fn is_in_memory(&self) -> bool {
        self.data_dir.is_empty()
    }
}
