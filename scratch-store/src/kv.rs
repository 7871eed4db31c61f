//! Byte-level transaction interface implemented by each backend

use crate::error::StoreResult;

/// Key/value view of one open transaction
///
/// Reads must observe writes made earlier in the same transaction.
pub trait KvTx {
    /// Read a key
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Write a key
    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()>;

    /// Delete a key
    fn remove(&mut self, key: &[u8]) -> StoreResult<()>;
}
