//! In-memory store
//!
//! One mutex guards the whole keyspace for the duration of a unit, which
//! makes every unit serializable. Writes go to an overlay and are applied
//! only after the closure succeeds.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::kv::KvTx;
use crate::tx::StoreTx;
use crate::LotteryStore;

type KeySpace = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory store for tests and development
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<KeySpace>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys (rows plus index entries)
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all data
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panicking unit never applied its overlay, so a poisoned
    // keyspace is still consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, KeySpace> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct OverlayTx<'a> {
    base: &'a KeySpace,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl KvTx for OverlayTx<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => Ok(self.base.get(key).cloned()),
        }
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }
}

impl LotteryStore for MemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: Fn(&mut StoreTx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut data = self.lock();

        let (result, writes) = {
            let mut overlay = OverlayTx {
                base: &data,
                writes: BTreeMap::new(),
            };
            let result = f(&mut StoreTx::new(&mut overlay));
            (result, overlay.writes)
        };

        let value = result?;
        for (key, pending) in writes {
            match pending {
                Some(bytes) => {
                    data.insert(key, bytes);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        Ok(value)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
