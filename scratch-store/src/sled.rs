//! Sled persistent store
//!
//! All rows and indexes live in one tree so that a unit maps onto a single
//! sled transaction. sled re-runs the closure when a concurrent unit wins
//! a conflict.

use std::cell::RefCell;
use std::path::Path;

use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree,
    UnabortableTransactionError,
};

use crate::error::{StoreError, StoreResult};
use crate::kv::KvTx;
use crate::tx::StoreTx;
use crate::{LotteryStore, StoreConfig};

/// Tree name
const LOTTERY_TREE: &str = "lottery";

/// Sled-backed store
#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Open with configuration
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let db = sled::Config::new()
            .path(&config.data_dir)
            .cache_capacity(config.cache_size)
            .open()
            .map_err(|e| StoreError::Backend(format!("Failed to open sled db: {}", e)))?;
        Self::from_db(db)
    }

    /// Open or create a database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)
            .map_err(|e| StoreError::Backend(format!("Failed to open sled db: {}", e)))?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> StoreResult<Self> {
        let tree = db
            .open_tree(LOTTERY_TREE)
            .map_err(|e| StoreError::Backend(format!("Failed to open lottery tree: {}", e)))?;
        tracing::debug!("Opened sled store");
        Ok(Self { db, tree })
    }
}

struct SledKv<'a> {
    tree: &'a TransactionalTree,
    // First sled-level failure; surfaced to sled so it can retry conflicts
    failure: RefCell<Option<UnabortableTransactionError>>,
}

impl SledKv<'_> {
    fn record(&self, e: UnabortableTransactionError) -> StoreError {
        let err = match &e {
            UnabortableTransactionError::Conflict => StoreError::Conflict,
            UnabortableTransactionError::Storage(inner) => StoreError::Backend(inner.to_string()),
        };
        self.failure.borrow_mut().get_or_insert(e);
        err
    }
}

impl KvTx for SledKv<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.tree
            .get(key)
            .map(|v| v.map(|ivec| ivec.to_vec()))
            .map_err(|e| self.record(e))
    }

    fn put(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.tree
            .insert(key, value)
            .map(|_| ())
            .map_err(|e| self.record(e))
    }

    fn remove(&mut self, key: &[u8]) -> StoreResult<()> {
        self.tree
            .remove(key)
            .map(|_| ())
            .map_err(|e| self.record(e))
    }
}

impl LotteryStore for SledStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: Fn(&mut StoreTx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let outcome = self.tree.transaction(|tree| {
            let mut kv = SledKv {
                tree,
                failure: RefCell::new(None),
            };
            let result = f(&mut StoreTx::new(&mut kv));
            match result {
                Ok(value) => Ok(value),
                Err(err) => match kv.failure.into_inner() {
                    Some(sled_err) => Err(sled_err.into()),
                    None => Err(ConflictableTransactionError::Abort(err)),
                },
            }
        });

        match outcome {
            Ok(value) => Ok(value),
            Err(TransactionError::Abort(err)) => Err(err),
            Err(TransactionError::Storage(e)) => Err(StoreError::Backend(e.to_string()).into()),
        }
    }

    fn flush(&self) -> StoreResult<()> {
        self.db
            .flush()
            .map_err(|e| StoreError::Backend(format!("Failed to flush db: {}", e)))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::Sequence;
    use scratch_core::types::Wallet;
    use tempfile::tempdir;

    #[test]
    fn test_commit_and_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = SledStore::open(dir.path()).unwrap();
            store
                .transaction(|tx| {
                    let id = tx.next_id(Sequence::Wallet)?;
                    let mut wallet = Wallet::new(id, 3);
                    wallet.balance = 50;
                    tx.insert_wallet(&wallet)
                })
                .unwrap();
            store.flush().unwrap();
        }

        let store = SledStore::open(dir.path()).unwrap();
        let wallet = store
            .transaction(|tx| tx.wallet_by_user(3))
            .unwrap()
            .unwrap();
        assert_eq!(wallet.balance, 50);
    }

    #[test]
    fn test_abort_rolls_back() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let result: Result<(), StoreError> = store.transaction(|tx| {
            tx.insert_wallet(&Wallet::new(1, 3))?;
            Err(StoreError::Backend("abort".to_string()))
        });
        assert!(result.is_err());
        assert!(store
            .transaction(|tx| tx.wallet_by_user(3))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_concurrent_counters_do_not_lose_updates() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(SledStore::open(dir.path()).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .transaction(|tx| tx.next_id(Sequence::Ticket))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(
            store.transaction(|tx| tx.next_id(Sequence::Ticket)).unwrap(),
            101
        );
    }
}
