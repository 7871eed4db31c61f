//! Points ledger primitives
//!
//! Every balance change goes through [`add_transaction`], which updates the
//! cached wallet balance and appends the matching transaction row inside the
//! caller's store unit. Both rows commit together or not at all, so
//! `wallet.balance == sum(transactions.amount)` holds after every commit.

use chrono::Utc;
use scratch_core::{Transaction, TransactionType, UserId, Wallet};
use scratch_store::{Sequence, StoreTx};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A committed balance change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Wallet after the change
    pub wallet: Wallet,
    /// Appended ledger row
    pub transaction: Transaction,
}

/// Apply a signed `amount` to `user_id`'s wallet and record it
///
/// Fails `InsufficientBalance` when a debit would go below zero and
/// `InvalidAmount` for zero or when a credit would overflow.
pub(crate) fn add_transaction(
    tx: &mut StoreTx<'_>,
    user_id: UserId,
    amount: i64,
    tx_type: TransactionType,
    description: &str,
    reference_id: Option<&str>,
) -> EngineResult<Posting> {
    if amount == 0 {
        return Err(EngineError::InvalidAmount(amount));
    }

    let mut wallet = tx
        .wallet_by_user(user_id)?
        .ok_or_else(|| EngineError::not_found("wallet", user_id))?;

    let balance_after = match wallet.checked_apply(amount) {
        Some(balance) => balance,
        None if amount < 0 => {
            return Err(EngineError::InsufficientBalance {
                required: amount.saturating_neg(),
                available: wallet.balance,
            })
        }
        None => return Err(EngineError::InvalidAmount(amount)),
    };

    let now = Utc::now();
    wallet.balance = balance_after;
    wallet.updated_at = now;
    tx.update_wallet(&wallet)?;

    let transaction = Transaction {
        id: tx.next_id(Sequence::Transaction)?,
        wallet_id: wallet.id,
        user_id,
        tx_type,
        amount,
        balance_after,
        description: description.to_string(),
        reference_id: reference_id.map(str::to_string),
        created_at: now,
    };
    tx.insert_transaction(&transaction)?;

    Ok(Posting {
        wallet,
        transaction,
    })
}

/// Credit a positive `amount`
pub(crate) fn credit(
    tx: &mut StoreTx<'_>,
    user_id: UserId,
    amount: i64,
    tx_type: TransactionType,
    description: &str,
    reference_id: Option<&str>,
) -> EngineResult<Posting> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    add_transaction(tx, user_id, amount, tx_type, description, reference_id)
}

/// Debit a positive `amount`
pub(crate) fn debit(
    tx: &mut StoreTx<'_>,
    user_id: UserId,
    amount: i64,
    tx_type: TransactionType,
    description: &str,
    reference_id: Option<&str>,
) -> EngineResult<Posting> {
    if amount <= 0 {
        return Err(EngineError::InvalidAmount(amount));
    }
    add_transaction(tx, user_id, -amount, tx_type, description, reference_id)
}

/// Create `user_id`'s wallet and post the initial grant
pub(crate) fn open_wallet(
    tx: &mut StoreTx<'_>,
    user_id: UserId,
    initial_grant: i64,
) -> EngineResult<Wallet> {
    if tx.wallet_by_user(user_id)?.is_some() {
        return Err(EngineError::WalletExists(user_id));
    }

    let wallet = Wallet::new(tx.next_id(Sequence::Wallet)?, user_id);
    tx.insert_wallet(&wallet)?;

    if initial_grant > 0 {
        let posting = credit(
            tx,
            user_id,
            initial_grant,
            TransactionType::Initial,
            "Initial grant",
            None,
        )?;
        return Ok(posting.wallet);
    }
    Ok(wallet)
}

/// Result of comparing a cached balance against its ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Owner
    pub user_id: UserId,
    /// Wallet ID
    pub wallet_id: u64,
    /// Cached balance
    pub balance: i64,
    /// Sum of all transaction amounts
    pub ledger_sum: i64,
    /// Number of transactions
    pub entries: usize,
    /// Whether the last row's `balance_after` matches the cache
    pub chain_consistent: bool,
}

impl ReconcileReport {
    /// Whether cache and ledger agree
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_sum && self.chain_consistent
    }
}

/// Recompute one wallet's ledger
pub(crate) fn reconcile_wallet(tx: &StoreTx<'_>, wallet: &Wallet) -> EngineResult<ReconcileReport> {
    let transactions = tx.transactions_for_wallet(wallet.id)?;

    let mut running: i64 = 0;
    let mut chain_consistent = true;
    for t in &transactions {
        running = running
            .checked_add(t.amount)
            .ok_or_else(|| EngineError::Integrity(format!("ledger overflow on wallet {}", wallet.id)))?;
        if t.balance_after != running {
            chain_consistent = false;
        }
    }

    Ok(ReconcileReport {
        user_id: wallet.user_id,
        wallet_id: wallet.id,
        balance: wallet.balance,
        ledger_sum: running,
        entries: transactions.len(),
        chain_consistent,
    })
}
