//! Wallet and ledger operations

use scratch_core::{Transaction, TransactionType, UserId, Wallet};
use scratch_store::LotteryStore;

use crate::auth::Caller;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{self, Posting, ReconcileReport};

use super::ScratchEngine;

/// Create a wallet and post the initial grant in one unit
pub async fn register_user<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    user_id: UserId,
) -> EngineResult<Wallet> {
    let grant = engine.config().initial_grant;
    let wallet = engine
        .store()
        .transaction(|tx| ledger::open_wallet(tx, user_id, grant))?;

    tracing::info!(user_id, wallet_id = wallet.id, balance = wallet.balance, "wallet created");
    Ok(wallet)
}

pub async fn balance<S: LotteryStore>(engine: &ScratchEngine<S>, user_id: UserId) -> EngineResult<i64> {
    engine.store().transaction(|tx| {
        tx.wallet_by_user(user_id)?
            .map(|w| w.balance)
            .ok_or_else(|| EngineError::not_found("wallet", user_id))
    })
}

/// Most recent `limit` ledger rows, newest first
pub async fn transactions<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    user_id: UserId,
    limit: usize,
) -> EngineResult<Vec<Transaction>> {
    engine.store().transaction(|tx| {
        let wallet = tx
            .wallet_by_user(user_id)?
            .ok_or_else(|| EngineError::not_found("wallet", user_id))?;
        let mut rows = tx.transactions_for_wallet(wallet.id)?;
        rows.reverse();
        rows.truncate(limit);
        Ok(rows)
    })
}

/// Signed manual correction, recorded as an `adjustment` row
pub async fn admin_adjust<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    user_id: UserId,
    amount: i64,
    reason: &str,
) -> EngineResult<Posting> {
    caller.require_admin("admin_adjust")?;
    if reason.trim().is_empty() {
        return Err(EngineError::InvalidConfig(
            "adjustment reason must not be empty".to_string(),
        ));
    }

    let reference = format!("admin:{}", caller.user_id);
    let posting = engine.store().transaction(|tx| {
        ledger::add_transaction(
            tx,
            user_id,
            amount,
            TransactionType::Adjustment,
            reason,
            Some(&reference),
        )
    })?;

    tracing::info!(
        admin = caller.user_id,
        user_id,
        amount,
        balance = posting.wallet.balance,
        "balance adjusted"
    );
    Ok(posting)
}

pub async fn reconcile<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    user_id: UserId,
) -> EngineResult<ReconcileReport> {
    let report = engine.store().transaction(|tx| {
        let wallet = tx
            .wallet_by_user(user_id)?
            .ok_or_else(|| EngineError::not_found("wallet", user_id))?;
        ledger::reconcile_wallet(tx, &wallet)
    })?;

    if !report.is_consistent() {
        tracing::error!(
            user_id,
            balance = report.balance,
            ledger_sum = report.ledger_sum,
            "wallet balance disagrees with ledger"
        );
    }
    Ok(report)
}

/// Reconcile every wallet; mismatches are logged and returned, not fixed
pub async fn reconcile_all<S: LotteryStore>(
    engine: &ScratchEngine<S>,
) -> EngineResult<Vec<ReconcileReport>> {
    let reports = engine.store().transaction(|tx| {
        let wallets = tx.wallets()?;
        wallets
            .iter()
            .map(|w| ledger::reconcile_wallet(tx, w))
            .collect::<EngineResult<Vec<_>>>()
    })?;

    let mismatched = reports.iter().filter(|r| !r.is_consistent()).count();
    if mismatched > 0 {
        tracing::error!(wallets = reports.len(), mismatched, "ledger reconciliation failed");
    } else {
        tracing::info!(wallets = reports.len(), "ledger reconciled");
    }
    Ok(reports)
}
