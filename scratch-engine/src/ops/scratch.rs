//! Scratch and claim
//!
//! Scratching reveals the outcome sealed at purchase time. The sealed
//! content is the source of truth: it is decrypted, checked against the
//! row's plaintext cache, and only then credited. Nothing is re-drawn.

use chrono::Utc;
use scratch_core::{TicketContent, TicketId, TicketStatus, TicketView, TransactionType};
use scratch_store::{LotteryStore, StoreTx};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::{EngineError, EngineResult};
use crate::ledger;

use super::ScratchEngine;

/// Outcome of scratching one ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchResult {
    /// Ticket ID
    pub ticket_id: TicketId,
    /// Payout credited
    pub prize_amount: i64,
    /// Whether it paid out
    pub is_win: bool,
    /// Decrypted content
    pub content: TicketContent,
    /// Balance after settlement
    pub balance: i64,
}

/// Load a ticket the caller owns
fn owned_ticket(
    tx: &StoreTx<'_>,
    caller: &Caller,
    ticket_id: TicketId,
) -> EngineResult<scratch_core::Ticket> {
    let ticket = tx
        .ticket(ticket_id)?
        .ok_or_else(|| EngineError::not_found("ticket", ticket_id))?;
    if ticket.user_id != caller.user_id {
        return Err(EngineError::NotOwned(ticket_id));
    }
    Ok(ticket)
}

/// Reveal and settle a ticket in one unit
pub async fn execute<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    ticket_id: TicketId,
) -> EngineResult<ScratchResult> {
    let cipher = engine.cipher();

    let result = engine.store().transaction(|tx| {
        let mut ticket = owned_ticket(tx, caller, ticket_id)?;
        if ticket.status != TicketStatus::Unscratched {
            return Err(EngineError::AlreadyScratched(ticket_id));
        }

        let content = cipher.open(&ticket.content_encrypted)?;
        if content.prize_amount() != ticket.prize_amount {
            return Err(EngineError::Integrity(format!(
                "ticket {} sealed prize {} disagrees with cached {}",
                ticket_id,
                content.prize_amount(),
                ticket.prize_amount
            )));
        }

        let prize_amount = content.prize_amount();
        let balance = if prize_amount > 0 {
            let posting = ledger::credit(
                tx,
                caller.user_id,
                prize_amount,
                TransactionType::Win,
                &format!("Ticket {} prize", ticket_id),
                Some(&format!("ticket:{}", ticket_id)),
            )?;

            let mut pool = tx
                .prize_pool(ticket.prize_pool_id)?
                .ok_or_else(|| EngineError::not_found("prize pool", ticket.prize_pool_id))?;
            pool.record_claim();
            tx.put_prize_pool(&pool)?;

            posting.wallet.balance
        } else {
            tx.wallet_by_user(caller.user_id)?
                .ok_or_else(|| EngineError::not_found("wallet", caller.user_id))?
                .balance
        };

        ticket.mark_scratched(Utc::now())?;
        tx.update_ticket(&ticket)?;

        Ok(ScratchResult {
            ticket_id,
            prize_amount,
            is_win: prize_amount > 0,
            content,
            balance,
        })
    });

    match &result {
        Ok(r) => tracing::info!(
            user_id = caller.user_id,
            ticket_id,
            prize_amount = r.prize_amount,
            "ticket scratched"
        ),
        Err(EngineError::Integrity(msg)) => {
            tracing::error!(ticket_id, error = %msg, "sealed ticket content rejected")
        }
        Err(_) => {}
    }
    result
}

/// Idempotent read of a revealed ticket's content
pub async fn reveal<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    ticket_id: TicketId,
) -> EngineResult<TicketContent> {
    let ticket = engine
        .store()
        .transaction(|tx| owned_ticket(tx, caller, ticket_id))?;
    if !ticket.status.is_revealed() {
        return Err(EngineError::Sealed(ticket_id));
    }
    Ok(engine.cipher().open(&ticket.content_encrypted)?)
}

/// `scratched -> claimed` for a winning ticket; no ledger effect
pub async fn claim<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    ticket_id: TicketId,
) -> EngineResult<TicketView> {
    let ticket = engine.store().transaction(|tx| {
        let mut ticket = owned_ticket(tx, caller, ticket_id)?;
        match ticket.status {
            TicketStatus::Scratched if ticket.is_win() => {}
            TicketStatus::Scratched => {
                return Err(EngineError::NotClaimable(
                    ticket_id,
                    "ticket did not win".to_string(),
                ))
            }
            status => {
                return Err(EngineError::NotClaimable(
                    ticket_id,
                    format!("ticket is {}", status),
                ))
            }
        }
        ticket.mark_claimed(Utc::now())?;
        tx.update_ticket(&ticket)?;
        Ok(ticket)
    })?;

    tracing::info!(user_id = caller.user_id, ticket_id, "ticket claimed");
    Ok(TicketView::of(&ticket))
}
