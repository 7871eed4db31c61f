//! Purchase: charge the buyer and generate tickets in one unit
//!
//! Each ticket's outcome is drawn from the active pool's remaining inventory
//! at generation time and sealed under the server key. The plaintext
//! `prize_amount` on the row is a cache for settlement and statistics and
//! never leaves the engine before the ticket is scratched.

use chrono::Utc;
use rand::rngs::OsRng;
use scratch_core::prize::{build_content, draw};
use scratch_core::{
    security_code, GameRules, LevelSlot, LotteryStatus, LotteryType, LotteryTypeId, PrizeLevel,
    PrizePool, PrizePoolId, Ticket, TicketCipher, TicketStatus, TransactionId, TransactionType,
    UnrevealedTicket, UserId,
};
use scratch_store::{LotteryStore, Sequence, StoreTx};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::{EngineError, EngineResult};
use crate::ledger;

use super::ScratchEngine;

/// Outcome of a purchase
///
/// Tickets are returned in their unrevealed form only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Pool the tickets came from
    pub pool_id: PrizePoolId,
    /// Bought tickets
    pub tickets: Vec<UnrevealedTicket>,
    /// Points charged
    pub total_cost: i64,
    /// Balance after the charge
    pub balance: i64,
    /// The single `purchase` ledger row
    pub transaction_id: TransactionId,
}

/// Execute a purchase
pub async fn execute<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    lottery_type_id: LotteryTypeId,
    quantity: u32,
) -> EngineResult<PurchaseReceipt> {
    let max = engine.config().max_purchase_quantity;
    if quantity == 0 || quantity > max {
        return Err(EngineError::InvalidQuantity { quantity, max });
    }

    let user_id = caller.user_id;
    let attempts = engine.config().security_code_attempts;
    let cipher = engine.cipher();

    let receipt = engine.store().transaction(|tx| {
        let mut lottery = tx
            .lottery_type(lottery_type_id)?
            .ok_or_else(|| EngineError::not_found("lottery type", lottery_type_id))?;
        if lottery.status == LotteryStatus::Disabled {
            return Err(EngineError::TypeDisabled(lottery_type_id));
        }
        let rules = GameRules::parse(lottery.game_type, &lottery.rules_config)?;

        let mut pool = tx.active_pool(lottery_type_id)?.ok_or(EngineError::SoldOut)?;
        if pool.remaining_tickets() < u64::from(quantity) {
            return Err(EngineError::SoldOut);
        }

        let total_cost = lottery
            .price
            .checked_mul(i64::from(quantity))
            .ok_or(EngineError::InvalidAmount(lottery.price))?;
        let posting = ledger::debit(
            tx,
            user_id,
            total_cost,
            TransactionType::Purchase,
            &format!("{} x{}", lottery.name, quantity),
            Some(&format!("pool:{}", pool.id)),
        )?;

        let mut levels = tx.prize_levels_for(lottery_type_id)?;
        let mut tickets = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let ticket = generate_ticket(
                tx,
                cipher,
                attempts,
                user_id,
                &lottery,
                &rules,
                &mut pool,
                &mut levels,
            )?;
            tickets.push(UnrevealedTicket {
                ticket_id: ticket.id,
                security_code: ticket.security_code,
                lottery_type_id,
                status: ticket.status,
                purchased_at: ticket.purchased_at,
            });
        }

        if pool.is_exhausted() && lottery.status == LotteryStatus::Available {
            lottery.status = LotteryStatus::SoldOut;
            tx.put_lottery_type(&lottery)?;
        }

        Ok(PurchaseReceipt {
            pool_id: pool.id,
            tickets,
            total_cost,
            balance: posting.wallet.balance,
            transaction_id: posting.transaction.id,
        })
    })?;

    tracing::info!(
        user_id,
        lottery_type_id,
        pool_id = receipt.pool_id,
        quantity,
        total_cost = receipt.total_cost,
        "tickets purchased"
    );
    Ok(receipt)
}

/// Generate one ticket against the in-unit pool and level rows
///
/// Draws, seals, inserts, then writes back the pool and the drawn level so
/// that the next ticket of the same purchase sees the reduced inventory.
#[allow(clippy::too_many_arguments)]
fn generate_ticket(
    tx: &mut StoreTx<'_>,
    cipher: &TicketCipher,
    attempts: u32,
    user_id: UserId,
    lottery: &LotteryType,
    rules: &GameRules,
    pool: &mut PrizePool,
    levels: &mut [PrizeLevel],
) -> EngineResult<Ticket> {
    if pool.is_exhausted() {
        return Err(EngineError::SoldOut);
    }

    let slots: Vec<LevelSlot> = levels.iter().map(LevelSlot::from).collect();
    let outcome = draw(&mut OsRng, pool.remaining_tickets(), &slots)?;

    let code = security_code::generate_unique(attempts, |code| {
        tx.security_code_exists(code).map_err(EngineError::from)
    })?;

    let content = build_content(&mut OsRng, lottery, rules, &outcome)?;
    let sealed = cipher.seal(&content)?;

    let ticket = Ticket {
        id: tx.next_id(Sequence::Ticket)?,
        user_id,
        lottery_type_id: lottery.id,
        prize_pool_id: pool.id,
        security_code: code,
        content_encrypted: sealed,
        prize_amount: content.prize_amount(),
        prize_level: content.prize_level(),
        status: TicketStatus::Unscratched,
        purchased_at: Utc::now(),
        scratched_at: None,
        claimed_at: None,
    };
    tx.insert_ticket(&ticket)?;

    if pool.record_sale()? {
        tracing::info!(pool_id = pool.id, "prize pool sold out");
    }
    tx.put_prize_pool(pool)?;

    if let Some(level_id) = outcome.level_id() {
        let level = levels
            .iter_mut()
            .find(|l| l.id == level_id)
            .ok_or_else(|| EngineError::InventoryInconsistent(format!("drawn level {} missing", level_id)))?;
        level.take_one()?;
        tx.put_prize_level(level)?;
    }

    tracing::debug!(
        ticket_id = ticket.id,
        code = security_code::log_prefix(&ticket.security_code),
        "ticket generated"
    );
    Ok(ticket)
}
