//! Catalog administration: lottery types, prize levels and pools

use chrono::Utc;
use scratch_core::{
    GameRules, GameType, LotteryStatus, LotteryType, LotteryTypeId, PoolStatus, PrizeLevel,
    PrizeLevelId, PrizePool, PrizePoolId, TicketStatus,
};
use scratch_store::{LotteryStore, Sequence};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::{EngineError, EngineResult};

use super::ScratchEngine;

/// Input for [`create_lottery_type`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLotteryType {
    /// Display name
    pub name: String,
    /// Ticket price in points
    pub price: i64,
    /// Per-ticket payout cap, 0 for none
    #[serde(default)]
    pub max_prize: i64,
    /// Game variant
    pub game_type: GameType,
    /// Variant-specific rules
    #[serde(default)]
    pub rules_config: serde_json::Value,
}

/// Per-level figures inside [`PoolStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Level ID
    pub level_id: PrizeLevelId,
    /// Rank
    pub level: u32,
    /// Payout
    pub prize_amount: i64,
    /// Supply per pool
    pub quantity: u64,
    /// Supply left in this pool
    pub remaining: u64,
    /// Tickets drawn at this level
    pub drawn: u64,
}

/// Inventory and payout snapshot of one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Pool row
    pub pool: PrizePool,
    /// Level figures, best rank first
    pub levels: Vec<LevelStats>,
    /// Sum of prize amounts sealed into sold tickets
    pub prize_liability: i64,
    /// Sum already credited through scratching
    pub paid_out: i64,
    /// Sold tickets not yet scratched
    pub unscratched: u64,
}

pub async fn create_lottery_type<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    new: NewLotteryType,
) -> EngineResult<LotteryType> {
    caller.require_admin("create_lottery_type")?;

    if new.name.trim().is_empty() {
        return Err(EngineError::InvalidConfig("name must not be empty".to_string()));
    }
    if new.price <= 0 {
        return Err(EngineError::InvalidAmount(new.price));
    }
    if new.max_prize < 0 {
        return Err(EngineError::InvalidAmount(new.max_prize));
    }
    // Malformed rules never reach the store
    GameRules::parse(new.game_type, &new.rules_config)?;

    let lottery = engine.store().transaction(|tx| {
        let lottery = LotteryType {
            id: tx.next_id(Sequence::LotteryType)?,
            name: new.name.trim().to_string(),
            price: new.price,
            max_prize: new.max_prize,
            game_type: new.game_type,
            rules_config: new.rules_config.clone(),
            status: LotteryStatus::Available,
            created_at: Utc::now(),
        };
        tx.put_lottery_type(&lottery)?;
        Ok::<_, EngineError>(lottery)
    })?;

    tracing::info!(
        lottery_type_id = lottery.id,
        game_type = %lottery.game_type,
        price = lottery.price,
        "lottery type created"
    );
    Ok(lottery)
}

pub async fn add_prize_level<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    lottery_type_id: LotteryTypeId,
    level: u32,
    prize_amount: i64,
    quantity: u64,
) -> EngineResult<PrizeLevel> {
    caller.require_admin("add_prize_level")?;

    if prize_amount <= 0 {
        return Err(EngineError::InvalidAmount(prize_amount));
    }
    if quantity == 0 {
        return Err(EngineError::InvalidConfig(
            "prize level quantity must be at least 1".to_string(),
        ));
    }

    let created = engine.store().transaction(|tx| {
        let lottery = tx
            .lottery_type(lottery_type_id)?
            .ok_or_else(|| EngineError::not_found("lottery type", lottery_type_id))?;
        if lottery.max_prize > 0 && prize_amount > lottery.max_prize {
            return Err(EngineError::InvalidConfig(format!(
                "prize {} exceeds max prize {}",
                prize_amount, lottery.max_prize
            )));
        }
        if tx.active_pool(lottery_type_id)?.is_some() {
            return Err(EngineError::PoolAlreadyActive(lottery_type_id));
        }
        if tx
            .prize_levels_for(lottery_type_id)?
            .iter()
            .any(|l| l.level == level)
        {
            return Err(EngineError::InvalidConfig(format!(
                "prize level {} already defined",
                level
            )));
        }

        let row = PrizeLevel::new(
            tx.next_id(Sequence::PrizeLevel)?,
            lottery_type_id,
            level,
            prize_amount,
            quantity,
        );
        tx.put_prize_level(&row)?;
        Ok(row)
    })?;

    tracing::info!(lottery_type_id, level, prize_amount, quantity, "prize level added");
    Ok(created)
}

/// Open a pool and restock every level to its full quantity
pub async fn open_pool<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    lottery_type_id: LotteryTypeId,
    total_tickets: u64,
) -> EngineResult<PrizePool> {
    caller.require_admin("open_pool")?;

    if total_tickets == 0 {
        return Err(EngineError::InvalidConfig(
            "pool must hold at least one ticket".to_string(),
        ));
    }

    let pool = engine.store().transaction(|tx| {
        let mut lottery = tx
            .lottery_type(lottery_type_id)?
            .ok_or_else(|| EngineError::not_found("lottery type", lottery_type_id))?;
        if tx.active_pool(lottery_type_id)?.is_some() {
            return Err(EngineError::PoolAlreadyActive(lottery_type_id));
        }

        let levels = tx.prize_levels_for(lottery_type_id)?;
        let prize_slots: u64 = levels.iter().map(|l| l.quantity).sum();
        if prize_slots > total_tickets {
            return Err(EngineError::InvalidConfig(format!(
                "{} prize slots do not fit in {} tickets",
                prize_slots, total_tickets
            )));
        }
        for mut level in levels {
            level.remaining = level.quantity;
            tx.put_prize_level(&level)?;
        }

        let pool = PrizePool::new(tx.next_id(Sequence::PrizePool)?, lottery_type_id, total_tickets);
        tx.put_prize_pool(&pool)?;

        if lottery.status == LotteryStatus::SoldOut {
            lottery.status = LotteryStatus::Available;
            tx.put_lottery_type(&lottery)?;
        }
        Ok(pool)
    })?;

    tracing::info!(lottery_type_id, pool_id = pool.id, total_tickets, "prize pool opened");
    Ok(pool)
}

pub async fn set_lottery_status<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    lottery_type_id: LotteryTypeId,
    status: LotteryStatus,
) -> EngineResult<LotteryType> {
    caller.require_admin("set_lottery_status")?;

    let lottery = engine.store().transaction(|tx| {
        let mut lottery = tx
            .lottery_type(lottery_type_id)?
            .ok_or_else(|| EngineError::not_found("lottery type", lottery_type_id))?;
        lottery.status = status;
        tx.put_lottery_type(&lottery)?;
        Ok::<_, EngineError>(lottery)
    })?;

    tracing::info!(lottery_type_id, status = ?status, "lottery status changed");
    Ok(lottery)
}

pub async fn lottery_types<S: LotteryStore>(
    engine: &ScratchEngine<S>,
) -> EngineResult<Vec<LotteryType>> {
    engine
        .store()
        .transaction(|tx| tx.lottery_types().map_err(EngineError::from))
}

pub async fn pool_stats<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    pool_id: PrizePoolId,
) -> EngineResult<PoolStats> {
    engine.store().transaction(|tx| {
        let pool = tx
            .prize_pool(pool_id)?
            .ok_or_else(|| EngineError::not_found("prize pool", pool_id))?;
        let tickets = tx.tickets_for_pool(pool_id)?;

        // Level counters describe the newest pool of the type only
        let newest = tx
            .pools_for(pool.lottery_type_id)?
            .iter()
            .map(|p| p.id)
            .max()
            .unwrap_or(pool.id);
        let levels = if newest == pool.id {
            tx.prize_levels_for(pool.lottery_type_id)?
                .iter()
                .map(|l| LevelStats {
                    level_id: l.id,
                    level: l.level,
                    prize_amount: l.prize_amount,
                    quantity: l.quantity,
                    remaining: l.remaining,
                    drawn: l.drawn(),
                })
                .collect()
        } else {
            tx.prize_levels_for(pool.lottery_type_id)?
                .iter()
                .map(|l| {
                    let drawn = tickets
                        .iter()
                        .filter(|t| t.prize_level == Some(l.level))
                        .count() as u64;
                    LevelStats {
                        level_id: l.id,
                        level: l.level,
                        prize_amount: l.prize_amount,
                        quantity: l.quantity,
                        remaining: l.quantity.saturating_sub(drawn),
                        drawn,
                    }
                })
                .collect()
        };

        let prize_liability = tickets.iter().map(|t| t.prize_amount).sum();
        let paid_out = tickets
            .iter()
            .filter(|t| t.status.is_revealed())
            .map(|t| t.prize_amount)
            .sum();
        let unscratched = tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Unscratched)
            .count() as u64;

        if pool.status == PoolStatus::SoldOut && pool.sold_tickets != tickets.len() as u64 {
            tracing::warn!(
                pool_id,
                sold = pool.sold_tickets,
                rows = tickets.len(),
                "pool counter disagrees with ticket rows"
            );
        }

        Ok(PoolStats {
            pool,
            levels,
            prize_liability,
            paid_out,
            unscratched,
        })
    })
}
