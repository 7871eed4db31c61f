//! Lottery catalog: types, prize levels and prize pools

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LotteryTypeId, PrizeLevelId, PrizePoolId};
use crate::error::{CoreError, CoreResult};

/// Game variant of a lottery type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    /// Match a winning number
    NumberMatch,
    /// Match three symbols
    SymbolMatch,
    /// Revealed amounts add up to the prize
    AmountSum,
    /// Base amount times a multiplier
    Multiplier,
    /// Grid of symbols with an optional special symbol
    Pattern,
}

impl GameType {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "number_match" => Some(Self::NumberMatch),
            "symbol_match" => Some(Self::SymbolMatch),
            "amount_sum" => Some(Self::AmountSum),
            "multiplier" => Some(Self::Multiplier),
            "pattern" => Some(Self::Pattern),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::NumberMatch => write!(f, "number_match"),
            GameType::SymbolMatch => write!(f, "symbol_match"),
            GameType::AmountSum => write!(f, "amount_sum"),
            GameType::Multiplier => write!(f, "multiplier"),
            GameType::Pattern => write!(f, "pattern"),
        }
    }
}

/// Sale status of a lottery type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryStatus {
    /// On sale
    Available,
    /// Current pool exhausted
    SoldOut,
    /// Withdrawn by an administrator
    Disabled,
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotteryType {
    /// Lottery type ID
    pub id: LotteryTypeId,
    /// Display name
    pub name: String,
    /// Ticket price in points
    pub price: i64,
    /// Upper bound on a single ticket payout (0 = unbounded)
    pub max_prize: i64,
    /// Game variant
    pub game_type: GameType,
    /// Raw rules config, parsed by [`crate::GameRules::parse`]
    pub rules_config: serde_json::Value,
    /// Status
    pub status: LotteryStatus,
    /// Created at
    pub created_at: DateTime<Utc>,
}

impl LotteryType {
    /// Cap a payout at `max_prize`
    pub fn cap_prize(&self, amount: i64) -> i64 {
        if self.max_prize > 0 {
            amount.min(self.max_prize)
        } else {
            amount
        }
    }
}

/// One payout tier with finite supply
///
/// Invariant: `remaining <= quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeLevel {
    /// Prize level ID
    pub id: PrizeLevelId,
    /// Owning lottery type
    pub lottery_type_id: LotteryTypeId,
    /// Rank, lower means more valuable
    pub level: u32,
    /// Payout in points
    pub prize_amount: i64,
    /// Initial supply
    pub quantity: u64,
    /// Unclaimed supply
    pub remaining: u64,
}

impl PrizeLevel {
    /// Create a level with full supply
    pub fn new(
        id: PrizeLevelId,
        lottery_type_id: LotteryTypeId,
        level: u32,
        prize_amount: i64,
        quantity: u64,
    ) -> Self {
        Self {
            id,
            lottery_type_id,
            level,
            prize_amount,
            quantity,
            remaining: quantity,
        }
    }

    /// Number of tickets already drawn at this level
    pub fn drawn(&self) -> u64 {
        self.quantity - self.remaining
    }

    /// Consume one unit of supply
    pub fn take_one(&mut self) -> CoreResult<()> {
        if self.remaining == 0 {
            return Err(CoreError::LevelExhausted { level: self.level });
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// Pool status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    /// Selling tickets
    Active,
    /// Every ticket sold
    SoldOut,
}

/// Finite batch of tickets for one lottery type
///
/// Invariant: `sold_tickets <= total_tickets`, and the status is
/// `SoldOut` exactly when they are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizePool {
    /// Pool ID
    pub id: PrizePoolId,
    /// Owning lottery type
    pub lottery_type_id: LotteryTypeId,
    /// Batch size
    pub total_tickets: u64,
    /// Tickets sold so far
    pub sold_tickets: u64,
    /// Winning tickets scratched so far
    pub claimed_prizes: u64,
    /// Status
    pub status: PoolStatus,
    /// Created at
    pub created_at: DateTime<Utc>,
}

impl PrizePool {
    /// Create an active pool
    pub fn new(id: PrizePoolId, lottery_type_id: LotteryTypeId, total_tickets: u64) -> Self {
        Self {
            id,
            lottery_type_id,
            total_tickets,
            sold_tickets: 0,
            claimed_prizes: 0,
            status: PoolStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Unsold tickets
    pub fn remaining_tickets(&self) -> u64 {
        self.total_tickets.saturating_sub(self.sold_tickets)
    }

    /// Whether every ticket has been sold
    pub fn is_exhausted(&self) -> bool {
        self.sold_tickets >= self.total_tickets
    }

    /// Record one sale; returns true when this sale exhausted the pool
    pub fn record_sale(&mut self) -> CoreResult<bool> {
        if self.is_exhausted() {
            return Err(CoreError::SoldOut);
        }
        self.sold_tickets += 1;
        if self.is_exhausted() {
            self.status = PoolStatus::SoldOut;
            return Ok(true);
        }
        Ok(false)
    }

    /// Record a scratched winning ticket
    pub fn record_claim(&mut self) {
        self.claimed_prizes += 1;
    }
}
