//! Slot-based draw over remaining inventory

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{PrizeLevel, PrizeLevelId};

/// Remaining supply of one prize level as seen by the draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSlot {
    /// Prize level ID
    pub level_id: PrizeLevelId,
    /// Rank
    pub level: u32,
    /// Payout
    pub prize_amount: i64,
    /// Unclaimed supply
    pub remaining: u64,
}

impl LevelSlot {
    /// Create a slot
    pub fn new(level_id: PrizeLevelId, level: u32, prize_amount: i64, remaining: u64) -> Self {
        Self {
            level_id,
            level,
            prize_amount,
            remaining,
        }
    }
}

impl From<&PrizeLevel> for LevelSlot {
    fn from(level: &PrizeLevel) -> Self {
        Self::new(level.id, level.level, level.prize_amount, level.remaining)
    }
}

/// Result of one draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DrawOutcome {
    /// Landed inside a level's run
    Win {
        /// Prize level ID to decrement
        level_id: PrizeLevelId,
        /// Rank
        level: u32,
        /// Payout
        prize_amount: i64,
    },
    /// Landed past the last level
    Lose,
}

impl DrawOutcome {
    /// Drawn level rank
    pub fn level(&self) -> Option<u32> {
        match self {
            DrawOutcome::Win { level, .. } => Some(*level),
            DrawOutcome::Lose => None,
        }
    }

    /// Drawn level ID
    pub fn level_id(&self) -> Option<PrizeLevelId> {
        match self {
            DrawOutcome::Win { level_id, .. } => Some(*level_id),
            DrawOutcome::Lose => None,
        }
    }

    /// Nominal payout of the drawn level
    pub fn prize_amount(&self) -> i64 {
        match self {
            DrawOutcome::Win { prize_amount, .. } => *prize_amount,
            DrawOutcome::Lose => 0,
        }
    }

    /// Whether a level was drawn
    pub fn is_win(&self) -> bool {
        matches!(self, DrawOutcome::Win { .. })
    }
}

/// Draw one outcome uniformly over `remaining_tickets` slots
///
/// Levels are laid out in the order given, each occupying `remaining`
/// consecutive slots. Integer arithmetic only.
pub fn draw<R: Rng + ?Sized>(
    rng: &mut R,
    remaining_tickets: u64,
    levels: &[LevelSlot],
) -> CoreResult<DrawOutcome> {
    if remaining_tickets == 0 {
        return Err(CoreError::SoldOut);
    }

    let level_remaining: u64 = levels.iter().map(|l| l.remaining).sum();
    if level_remaining > remaining_tickets {
        return Err(CoreError::InventoryInconsistent {
            level_remaining,
            remaining_tickets,
        });
    }

    let slot = rng.gen_range(0..remaining_tickets);
    Ok(locate(slot, levels))
}

fn locate(slot: u64, levels: &[LevelSlot]) -> DrawOutcome {
    let mut upper = 0u64;
    for level in levels {
        upper += level.remaining;
        if slot < upper {
            return DrawOutcome::Win {
                level_id: level.level_id,
                level: level.level,
                prize_amount: level.prize_amount,
            };
        }
    }
    DrawOutcome::Lose
}
