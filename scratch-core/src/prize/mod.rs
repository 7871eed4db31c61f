//! Prize Determination
//!
//! The outcome of a ticket is fixed at generation time. [`draw`] picks a
//! slot uniformly among the pool's unsold tickets, where each prize level
//! owns a contiguous run of `remaining` slots and everything past the last
//! level is a non-win. [`build_content`] then turns the outcome into the
//! payload sealed inside the ticket; for pattern games this adds the
//! symbol grid on top of the already decided outcome.

mod draw;
mod pattern;

pub use draw::{draw, DrawOutcome, LevelSlot};
pub use pattern::layout_pattern;

use rand::Rng;

use crate::error::{CoreError, CoreResult};
use crate::rules::GameRules;
use crate::types::{GameType, LotteryType, TicketContent};

/// Build the sealed payload for a drawn outcome
pub fn build_content<R: Rng + ?Sized>(
    rng: &mut R,
    lottery: &LotteryType,
    rules: &GameRules,
    outcome: &DrawOutcome,
) -> CoreResult<TicketContent> {
    match (lottery.game_type, rules) {
        (GameType::Pattern, GameRules::Pattern(pattern)) => Ok(TicketContent::Pattern(
            layout_pattern(rng, pattern, outcome, lottery)?,
        )),
        (GameType::Pattern, GameRules::Standard(_)) | (_, GameRules::Pattern(_)) => {
            Err(CoreError::InvalidConfig(format!(
                "rules do not match game type {}",
                lottery.game_type
            )))
        }
        (game_type, GameRules::Standard(_)) => Ok(TicketContent::Standard {
            game_type,
            prize_level: outcome.level(),
            prize_amount: outcome.prize_amount(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::StandardRules;
    use crate::types::LotteryStatus;
    use chrono::Utc;
    use rand::SeedableRng;

    fn lottery(game_type: GameType, max_prize: i64) -> LotteryType {
        LotteryType {
            id: 1,
            name: "Test".to_string(),
            price: 10,
            max_prize,
            game_type,
            rules_config: serde_json::Value::Null,
            status: LotteryStatus::Available,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_standard_content_carries_outcome() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let outcome = DrawOutcome::Win {
            level_id: 4,
            level: 2,
            prize_amount: 500,
        };
        let content = build_content(
            &mut rng,
            &lottery(GameType::NumberMatch, 0),
            &GameRules::Standard(StandardRules::default()),
            &outcome,
        )
        .unwrap();
        assert_eq!(content.prize_amount(), 500);
        assert_eq!(content.prize_level(), Some(2));
    }

    #[test]
    fn test_standard_content_pays_full_level_amount() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let outcome = DrawOutcome::Win {
            level_id: 4,
            level: 1,
            prize_amount: 5000,
        };
        let content = build_content(
            &mut rng,
            &lottery(GameType::Multiplier, 1000),
            &GameRules::Standard(StandardRules::default()),
            &outcome,
        )
        .unwrap();
        assert_eq!(content.prize_amount(), 5000);
    }

    #[test]
    fn test_mismatched_rules_rejected() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let err = build_content(
            &mut rng,
            &lottery(GameType::Pattern, 0),
            &GameRules::Standard(StandardRules::default()),
            &DrawOutcome::Lose,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }
}
