//! Pattern grid layout
//!
//! Cells get a random point value and a random decorative symbol. Only a
//! winning outcome places a paying symbol, in exactly one cell: the special
//! symbol (pays the sum of all cell points) with `special_chance_percent`
//! probability when configured, otherwise a regular symbol paying its own
//! points.

use rand::seq::SliceRandom;
use rand::Rng;

use super::DrawOutcome;
use crate::error::{CoreError, CoreResult};
use crate::rules::{PatternRules, PatternSymbol};
use crate::types::{LotteryType, PatternCell, PatternContent};

/// Lay out the grid for an already decided outcome
///
/// The payout is capped by `lottery`'s `max_prize`.
pub fn layout_pattern<R: Rng + ?Sized>(
    rng: &mut R,
    rules: &PatternRules,
    outcome: &DrawOutcome,
    lottery: &LotteryType,
) -> CoreResult<PatternContent> {
    if rules.area_count == 0 {
        return Err(CoreError::InvalidConfig("pattern grid has no cells".to_string()));
    }

    let decorative: Vec<&PatternSymbol> = rules.decorative_symbols().collect();
    let mut cells: Vec<PatternCell> = (0..rules.area_count as usize)
        .map(|index| PatternCell {
            index,
            symbol: decorative
                .choose(rng)
                .map(|s| s.id.clone())
                .unwrap_or_default(),
            points: rules.points_palette.choose(rng).copied().unwrap_or(0),
            winning: false,
        })
        .collect();

    if !outcome.is_win() {
        return Ok(PatternContent {
            prize_level: None,
            prize_amount: 0,
            cells,
            winning_cell: None,
            special: false,
        });
    }

    let winning_cell = rng.gen_range(0..cells.len());
    let special_symbol = rules
        .special_symbol()
        .filter(|_| rng.gen_range(0..100u8) < rules.special_chance_percent);

    let (symbol, raw_amount, special) = match special_symbol {
        Some(symbol) => {
            let grid_total = cells
                .iter()
                .try_fold(0i64, |acc, c| acc.checked_add(c.points))
                .ok_or_else(|| {
                    CoreError::InvalidConfig("pattern grid total overflows".to_string())
                })?;
            (symbol, grid_total, true)
        }
        None => {
            let regular: Vec<&PatternSymbol> = rules.regular_winning_symbols().collect();
            let symbol = regular.choose(rng).copied().ok_or_else(|| {
                CoreError::InvalidConfig("no regular symbol with positive points".to_string())
            })?;
            (symbol, symbol.points, false)
        }
    };

    let cell = &mut cells[winning_cell];
    cell.symbol = symbol.id.clone();
    cell.winning = true;

    Ok(PatternContent {
        prize_level: outcome.level(),
        prize_amount: lottery.cap_prize(raw_amount),
        cells,
        winning_cell: Some(winning_cell),
        special,
    })
}
