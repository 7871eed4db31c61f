//! Lottery Rules Configuration
//!
//! `rules_config` is stored as raw JSON on the lottery type and parsed into
//! one strongly typed structure per game variant. Parsing is strict: a
//! malformed config is an error, never a silent fallback.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::GameType;

/// Upper bound on grid size
pub const MAX_AREA_COUNT: u32 = 64;

/// Default chance (percent) that a winning pattern ticket shows the special symbol
pub const DEFAULT_SPECIAL_CHANCE_PERCENT: u8 = 20;

fn default_special_chance() -> u8 {
    DEFAULT_SPECIAL_CHANCE_PERCENT
}

/// Parsed rules, keyed by game type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameRules {
    /// number_match / symbol_match / amount_sum / multiplier
    Standard(StandardRules),
    /// pattern grid
    Pattern(PatternRules),
}

impl GameRules {
    /// Parse and validate `rules_config` for `game_type`
    pub fn parse(game_type: GameType, config: &serde_json::Value) -> CoreResult<Self> {
        match game_type {
            GameType::Pattern => {
                let rules: PatternRules = serde_json::from_value(config.clone())
                    .map_err(|e| CoreError::InvalidConfig(format!("pattern rules: {}", e)))?;
                rules.validate()?;
                Ok(GameRules::Pattern(rules))
            }
            _ => {
                let rules: StandardRules = if config.is_null() {
                    StandardRules::default()
                } else {
                    serde_json::from_value(config.clone()).map_err(|e| {
                        CoreError::InvalidConfig(format!("{} rules: {}", game_type, e))
                    })?
                };
                Ok(GameRules::Standard(rules))
            }
        }
    }
}

/// Presentation hints for the single-outcome game types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StandardRules {
    /// Number of scratch areas shown
    #[serde(default)]
    pub area_count: Option<u32>,
    /// Symbol set for symbol_match
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Multipliers shown for the multiplier game
    #[serde(default)]
    pub multipliers: Vec<u32>,
}

/// Symbol from the pattern catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSymbol {
    /// Symbol ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Fixed payout when this symbol wins
    #[serde(default)]
    pub points: i64,
    /// Pays the sum of all cells instead of `points`
    #[serde(default)]
    pub special: bool,
}

/// Pattern game rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternRules {
    /// Grid cells per ticket
    pub area_count: u32,
    /// Point values a cell may show
    pub points_palette: Vec<i64>,
    /// Symbol catalog
    pub patterns: Vec<PatternSymbol>,
    /// Percent of winning tickets that get the special symbol
    #[serde(default = "default_special_chance")]
    pub special_chance_percent: u8,
}

impl PatternRules {
    /// Check structural constraints
    pub fn validate(&self) -> CoreResult<()> {
        if self.area_count == 0 || self.area_count > MAX_AREA_COUNT {
            return Err(CoreError::InvalidConfig(format!(
                "area_count must be within 1..={}, got {}",
                MAX_AREA_COUNT, self.area_count
            )));
        }
        if self.points_palette.is_empty() {
            return Err(CoreError::InvalidConfig("points_palette is empty".to_string()));
        }
        if self.points_palette.iter().any(|p| *p < 0) {
            return Err(CoreError::InvalidConfig(
                "points_palette contains a negative value".to_string(),
            ));
        }
        let max_cell = i64::MAX / i64::from(self.area_count);
        if let Some(p) = self.points_palette.iter().find(|p| **p > max_cell) {
            return Err(CoreError::InvalidConfig(format!(
                "points_palette value {} exceeds {} for a {}-cell grid",
                p, max_cell, self.area_count
            )));
        }
        if self.special_symbol().is_some() && self.points_palette.iter().any(|p| *p == 0) {
            return Err(CoreError::InvalidConfig(
                "special symbol needs a strictly positive points_palette".to_string(),
            ));
        }
        if self.regular_winning_symbols().next().is_none() {
            return Err(CoreError::InvalidConfig(
                "patterns need at least one regular symbol with positive points".to_string(),
            ));
        }
        if self.special_chance_percent > 100 {
            return Err(CoreError::InvalidConfig(format!(
                "special_chance_percent must be <= 100, got {}",
                self.special_chance_percent
            )));
        }
        Ok(())
    }

    /// Regular symbols that can pay
    pub fn regular_winning_symbols(&self) -> impl Iterator<Item = &PatternSymbol> {
        self.patterns.iter().filter(|s| !s.special && s.points > 0)
    }

    /// Symbols that may fill non-paying cells
    pub fn decorative_symbols(&self) -> impl Iterator<Item = &PatternSymbol> {
        self.patterns.iter().filter(|s| !s.special)
    }

    /// The special symbol, if configured
    pub fn special_symbol(&self) -> Option<&PatternSymbol> {
        self.patterns.iter().find(|s| s.special)
    }
}
