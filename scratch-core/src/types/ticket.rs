//! Tickets, their sealed content and the two public views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GameType, LotteryTypeId, PrizePoolId, TicketId, UserId};
use crate::error::{CoreError, CoreResult};

/// Ticket lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Bought, outcome sealed
    Unscratched,
    /// Outcome revealed and paid
    Scratched,
    /// Physically redeemed
    Claimed,
}

impl TicketStatus {
    /// Whether the outcome may be shown
    pub fn is_revealed(&self) -> bool {
        !matches!(self, TicketStatus::Unscratched)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Unscratched => write!(f, "unscratched"),
            TicketStatus::Scratched => write!(f, "scratched"),
            TicketStatus::Claimed => write!(f, "claimed"),
        }
    }
}

/// Persisted ticket row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket ID
    pub id: TicketId,
    /// Owner
    pub user_id: UserId,
    /// Lottery type
    pub lottery_type_id: LotteryTypeId,
    /// Pool the ticket was drawn from
    pub prize_pool_id: PrizePoolId,
    /// Public anti-counterfeit code
    pub security_code: String,
    /// Sealed [`TicketContent`]
    pub content_encrypted: String,
    /// Plaintext cache of the sealed prize amount
    pub prize_amount: i64,
    /// Plaintext cache of the drawn level rank
    pub prize_level: Option<u32>,
    /// Status
    pub status: TicketStatus,
    /// Purchased at
    pub purchased_at: DateTime<Utc>,
    /// Scratched at
    pub scratched_at: Option<DateTime<Utc>>,
    /// Claimed at
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Whether the ticket pays out
    pub fn is_win(&self) -> bool {
        self.prize_amount > 0
    }

    /// Transition `unscratched -> scratched`
    pub fn mark_scratched(&mut self, at: DateTime<Utc>) -> CoreResult<()> {
        if self.status != TicketStatus::Unscratched {
            return Err(CoreError::StateTransition(format!(
                "cannot scratch a {} ticket",
                self.status
            )));
        }
        self.status = TicketStatus::Scratched;
        self.scratched_at = Some(at);
        Ok(())
    }

    /// Transition `scratched -> claimed`
    pub fn mark_claimed(&mut self, at: DateTime<Utc>) -> CoreResult<()> {
        if self.status != TicketStatus::Scratched {
            return Err(CoreError::StateTransition(format!(
                "cannot claim a {} ticket",
                self.status
            )));
        }
        self.status = TicketStatus::Claimed;
        self.claimed_at = Some(at);
        Ok(())
    }
}

/// One cell of a pattern grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCell {
    /// Cell index, row-major
    pub index: usize,
    /// Symbol ID from the pattern catalog
    pub symbol: String,
    /// Points shown under the symbol
    pub points: i64,
    /// Whether scratching this cell pays
    pub winning: bool,
}

/// Pattern game payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternContent {
    /// Drawn level rank
    pub prize_level: Option<u32>,
    /// Payout
    pub prize_amount: i64,
    /// Grid cells
    pub cells: Vec<PatternCell>,
    /// Index of the paying cell
    pub winning_cell: Option<usize>,
    /// Whether the paying symbol is the special one
    pub special: bool,
}

/// Outcome sealed inside a ticket at purchase time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TicketContent {
    /// Single-outcome game types
    Standard {
        /// Game variant
        game_type: GameType,
        /// Drawn level rank
        prize_level: Option<u32>,
        /// Payout
        prize_amount: i64,
    },
    /// Grid game
    Pattern(PatternContent),
}

impl TicketContent {
    /// Payout carried by this content
    pub fn prize_amount(&self) -> i64 {
        match self {
            TicketContent::Standard { prize_amount, .. } => *prize_amount,
            TicketContent::Pattern(p) => p.prize_amount,
        }
    }

    /// Drawn level rank
    pub fn prize_level(&self) -> Option<u32> {
        match self {
            TicketContent::Standard { prize_level, .. } => *prize_level,
            TicketContent::Pattern(p) => p.prize_level,
        }
    }

    /// Whether the content pays out
    pub fn is_win(&self) -> bool {
        self.prize_amount() > 0
    }
}

/// Public view of a ticket whose outcome is still sealed
///
/// Carries no prize information at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrevealedTicket {
    /// Ticket ID
    pub ticket_id: TicketId,
    /// Security code
    pub security_code: String,
    /// Lottery type
    pub lottery_type_id: LotteryTypeId,
    /// Status
    pub status: TicketStatus,
    /// Purchased at
    pub purchased_at: DateTime<Utc>,
}

/// Public view of a scratched or claimed ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedTicket {
    /// Ticket ID
    pub ticket_id: TicketId,
    /// Security code
    pub security_code: String,
    /// Lottery type
    pub lottery_type_id: LotteryTypeId,
    /// Status
    pub status: TicketStatus,
    /// Purchased at
    pub purchased_at: DateTime<Utc>,
    /// Payout
    pub prize_amount: i64,
    /// Whether it paid out
    pub is_win: bool,
    /// Scratched at
    pub scratched_at: Option<DateTime<Utc>>,
    /// Claimed at
    pub claimed_at: Option<DateTime<Utc>>,
}

/// Ticket as exposed to callers, selected by status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TicketView {
    /// Outcome hidden
    Unrevealed(UnrevealedTicket),
    /// Outcome shown
    Revealed(RevealedTicket),
}

impl TicketView {
    /// Pick the view allowed for the ticket's current status
    pub fn of(ticket: &Ticket) -> Self {
        if ticket.status.is_revealed() {
            TicketView::Revealed(RevealedTicket {
                ticket_id: ticket.id,
                security_code: ticket.security_code.clone(),
                lottery_type_id: ticket.lottery_type_id,
                status: ticket.status,
                purchased_at: ticket.purchased_at,
                prize_amount: ticket.prize_amount,
                is_win: ticket.is_win(),
                scratched_at: ticket.scratched_at,
                claimed_at: ticket.claimed_at,
            })
        } else {
            TicketView::Unrevealed(UnrevealedTicket {
                ticket_id: ticket.id,
                security_code: ticket.security_code.clone(),
                lottery_type_id: ticket.lottery_type_id,
                status: ticket.status,
                purchased_at: ticket.purchased_at,
            })
        }
    }

    /// Ticket ID
    pub fn ticket_id(&self) -> TicketId {
        match self {
            TicketView::Unrevealed(t) => t.ticket_id,
            TicketView::Revealed(t) => t.ticket_id,
        }
    }

    /// Status
    pub fn status(&self) -> TicketStatus {
        match self {
            TicketView::Unrevealed(t) => t.status,
            TicketView::Revealed(t) => t.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(status: TicketStatus, prize: i64) -> Ticket {
        Ticket {
            id: 9,
            user_id: 1,
            lottery_type_id: 2,
            prize_pool_id: 3,
            security_code: "ABCDEFGHJKLMNPQR".to_string(),
            content_encrypted: "opaque".to_string(),
            prize_amount: prize,
            prize_level: (prize > 0).then_some(1),
            status,
            purchased_at: Utc::now(),
            scratched_at: None,
            claimed_at: None,
        }
    }

    #[test]
    fn test_unscratched_view_hides_prize() {
        let view = TicketView::of(&ticket(TicketStatus::Unscratched, 1000));
        assert!(matches!(view, TicketView::Unrevealed(_)));
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("prize_amount").is_none());
        assert!(json.get("scratched_at").is_none());
        assert_eq!(json["state"], "unrevealed");
    }

    #[test]
    fn test_scratched_view_reveals_prize() {
        let mut t = ticket(TicketStatus::Unscratched, 1000);
        t.mark_scratched(Utc::now()).unwrap();
        match TicketView::of(&t) {
            TicketView::Revealed(r) => {
                assert_eq!(r.prize_amount, 1000);
                assert!(r.is_win);
                assert!(r.scratched_at.is_some());
            }
            other => panic!("expected revealed view, got {:?}", other),
        }
    }

    #[test]
    fn test_transitions() {
        let mut t = ticket(TicketStatus::Unscratched, 0);
        assert!(t.mark_claimed(Utc::now()).is_err());
        t.mark_scratched(Utc::now()).unwrap();
        assert!(t.mark_scratched(Utc::now()).is_err());
        t.mark_claimed(Utc::now()).unwrap();
        assert_eq!(t.status, TicketStatus::Claimed);
    }

    #[test]
    fn test_content_tagging() {
        let content = TicketContent::Standard {
            game_type: GameType::NumberMatch,
            prize_level: None,
            prize_amount: 0,
        };
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["kind"], "standard");
        assert!(!content.is_win());
    }
}
