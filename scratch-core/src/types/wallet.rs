//! Wallet and Transaction types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TransactionId, UserId, WalletId};

/// Points wallet, one per user
///
/// The balance is a cache over the transaction log; it is only ever
/// changed together with a new [`Transaction`] row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet ID
    pub id: WalletId,
    /// Owning user
    pub user_id: UserId,
    /// Current balance in points
    pub balance: i64,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Updated at
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create an empty wallet
    pub fn new(id: WalletId, user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            balance: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Balance after applying `delta`, or `None` if it would go negative
    /// or overflow
    pub fn checked_apply(&self, delta: i64) -> Option<i64> {
        self.balance.checked_add(delta).filter(|b| *b >= 0)
    }
}

/// Kind of balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Registration grant
    Initial,
    /// Paid top-up through the payment gateway
    Recharge,
    /// Ticket purchase
    Purchase,
    /// Prize payout on scratch
    Win,
    /// Product redemption
    Exchange,
    /// Manual administrator correction
    Adjustment,
}

impl TransactionType {
    /// Whether this type moves points into the wallet
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionType::Initial | TransactionType::Recharge | TransactionType::Win
        )
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Initial => write!(f, "initial"),
            TransactionType::Recharge => write!(f, "recharge"),
            TransactionType::Purchase => write!(f, "purchase"),
            TransactionType::Win => write!(f, "win"),
            TransactionType::Exchange => write!(f, "exchange"),
            TransactionType::Adjustment => write!(f, "adjustment"),
        }
    }
}

/// Append-only ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID
    pub id: TransactionId,
    /// Wallet ID
    pub wallet_id: WalletId,
    /// User ID (denormalized for history queries)
    pub user_id: UserId,
    /// Transaction type
    pub tx_type: TransactionType,
    /// Signed amount
    pub amount: i64,
    /// Wallet balance right after this entry
    pub balance_after: i64,
    /// Human readable description
    pub description: String,
    /// Reference to the entity that caused this entry
    pub reference_id: Option<String>,
    /// Created at
    pub created_at: DateTime<Utc>,
}
