//! Point exchange: products, card keys and exchange records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CardKeyId, ExchangeRecordId, ProductId, UserId};

/// Product status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Redeemable
    Available,
    /// No stock left
    SoldOut,
    /// Withdrawn
    Disabled,
}

/// Redeemable product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Price in points
    pub price: i64,
    /// Stock counter
    pub stock: u64,
    /// Status
    pub status: ProductStatus,
    /// Created at
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a product without stock
    pub fn new(id: ProductId, name: impl Into<String>, price: i64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock: 0,
            status: ProductStatus::SoldOut,
            created_at: Utc::now(),
        }
    }

    /// Add stock, reopening a sold-out product
    pub fn restock(&mut self, count: u64) {
        self.stock += count;
        if self.stock > 0 && self.status == ProductStatus::SoldOut {
            self.status = ProductStatus::Available;
        }
    }

    /// Take one unit; flips to sold out at zero
    pub fn take_one(&mut self) {
        self.stock = self.stock.saturating_sub(1);
        if self.stock == 0 {
            self.status = ProductStatus::SoldOut;
        }
    }
}

/// Card key status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKeyStatus {
    /// Not handed out yet
    Available,
    /// Given to a user
    Redeemed,
}

/// Redeemable secret belonging to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardKey {
    /// Card key ID
    pub id: CardKeyId,
    /// Product ID
    pub product_id: ProductId,
    /// Secret handed to the redeemer
    pub secret: String,
    /// Status
    pub status: CardKeyStatus,
    /// Redeemer
    pub redeemed_by: Option<UserId>,
    /// Redeemed at
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Created at
    pub created_at: DateTime<Utc>,
}

impl CardKey {
    /// Create an available key
    pub fn new(id: CardKeyId, product_id: ProductId, secret: impl Into<String>) -> Self {
        Self {
            id,
            product_id,
            secret: secret.into(),
            status: CardKeyStatus::Available,
            redeemed_by: None,
            redeemed_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Record of one redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Record ID
    pub id: ExchangeRecordId,
    /// Redeemer
    pub user_id: UserId,
    /// Product
    pub product_id: ProductId,
    /// Key handed out
    pub card_key_id: CardKeyId,
    /// Points spent
    pub cost: i64,
    /// Created at
    pub created_at: DateTime<Utc>,
}
