//! Recharge orders paid through the external gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, UserId};

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for the gateway
    Pending,
    /// Paid and credited
    Paid,
    /// Abandoned
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Point top-up order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeOrder {
    /// Order ID
    pub id: OrderId,
    /// Buyer
    pub user_id: UserId,
    /// Merchant-side order number sent to the gateway
    pub out_trade_no: String,
    /// Points credited on payment
    pub points: i64,
    /// Money amount as the gateway formats it, e.g. "10.00"
    pub money: String,
    /// Status
    pub status: OrderStatus,
    /// Gateway-side trade number, set on payment
    pub trade_no: Option<String>,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Paid at
    pub paid_at: Option<DateTime<Utc>>,
}
