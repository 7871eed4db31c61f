//! Recharge orders and gateway callbacks
//!
//! Outbound request parameters are signed after the order row commits.
//! An inbound callback is authenticated first; only a `TRADE_SUCCESS`
//! notification for a `pending` order credits points, and the credit and
//! the `paid` transition commit together, so a replayed callback is a no-op
//! that fails `AlreadyPaid`.

use std::collections::BTreeMap;

use chrono::Utc;
use scratch_core::signature::{self, CallbackFields};
use scratch_core::{OrderStatus, RechargeOrder, TransactionType};
use scratch_store::{LotteryStore, Sequence};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::{EngineError, EngineResult};
use crate::ledger;

use super::ScratchEngine;

/// Digest name sent alongside the signature
pub const SIGN_TYPE: &str = "SHA256";

/// A persisted order plus the signed gateway parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeRequest {
    /// Pending order
    pub order: RechargeOrder,
    /// Parameters to forward to the gateway, including `sign`
    pub params: BTreeMap<String, String>,
}

/// How a callback was settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// Points credited and order marked paid
    Credited {
        /// Updated order
        order: RechargeOrder,
        /// Balance after the credit
        balance: i64,
    },
    /// Authentic notification that does not report success
    Acknowledged {
        /// Merchant order number
        out_trade_no: String,
        /// Reported trade status
        trade_status: String,
    },
}

/// Parse a gateway money string into cents
///
/// Accepts `10`, `10.5` and `10.50`; rejects signs, exponents and more than
/// two decimals.
pub fn parse_money(money: &str) -> Option<i64> {
    let (whole, frac) = match money.split_once('.') {
        Some((w, f)) => (w, f),
        None => (money, ""),
    };
    if whole.is_empty()
        || frac.len() > 2
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
        || (money.contains('.') && frac.is_empty())
    {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    whole.checked_mul(100)?.checked_add(frac)
}

pub async fn create_recharge_order<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    points: i64,
    money: &str,
) -> EngineResult<RechargeRequest> {
    if points <= 0 {
        return Err(EngineError::InvalidAmount(points));
    }
    let money = money.trim();
    match parse_money(money) {
        Some(cents) if cents > 0 => {}
        _ => {
            return Err(EngineError::InvalidConfig(format!(
                "invalid money amount '{}'",
                money
            )))
        }
    }

    let out_trade_no = format!(
        "R{}{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        &uuid::Uuid::new_v4().simple().to_string()[..12]
    );

    let order = engine.store().transaction(|tx| {
        tx.wallet_by_user(caller.user_id)?
            .ok_or_else(|| EngineError::not_found("wallet", caller.user_id))?;
        let order = RechargeOrder {
            id: tx.next_id(Sequence::Order)?,
            user_id: caller.user_id,
            out_trade_no: out_trade_no.clone(),
            points,
            money: money.to_string(),
            status: OrderStatus::Pending,
            trade_no: None,
            created_at: Utc::now(),
            paid_at: None,
        };
        tx.put_order(&order)?;
        Ok::<_, EngineError>(order)
    })?;

    let config = engine.config();
    let mut params = BTreeMap::new();
    params.insert("pid".to_string(), config.payment_merchant_id.clone());
    params.insert("out_trade_no".to_string(), order.out_trade_no.clone());
    params.insert("name".to_string(), format!("{} points", order.points));
    params.insert("money".to_string(), order.money.clone());
    let sign = signature::sign(&params, &config.payment_secret);
    params.insert("sign".to_string(), sign);
    params.insert("sign_type".to_string(), SIGN_TYPE.to_string());

    tracing::info!(
        user_id = caller.user_id,
        out_trade_no = %order.out_trade_no,
        points,
        "recharge order created"
    );
    Ok(RechargeRequest { order, params })
}

pub async fn process_payment_callback<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    fields: &CallbackFields,
    sign: &str,
) -> EngineResult<CallbackOutcome> {
    let config = engine.config();

    if !signature::verify(&fields.to_params(), &config.payment_secret, sign) {
        tracing::warn!(out_trade_no = %fields.out_trade_no, "payment callback signature rejected");
        return Err(EngineError::InvalidSignature);
    }
    if !config.payment_merchant_id.is_empty() && fields.pid != config.payment_merchant_id {
        tracing::warn!(pid = %fields.pid, "payment callback for another merchant");
        return Err(EngineError::InvalidSignature);
    }

    let outcome = engine.store().transaction(|tx| {
        let mut order = tx
            .order_by_out_trade_no(&fields.out_trade_no)?
            .ok_or_else(|| EngineError::OrderNotFound(fields.out_trade_no.clone()))?;

        if !fields.is_success() {
            return Ok(CallbackOutcome::Acknowledged {
                out_trade_no: order.out_trade_no,
                trade_status: fields.trade_status.clone(),
            });
        }
        if order.status != OrderStatus::Pending {
            return Err(EngineError::AlreadyPaid(order.out_trade_no));
        }
        if parse_money(&fields.money).is_none() || parse_money(&fields.money) != parse_money(&order.money) {
            return Err(EngineError::AmountMismatch {
                expected: order.money.clone(),
                declared: fields.money.clone(),
            });
        }

        let posting = ledger::credit(
            tx,
            order.user_id,
            order.points,
            TransactionType::Recharge,
            &format!("Recharge {}", order.money),
            Some(&format!("order:{}", order.out_trade_no)),
        )?;

        order.status = OrderStatus::Paid;
        order.trade_no = Some(fields.trade_no.clone());
        order.paid_at = Some(Utc::now());
        tx.put_order(&order)?;

        Ok(CallbackOutcome::Credited {
            order,
            balance: posting.wallet.balance,
        })
    });

    match &outcome {
        Ok(CallbackOutcome::Credited { order, .. }) => tracing::info!(
            out_trade_no = %order.out_trade_no,
            user_id = order.user_id,
            points = order.points,
            "recharge credited"
        ),
        Ok(CallbackOutcome::Acknowledged { trade_status, .. }) => tracing::info!(
            out_trade_no = %fields.out_trade_no,
            trade_status = %trade_status,
            "non-success payment notification acknowledged"
        ),
        Err(e) => tracing::warn!(out_trade_no = %fields.out_trade_no, error = %e, "payment callback refused"),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("10"), Some(1000));
        assert_eq!(parse_money("10.5"), Some(1050));
        assert_eq!(parse_money("10.50"), Some(1050));
        assert_eq!(parse_money("0.01"), Some(1));
        assert_eq!(parse_money("10."), None);
        assert_eq!(parse_money(".5"), None);
        assert_eq!(parse_money("-1"), None);
        assert_eq!(parse_money("1.005"), None);
        assert_eq!(parse_money("1e3"), None);
        assert_eq!(parse_money(""), None);
    }
}
