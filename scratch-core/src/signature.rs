//! Payment Gateway Signatures
//!
//! Callback signature scheme: take the non-empty fields except `sign` and
//! `sign_type`, sort by key, join as `key=value` with `&`, append the raw
//! merchant secret, SHA-256, lowercase hex.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Trade status that triggers a credit
pub const TRADE_SUCCESS: &str = "TRADE_SUCCESS";

/// Keys never included in the signed string
const UNSIGNED_KEYS: [&str; 2] = ["sign", "sign_type"];

/// Fields declared by an inbound payment notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackFields {
    /// Merchant ID
    pub pid: String,
    /// Gateway trade number
    pub trade_no: String,
    /// Our order number
    pub out_trade_no: String,
    /// Payment channel
    #[serde(rename = "type")]
    pub payment_type: String,
    /// Product name
    pub name: String,
    /// Money amount
    pub money: String,
    /// Trade status
    pub trade_status: String,
}

impl CallbackFields {
    /// Fields as a signing parameter map
    pub fn to_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("pid".to_string(), self.pid.clone());
        params.insert("trade_no".to_string(), self.trade_no.clone());
        params.insert("out_trade_no".to_string(), self.out_trade_no.clone());
        params.insert("type".to_string(), self.payment_type.clone());
        params.insert("name".to_string(), self.name.clone());
        params.insert("money".to_string(), self.money.clone());
        params.insert("trade_status".to_string(), self.trade_status.clone());
        params
    }

    /// Whether the gateway reports a completed payment
    pub fn is_success(&self) -> bool {
        self.trade_status == TRADE_SUCCESS
    }
}

/// Canonical string that gets hashed, without the secret
pub fn canonical_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, v)| !v.is_empty() && !UNSIGNED_KEYS.contains(&k.as_str()))
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Sign `params` with `secret`
pub fn sign(params: &BTreeMap<String, String>, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_string(params).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a declared signature
///
/// The comparison does not short-circuit on the first differing byte.
pub fn verify(params: &BTreeMap<String, String>, secret: &str, signature: &str) -> bool {
    let expected = sign(params, secret);
    let declared = signature.trim().to_ascii_lowercase();
    constant_time_eq(expected.as_bytes(), declared.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
