//! Point exchange: products backed by pre-loaded card keys
//!
//! A redemption hands out exactly one card key, writes one exchange record,
//! posts one `exchange` debit and removes one unit of stock, all in the same
//! unit. Keys are handed out oldest first.

use chrono::Utc;
use scratch_core::{
    CardKey, CardKeyStatus, ExchangeRecord, Product, ProductId, ProductStatus, TransactionType,
};
use scratch_store::{LotteryStore, Sequence};
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::error::{EngineError, EngineResult};
use crate::ledger;

use super::ScratchEngine;

/// Outcome of a redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemReceipt {
    /// Exchange record
    pub record: ExchangeRecord,
    /// Secret of the handed-out card key
    pub card_secret: String,
    /// Balance after the debit
    pub balance: i64,
}

pub async fn create_product<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    name: &str,
    price: i64,
) -> EngineResult<Product> {
    caller.require_admin("create_product")?;
    if name.trim().is_empty() {
        return Err(EngineError::InvalidConfig("name must not be empty".to_string()));
    }
    if price <= 0 {
        return Err(EngineError::InvalidAmount(price));
    }

    let product = engine.store().transaction(|tx| {
        let product = Product::new(tx.next_id(Sequence::Product)?, name.trim(), price);
        tx.put_product(&product)?;
        Ok::<_, EngineError>(product)
    })?;

    tracing::info!(product_id = product.id, price, "product created");
    Ok(product)
}

/// Load keys; stock grows by the number of keys
pub async fn add_card_keys<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    product_id: ProductId,
    secrets: &[String],
) -> EngineResult<Product> {
    caller.require_admin("add_card_keys")?;
    if secrets.is_empty() || secrets.iter().any(|s| s.trim().is_empty()) {
        return Err(EngineError::InvalidConfig(
            "card keys must be non-empty".to_string(),
        ));
    }

    let product = engine.store().transaction(|tx| {
        let mut product = tx
            .product(product_id)?
            .ok_or_else(|| EngineError::not_found("product", product_id))?;
        for secret in secrets {
            let key = CardKey::new(tx.next_id(Sequence::CardKey)?, product_id, secret.trim());
            tx.put_card_key(&key)?;
        }
        product.restock(secrets.len() as u64);
        tx.put_product(&product)?;
        Ok::<_, EngineError>(product)
    })?;

    tracing::info!(product_id, added = secrets.len(), stock = product.stock, "card keys loaded");
    Ok(product)
}

/// Change a product's status; `SoldOut` is derived from stock and cannot be set
pub async fn set_product_status<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    product_id: ProductId,
    status: ProductStatus,
) -> EngineResult<Product> {
    caller.require_admin("set_product_status")?;

    let product = engine.store().transaction(|tx| {
        let mut product = tx
            .product(product_id)?
            .ok_or_else(|| EngineError::not_found("product", product_id))?;
        product.status = match status {
            ProductStatus::Disabled => ProductStatus::Disabled,
            ProductStatus::Available | ProductStatus::SoldOut if product.stock > 0 => {
                ProductStatus::Available
            }
            ProductStatus::Available | ProductStatus::SoldOut => ProductStatus::SoldOut,
        };
        tx.put_product(&product)?;
        Ok::<_, EngineError>(product)
    })?;

    tracing::info!(product_id, status = ?product.status, "product status changed");
    Ok(product)
}

pub async fn products<S: LotteryStore>(engine: &ScratchEngine<S>) -> EngineResult<Vec<Product>> {
    engine
        .store()
        .transaction(|tx| tx.products().map_err(EngineError::from))
}

pub async fn redeem<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
    product_id: ProductId,
) -> EngineResult<RedeemReceipt> {
    let user_id = caller.user_id;

    let receipt = engine.store().transaction(|tx| {
        let mut product = tx
            .product(product_id)?
            .ok_or_else(|| EngineError::not_found("product", product_id))?;
        match product.status {
            ProductStatus::Disabled => return Err(EngineError::ProductDisabled(product_id)),
            ProductStatus::SoldOut => return Err(EngineError::SoldOut),
            ProductStatus::Available if product.stock == 0 => return Err(EngineError::SoldOut),
            ProductStatus::Available => {}
        }

        let wallet = tx
            .wallet_by_user(user_id)?
            .ok_or_else(|| EngineError::not_found("wallet", user_id))?;
        if wallet.balance < product.price {
            return Err(EngineError::InsufficientPoints {
                required: product.price,
                available: wallet.balance,
            });
        }

        // Stock and keys can drift apart; the key decides
        let mut key = tx
            .next_available_card_key(product_id)?
            .ok_or(EngineError::NoAvailableKey(product_id))?;
        let now = Utc::now();
        key.status = CardKeyStatus::Redeemed;
        key.redeemed_by = Some(user_id);
        key.redeemed_at = Some(now);
        tx.put_card_key(&key)?;

        let record = ExchangeRecord {
            id: tx.next_id(Sequence::ExchangeRecord)?,
            user_id,
            product_id,
            card_key_id: key.id,
            cost: product.price,
            created_at: now,
        };
        tx.insert_exchange_record(&record)?;

        let posting = ledger::debit(
            tx,
            user_id,
            product.price,
            TransactionType::Exchange,
            &format!("Redeem {}", product.name),
            Some(&format!("exchange:{}", record.id)),
        )
        .map_err(|e| match e {
            EngineError::InsufficientBalance {
                required,
                available,
            } => EngineError::InsufficientPoints {
                required,
                available,
            },
            other => other,
        })?;

        product.take_one();
        tx.put_product(&product)?;

        Ok(RedeemReceipt {
            record,
            card_secret: key.secret,
            balance: posting.wallet.balance,
        })
    })?;

    tracing::info!(
        user_id,
        product_id,
        record_id = receipt.record.id,
        "product redeemed"
    );
    Ok(receipt)
}

/// The caller's redemptions, newest first
pub async fn exchange_records<S: LotteryStore>(
    engine: &ScratchEngine<S>,
    caller: &Caller,
) -> EngineResult<Vec<ExchangeRecord>> {
    engine.store().transaction(|tx| {
        let mut records = tx.exchange_records_for_user(caller.user_id)?;
        records.reverse();
        Ok(records)
    })
}
