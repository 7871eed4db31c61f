//! Lottery operations
//!
//! Every operation that mutates state runs inside exactly one store unit:
//!
//! ```text
//! purchase: pool check → debit → draw → seal → insert ticket → decrement inventory
//! scratch:  ownership/status check → decrypt → credit win → mark scratched
//! redeem:   stock check → balance check → take card key → record → debit → destock
//! callback: verify signature → require pending → credit recharge → mark paid
//! ```
//!
//! A failure at any step leaves no trace. Work that must not run inside a
//! unit (signing outbound gateway parameters) happens after the commit.

pub mod catalog;
pub mod exchange;
pub mod payment;
pub mod purchase;
pub mod scratch;
pub mod verify;
pub mod wallet;

use std::sync::Arc;

use scratch_core::signature::CallbackFields;
use scratch_core::{
    ExchangeRecord, LotteryStatus, LotteryType, LotteryTypeId, PrizeLevel, PrizePool,
    PrizePoolId, Product, ProductId, ProductStatus, TicketCipher, TicketContent, TicketId, TicketView,
    Transaction, UserId, Wallet,
};
use scratch_store::LotteryStore;

use crate::auth::Caller;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::ledger::{Posting, ReconcileReport};

pub use catalog::{LevelStats, NewLotteryType, PoolStats};
pub use exchange::RedeemReceipt;
pub use payment::{CallbackOutcome, RechargeRequest};
pub use purchase::PurchaseReceipt;
pub use scratch::ScratchResult;

/// Lottery engine
///
/// Owns the store handle, the ticket cipher and the configuration. Cheap to
/// clone; clones share the same store.
pub struct ScratchEngine<S: LotteryStore> {
    store: Arc<S>,
    cipher: TicketCipher,
    config: Arc<EngineConfig>,
}

impl<S: LotteryStore> Clone for ScratchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cipher: self.cipher.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: LotteryStore> ScratchEngine<S> {
    /// Create an engine after validating `config`
    pub fn new(store: Arc<S>, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let cipher = TicketCipher::new(&config.encryption_key()?);

        tracing::info!(
            backend = store.backend(),
            max_purchase_quantity = config.max_purchase_quantity,
            "scratch engine ready"
        );

        Ok(Self {
            store,
            cipher,
            config: Arc::new(config),
        })
    }

    /// Store handle
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn cipher(&self) -> &TicketCipher {
        &self.cipher
    }

    // ---- wallet ----

    /// Create a wallet for `user_id` with the initial grant
    pub async fn register_user(&self, user_id: UserId) -> EngineResult<Wallet> {
        wallet::register_user(self, user_id).await
    }

    /// Current balance
    pub async fn balance(&self, caller: &Caller) -> EngineResult<i64> {
        wallet::balance(self, caller.user_id).await
    }

    /// Ledger rows, newest first
    pub async fn transactions(&self, caller: &Caller, limit: usize) -> EngineResult<Vec<Transaction>> {
        wallet::transactions(self, caller.user_id, limit).await
    }

    /// Manual signed balance correction (admin)
    pub async fn admin_adjust(
        &self,
        caller: &Caller,
        user_id: UserId,
        amount: i64,
        reason: &str,
    ) -> EngineResult<Posting> {
        wallet::admin_adjust(self, caller, user_id, amount, reason).await
    }

    /// Compare one wallet against its ledger
    pub async fn reconcile(&self, user_id: UserId) -> EngineResult<ReconcileReport> {
        wallet::reconcile(self, user_id).await
    }

    /// Compare every wallet against its ledger
    pub async fn reconcile_all(&self) -> EngineResult<Vec<ReconcileReport>> {
        wallet::reconcile_all(self).await
    }

    // ---- catalog ----

    /// Register a lottery type (admin)
    pub async fn create_lottery_type(
        &self,
        caller: &Caller,
        new: NewLotteryType,
    ) -> EngineResult<LotteryType> {
        catalog::create_lottery_type(self, caller, new).await
    }

    /// Add a prize level to a lottery type (admin)
    pub async fn add_prize_level(
        &self,
        caller: &Caller,
        lottery_type_id: LotteryTypeId,
        level: u32,
        prize_amount: i64,
        quantity: u64,
    ) -> EngineResult<PrizeLevel> {
        catalog::add_prize_level(self, caller, lottery_type_id, level, prize_amount, quantity)
            .await
    }

    /// Open a new ticket batch (admin)
    pub async fn open_pool(
        &self,
        caller: &Caller,
        lottery_type_id: LotteryTypeId,
        total_tickets: u64,
    ) -> EngineResult<PrizePool> {
        catalog::open_pool(self, caller, lottery_type_id, total_tickets).await
    }

    /// Change a lottery type's sale status (admin)
    pub async fn set_lottery_status(
        &self,
        caller: &Caller,
        lottery_type_id: LotteryTypeId,
        status: LotteryStatus,
    ) -> EngineResult<LotteryType> {
        catalog::set_lottery_status(self, caller, lottery_type_id, status).await
    }

    /// All lottery types
    pub async fn lottery_types(&self) -> EngineResult<Vec<LotteryType>> {
        catalog::lottery_types(self).await
    }

    /// Inventory and payout figures for a pool
    pub async fn pool_stats(&self, pool_id: PrizePoolId) -> EngineResult<PoolStats> {
        catalog::pool_stats(self, pool_id).await
    }

    // ---- tickets ----

    /// Buy `quantity` tickets
    pub async fn purchase(
        &self,
        caller: &Caller,
        lottery_type_id: LotteryTypeId,
        quantity: u32,
    ) -> EngineResult<PurchaseReceipt> {
        purchase::execute(self, caller, lottery_type_id, quantity).await
    }

    /// Reveal and settle a ticket
    pub async fn scratch(&self, caller: &Caller, ticket_id: TicketId) -> EngineResult<ScratchResult> {
        scratch::execute(self, caller, ticket_id).await
    }

    /// Re-read a revealed ticket's content
    pub async fn reveal(&self, caller: &Caller, ticket_id: TicketId) -> EngineResult<TicketContent> {
        scratch::reveal(self, caller, ticket_id).await
    }

    /// Mark a winning scratched ticket as claimed
    pub async fn claim(&self, caller: &Caller, ticket_id: TicketId) -> EngineResult<TicketView> {
        scratch::claim(self, caller, ticket_id).await
    }

    /// Public lookup by security code
    pub async fn verify_by_code(&self, code: &str) -> EngineResult<TicketView> {
        verify::verify_by_code(self, code).await
    }

    /// The caller's tickets
    pub async fn tickets_for_user(&self, caller: &Caller) -> EngineResult<Vec<TicketView>> {
        verify::tickets_for_user(self, caller).await
    }

    // ---- exchange ----

    /// Register a product (admin)
    pub async fn create_product(&self, caller: &Caller, name: &str, price: i64) -> EngineResult<Product> {
        exchange::create_product(self, caller, name, price).await
    }

    /// Load card keys for a product (admin)
    pub async fn add_card_keys(
        &self,
        caller: &Caller,
        product_id: ProductId,
        secrets: &[String],
    ) -> EngineResult<Product> {
        exchange::add_card_keys(self, caller, product_id, secrets).await
    }

    /// Enable or disable a product (admin)
    pub async fn set_product_status(
        &self,
        caller: &Caller,
        product_id: ProductId,
        status: ProductStatus,
    ) -> EngineResult<Product> {
        exchange::set_product_status(self, caller, product_id, status).await
    }

    /// All products
    pub async fn products(&self) -> EngineResult<Vec<Product>> {
        exchange::products(self).await
    }

    /// Spend points on a product
    pub async fn redeem(&self, caller: &Caller, product_id: ProductId) -> EngineResult<RedeemReceipt> {
        exchange::redeem(self, caller, product_id).await
    }

    /// The caller's redemptions
    pub async fn exchange_records(&self, caller: &Caller) -> EngineResult<Vec<ExchangeRecord>> {
        exchange::exchange_records(self, caller).await
    }

    // ---- payment ----

    /// Open a recharge order and sign the gateway request
    pub async fn create_recharge_order(
        &self,
        caller: &Caller,
        points: i64,
        money: &str,
    ) -> EngineResult<RechargeRequest> {
        payment::create_recharge_order(self, caller, points, money).await
    }

    /// Settle a gateway notification
    pub async fn process_payment_callback(
        &self,
        fields: &CallbackFields,
        signature: &str,
    ) -> EngineResult<CallbackOutcome> {
        payment::process_payment_callback(self, fields, signature).await
    }
}
