//! Typed table access over a backend transaction
//!
//! Rows are JSON documents under `<table>/<zero padded id>`. Secondary
//! indexes are JSON id lists under `idx/...` and are maintained by the
//! same unit that writes the row, so they can never drift from it.

use serde::de::DeserializeOwned;
use serde::Serialize;

use scratch_core::types::{
    CardKey, CardKeyId, CardKeyStatus, ExchangeRecord, LotteryType, LotteryTypeId, OrderId,
    PoolStatus, PrizeLevel, PrizeLevelId, PrizePool, PrizePoolId, Product, ProductId,
    RechargeOrder, Ticket, TicketId, Transaction, UserId, Wallet, WalletId,
};

use crate::error::{StoreError, StoreResult};
use crate::kv::KvTx;

/// Monotonic ID sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Wallet,
    Transaction,
    LotteryType,
    PrizeLevel,
    PrizePool,
    Ticket,
    Product,
    CardKey,
    ExchangeRecord,
    Order,
}

impl Sequence {
    fn key(&self) -> &'static str {
        match self {
            Sequence::Wallet => "seq/wallet",
            Sequence::Transaction => "seq/transaction",
            Sequence::LotteryType => "seq/lottery_type",
            Sequence::PrizeLevel => "seq/prize_level",
            Sequence::PrizePool => "seq/prize_pool",
            Sequence::Ticket => "seq/ticket",
            Sequence::Product => "seq/product",
            Sequence::CardKey => "seq/card_key",
            Sequence::ExchangeRecord => "seq/exchange_record",
            Sequence::Order => "seq/order",
        }
    }
}

fn row_key(table: &str, id: u64) -> String {
    format!("{}/{:020}", table, id)
}

const WALLETS: &str = "wallet";
const TRANSACTIONS: &str = "transaction";
const LOTTERY_TYPES: &str = "lottery_type";
const PRIZE_LEVELS: &str = "prize_level";
const PRIZE_POOLS: &str = "prize_pool";
const TICKETS: &str = "ticket";
const PRODUCTS: &str = "product";
const CARD_KEYS: &str = "card_key";
const EXCHANGE_RECORDS: &str = "exchange_record";
const ORDERS: &str = "order";

/// Open transaction with typed accessors
pub struct StoreTx<'a> {
    kv: &'a mut dyn KvTx,
}

impl<'a> StoreTx<'a> {
    /// Wrap a backend transaction
    pub fn new(kv: &'a mut dyn KvTx) -> Self {
        Self { kv }
    }

    // ==================== Helpers ====================

    fn read<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.kv.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.kv.put(key.as_bytes(), bytes)
    }

    fn read_ids(&self, key: &str) -> StoreResult<Vec<u64>> {
        Ok(self.read::<Vec<u64>>(key)?.unwrap_or_default())
    }

    fn push_id(&mut self, key: &str, id: u64) -> StoreResult<()> {
        let mut ids = self.read_ids(key)?;
        ids.push(id);
        self.write(key, &ids)
    }

    fn load_rows<T: DeserializeOwned>(&self, table: &str, ids: &[u64]) -> StoreResult<Vec<T>> {
        let mut rows = Vec::with_capacity(ids.len());
        for id in ids {
            let row = self
                .read(&row_key(table, *id))?
                .ok_or_else(|| StoreError::not_found(table, id))?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Allocate the next ID of a sequence (starts at 1)
    pub fn next_id(&mut self, seq: Sequence) -> StoreResult<u64> {
        let next = self.read::<u64>(seq.key())?.unwrap_or(0) + 1;
        self.write(seq.key(), &next)?;
        Ok(next)
    }

    // ==================== Wallets & Transactions ====================

    /// Wallet of a user
    pub fn wallet_by_user(&self, user_id: UserId) -> StoreResult<Option<Wallet>> {
        match self.read::<u64>(&format!("idx/wallet_user/{:020}", user_id))? {
            Some(wallet_id) => self.read(&row_key(WALLETS, wallet_id)),
            None => Ok(None),
        }
    }

    /// Insert a new wallet; a user may own only one
    pub fn insert_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        let user_key = format!("idx/wallet_user/{:020}", wallet.user_id);
        if self.read::<u64>(&user_key)?.is_some() {
            return Err(StoreError::duplicate("wallet", wallet.user_id));
        }
        self.write(&user_key, &wallet.id)?;
        self.push_id("idx/wallets", wallet.id)?;
        self.write(&row_key(WALLETS, wallet.id), wallet)
    }

    /// Overwrite an existing wallet
    pub fn update_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        let key = row_key(WALLETS, wallet.id);
        if self.kv.get(key.as_bytes())?.is_none() {
            return Err(StoreError::not_found(WALLETS, wallet.id));
        }
        self.write(&key, wallet)
    }

    /// Every wallet, by creation order
    pub fn wallets(&self) -> StoreResult<Vec<Wallet>> {
        let ids = self.read_ids("idx/wallets")?;
        self.load_rows(WALLETS, &ids)
    }

    /// Append a ledger entry
    pub fn insert_transaction(&mut self, tx: &Transaction) -> StoreResult<()> {
        let key = row_key(TRANSACTIONS, tx.id);
        if self.kv.get(key.as_bytes())?.is_some() {
            return Err(StoreError::duplicate(TRANSACTIONS, tx.id));
        }
        self.write(&key, tx)?;
        self.push_id(&format!("idx/wallet_tx/{:020}", tx.wallet_id), tx.id)
    }

    /// Ledger entries of a wallet, oldest first
    pub fn transactions_for_wallet(&self, wallet_id: WalletId) -> StoreResult<Vec<Transaction>> {
        let ids = self.read_ids(&format!("idx/wallet_tx/{:020}", wallet_id))?;
        self.load_rows(TRANSACTIONS, &ids)
    }

    // ==================== Catalog ====================

    /// Lottery type by ID
    pub fn lottery_type(&self, id: LotteryTypeId) -> StoreResult<Option<LotteryType>> {
        self.read(&row_key(LOTTERY_TYPES, id))
    }

    /// Insert or overwrite a lottery type
    pub fn put_lottery_type(&mut self, lottery: &LotteryType) -> StoreResult<()> {
        let key = row_key(LOTTERY_TYPES, lottery.id);
        if self.kv.get(key.as_bytes())?.is_none() {
            self.push_id("idx/lottery_types", lottery.id)?;
        }
        self.write(&key, lottery)
    }

    /// Every lottery type
    pub fn lottery_types(&self) -> StoreResult<Vec<LotteryType>> {
        let ids = self.read_ids("idx/lottery_types")?;
        self.load_rows(LOTTERY_TYPES, &ids)
    }

    /// Prize level by ID
    pub fn prize_level(&self, id: PrizeLevelId) -> StoreResult<Option<PrizeLevel>> {
        self.read(&row_key(PRIZE_LEVELS, id))
    }

    /// Insert or overwrite a prize level
    pub fn put_prize_level(&mut self, level: &PrizeLevel) -> StoreResult<()> {
        let key = row_key(PRIZE_LEVELS, level.id);
        if self.kv.get(key.as_bytes())?.is_none() {
            self.push_id(
                &format!("idx/type_levels/{:020}", level.lottery_type_id),
                level.id,
            )?;
        }
        self.write(&key, level)
    }

    /// Levels of a lottery type, best rank first
    pub fn prize_levels_for(&self, lottery_type_id: LotteryTypeId) -> StoreResult<Vec<PrizeLevel>> {
        let ids = self.read_ids(&format!("idx/type_levels/{:020}", lottery_type_id))?;
        let mut levels: Vec<PrizeLevel> = self.load_rows(PRIZE_LEVELS, &ids)?;
        levels.sort_by_key(|l| (l.level, l.id));
        Ok(levels)
    }

    /// Pool by ID
    pub fn prize_pool(&self, id: PrizePoolId) -> StoreResult<Option<PrizePool>> {
        self.read(&row_key(PRIZE_POOLS, id))
    }

    /// Insert or overwrite a pool, keeping the active-pool pointer in sync
    pub fn put_prize_pool(&mut self, pool: &PrizePool) -> StoreResult<()> {
        let key = row_key(PRIZE_POOLS, pool.id);
        let active_key = format!("idx/active_pool/{:020}", pool.lottery_type_id);
        if self.kv.get(key.as_bytes())?.is_none() {
            self.push_id(
                &format!("idx/type_pools/{:020}", pool.lottery_type_id),
                pool.id,
            )?;
        }
        match pool.status {
            PoolStatus::Active => self.write(&active_key, &pool.id)?,
            PoolStatus::SoldOut => {
                if self.read::<u64>(&active_key)? == Some(pool.id) {
                    self.kv.remove(active_key.as_bytes())?;
                }
            }
        }
        self.write(&key, pool)
    }

    /// The active pool of a lottery type
    pub fn active_pool(&self, lottery_type_id: LotteryTypeId) -> StoreResult<Option<PrizePool>> {
        match self.read::<u64>(&format!("idx/active_pool/{:020}", lottery_type_id))? {
            Some(pool_id) => self.prize_pool(pool_id),
            None => Ok(None),
        }
    }

    /// Every pool of a lottery type, oldest first
    pub fn pools_for(&self, lottery_type_id: LotteryTypeId) -> StoreResult<Vec<PrizePool>> {
        let ids = self.read_ids(&format!("idx/type_pools/{:020}", lottery_type_id))?;
        self.load_rows(PRIZE_POOLS, &ids)
    }

    // ==================== Tickets ====================

    /// Ticket by ID
    pub fn ticket(&self, id: TicketId) -> StoreResult<Option<Ticket>> {
        self.read(&row_key(TICKETS, id))
    }

    /// Ticket by security code
    pub fn ticket_by_code(&self, code: &str) -> StoreResult<Option<Ticket>> {
        match self.read::<u64>(&format!("idx/ticket_code/{}", code))? {
            Some(id) => self.ticket(id),
            None => Ok(None),
        }
    }

    /// Whether a security code is taken
    pub fn security_code_exists(&self, code: &str) -> StoreResult<bool> {
        Ok(self
            .kv
            .get(format!("idx/ticket_code/{}", code).as_bytes())?
            .is_some())
    }

    /// Insert a new ticket; the security code must be unused
    pub fn insert_ticket(&mut self, ticket: &Ticket) -> StoreResult<()> {
        let code_key = format!("idx/ticket_code/{}", ticket.security_code);
        if self.kv.get(code_key.as_bytes())?.is_some() {
            return Err(StoreError::duplicate("security_code", &ticket.security_code));
        }
        let key = row_key(TICKETS, ticket.id);
        if self.kv.get(key.as_bytes())?.is_some() {
            return Err(StoreError::duplicate(TICKETS, ticket.id));
        }
        self.write(&code_key, &ticket.id)?;
        self.push_id(&format!("idx/user_tickets/{:020}", ticket.user_id), ticket.id)?;
        self.push_id(
            &format!("idx/pool_tickets/{:020}", ticket.prize_pool_id),
            ticket.id,
        )?;
        self.write(&key, ticket)
    }

    /// Overwrite an existing ticket
    pub fn update_ticket(&mut self, ticket: &Ticket) -> StoreResult<()> {
        let key = row_key(TICKETS, ticket.id);
        if self.kv.get(key.as_bytes())?.is_none() {
            return Err(StoreError::not_found(TICKETS, ticket.id));
        }
        self.write(&key, ticket)
    }

    /// Tickets owned by a user, oldest first
    pub fn tickets_for_user(&self, user_id: UserId) -> StoreResult<Vec<Ticket>> {
        let ids = self.read_ids(&format!("idx/user_tickets/{:020}", user_id))?;
        self.load_rows(TICKETS, &ids)
    }

    /// Tickets sold from a pool, oldest first
    pub fn tickets_for_pool(&self, pool_id: PrizePoolId) -> StoreResult<Vec<Ticket>> {
        let ids = self.read_ids(&format!("idx/pool_tickets/{:020}", pool_id))?;
        self.load_rows(TICKETS, &ids)
    }

    // ==================== Products ====================

    /// Product by ID
    pub fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.read(&row_key(PRODUCTS, id))
    }

    /// Insert or overwrite a product
    pub fn put_product(&mut self, product: &Product) -> StoreResult<()> {
        let key = row_key(PRODUCTS, product.id);
        if self.kv.get(key.as_bytes())?.is_none() {
            self.push_id("idx/products", product.id)?;
        }
        self.write(&key, product)
    }

    /// Every product
    pub fn products(&self) -> StoreResult<Vec<Product>> {
        let ids = self.read_ids("idx/products")?;
        self.load_rows(PRODUCTS, &ids)
    }

    /// Card key by ID
    pub fn card_key(&self, id: CardKeyId) -> StoreResult<Option<CardKey>> {
        self.read(&row_key(CARD_KEYS, id))
    }

    /// Insert or overwrite a card key, keeping the available queue in sync
    pub fn put_card_key(&mut self, key: &CardKey) -> StoreResult<()> {
        let row = row_key(CARD_KEYS, key.id);
        let queue_key = format!("idx/available_keys/{:020}", key.product_id);
        let mut queue = self.read_ids(&queue_key)?;
        let queued = queue.contains(&key.id);
        match key.status {
            CardKeyStatus::Available if !queued => {
                queue.push(key.id);
                queue.sort_unstable();
                self.write(&queue_key, &queue)?;
            }
            CardKeyStatus::Redeemed if queued => {
                queue.retain(|id| *id != key.id);
                self.write(&queue_key, &queue)?;
            }
            _ => {}
        }
        self.write(&row, key)
    }

    /// Oldest available key of a product
    pub fn next_available_card_key(&self, product_id: ProductId) -> StoreResult<Option<CardKey>> {
        let queue = self.read_ids(&format!("idx/available_keys/{:020}", product_id))?;
        match queue.first() {
            Some(id) => self.card_key(*id),
            None => Ok(None),
        }
    }

    /// Number of available keys of a product
    pub fn available_card_key_count(&self, product_id: ProductId) -> StoreResult<u64> {
        Ok(self
            .read_ids(&format!("idx/available_keys/{:020}", product_id))?
            .len() as u64)
    }

    /// Record a redemption
    pub fn insert_exchange_record(&mut self, record: &ExchangeRecord) -> StoreResult<()> {
        self.push_id(
            &format!("idx/user_exchanges/{:020}", record.user_id),
            record.id,
        )?;
        self.write(&row_key(EXCHANGE_RECORDS, record.id), record)
    }

    /// Redemptions of a user, oldest first
    pub fn exchange_records_for_user(&self, user_id: UserId) -> StoreResult<Vec<ExchangeRecord>> {
        let ids = self.read_ids(&format!("idx/user_exchanges/{:020}", user_id))?;
        self.load_rows(EXCHANGE_RECORDS, &ids)
    }

    // ==================== Orders ====================

    /// Order by ID
    pub fn order(&self, id: OrderId) -> StoreResult<Option<RechargeOrder>> {
        self.read(&row_key(ORDERS, id))
    }

    /// Order by merchant order number
    pub fn order_by_out_trade_no(&self, out_trade_no: &str) -> StoreResult<Option<RechargeOrder>> {
        match self.read::<u64>(&format!("idx/out_trade_no/{}", out_trade_no))? {
            Some(id) => self.order(id),
            None => Ok(None),
        }
    }

    /// Insert or overwrite an order
    pub fn put_order(&mut self, order: &RechargeOrder) -> StoreResult<()> {
        let key = row_key(ORDERS, order.id);
        if self.kv.get(key.as_bytes())?.is_none() {
            let no_key = format!("idx/out_trade_no/{}", order.out_trade_no);
            if self.kv.get(no_key.as_bytes())?.is_some() {
                return Err(StoreError::duplicate("out_trade_no", &order.out_trade_no));
            }
            self.write(&no_key, &order.id)?;
            self.push_id(&format!("idx/user_orders/{:020}", order.user_id), order.id)?;
        }
        self.write(&key, order)
    }

    /// Orders of a user, oldest first
    pub fn orders_for_user(&self, user_id: UserId) -> StoreResult<Vec<RechargeOrder>> {
        let ids = self.read_ids(&format!("idx/user_orders/{:020}", user_id))?;
        self.load_rows(ORDERS, &ids)
    }
}
