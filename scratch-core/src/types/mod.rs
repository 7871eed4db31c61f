//! Domain types for the scratch lottery engine.

mod catalog;
mod exchange;
mod order;
mod ticket;
mod wallet;

pub use catalog::*;
pub use exchange::*;
pub use order::*;
pub use ticket::*;
pub use wallet::*;

/// User identifier, supplied by the authentication layer
pub type UserId = u64;
/// Wallet identifier
pub type WalletId = u64;
/// Transaction identifier
pub type TransactionId = u64;
/// Lottery type identifier
pub type LotteryTypeId = u64;
/// Prize level identifier
pub type PrizeLevelId = u64;
/// Prize pool identifier
pub type PrizePoolId = u64;
/// Ticket identifier
pub type TicketId = u64;
/// Product identifier
pub type ProductId = u64;
/// Card key identifier
pub type CardKeyId = u64;
/// Exchange record identifier
pub type ExchangeRecordId = u64;
/// Recharge order identifier
pub type OrderId = u64;
