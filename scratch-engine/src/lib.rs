//! Scratch Engine - Lottery Operations over a Points Ledger
//!
//! [`ScratchEngine`] ties the prize model from `scratch-core` to a
//! transactional [`LotteryStore`]. Each operation is one atomic store unit,
//! which is what keeps the three consistency properties of the system:
//!
//! - **Ledger**: a wallet's balance always equals the sum of its
//!   transaction rows, and is never negative.
//! - **Inventory**: a pool never sells more tickets than it holds, and no
//!   prize level is drawn more often than its quantity.
//! - **Settlement**: a winning ticket is credited exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scratch_engine::{Caller, EngineConfig, NewLotteryType, ScratchEngine};
//! use scratch_core::GameType;
//! use scratch_store::MemoryStore;
//!
//! # async fn demo() -> scratch_engine::EngineResult<()> {
//! let engine = ScratchEngine::new(Arc::new(MemoryStore::new()), EngineConfig::test())?;
//! let admin = Caller::admin(1);
//! let lottery = engine
//!     .create_lottery_type(
//!         &admin,
//!         NewLotteryType {
//!             name: "Lucky 7".to_string(),
//!             price: 10,
//!             max_prize: 0,
//!             game_type: GameType::NumberMatch,
//!             rules_config: serde_json::Value::Null,
//!         },
//!     )
//!     .await?;
//! engine.add_prize_level(&admin, lottery.id, 1, 100, 1).await?;
//! engine.open_pool(&admin, lottery.id, 10).await?;
//!
//! engine.register_user(2).await?;
//! let player = Caller::user(2);
//! let receipt = engine.purchase(&player, lottery.id, 1).await?;
//! let result = engine.scratch(&player, receipt.tickets[0].ticket_id).await?;
//! println!("won {}", result.prize_amount);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod ops;

pub use auth::{Authenticator, Caller, Role, StaticAuthenticator};
pub use config::{DevIdentity, EngineConfig};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use ledger::{Posting, ReconcileReport};
pub use ops::{
    CallbackOutcome, LevelStats, NewLotteryType, PoolStats, PurchaseReceipt, RechargeRequest,
    RedeemReceipt, ScratchEngine, ScratchResult,
};
pub use scratch_store::LotteryStore;
