//! Scratch Core - Lottery Domain Layer
//!
//! Pure domain logic for the scratch lottery engine. Nothing in this crate
//! performs I/O; persistence lives in `scratch-store` and orchestration in
//! `scratch-engine`.
//!
//! # Components
//!
//! - **Types**: wallets, transactions, catalog, pools, tickets, products, orders
//! - **Rules**: strongly typed `rules_config` per game type
//! - **Crypto**: authenticated encryption of ticket content
//! - **Security codes**: 16-character anti-counterfeit identifiers
//! - **Prize**: slot-based prize determination and the pattern grid variant
//! - **Signature**: payment gateway callback signing and verification
//!
//! # Usage
//!
//! ```rust
//! use rand::SeedableRng;
//! use scratch_core::prize::{draw, DrawOutcome, LevelSlot};
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let levels = vec![LevelSlot::new(1, 1, 1000, 1)];
//! let outcome = draw(&mut rng, 1, &levels).unwrap();
//! assert!(matches!(outcome, DrawOutcome::Win { prize_amount: 1000, .. }));
//! ```

pub mod crypto;
pub mod error;
pub mod prize;
pub mod rules;
pub mod security_code;
pub mod signature;
pub mod types;

pub use crypto::{EncryptionKey, TicketCipher};
pub use error::{CoreError, CoreResult};
pub use prize::{DrawOutcome, LevelSlot};
pub use rules::{GameRules, PatternRules, PatternSymbol, StandardRules};
pub use types::*;

/// Points granted to every wallet at registration
pub const INITIAL_GRANT: i64 = 50;
