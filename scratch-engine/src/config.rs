//! Engine Configuration
//!
//! Loaded from environment variables with the `SCRATCH_` prefix. Secrets are
//! wiped from memory when the config is dropped and never printed by `Debug`.

use std::env;
use std::fmt;

use scratch_core::{EncryptionKey, INITIAL_GRANT};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use zeroize::Zeroize;

use crate::auth::Role;
use crate::error::{EngineError, EngineResult};

/// Development-only ticket key; never valid outside `development()`
const DEV_ENCRYPTION_KEY: &str = "5c7a0d3e9b41f2867ea1c05d3b9f48e2a6d1703c8f5e29b4d7a3061ce85f9b2d";

/// One statically configured identity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DevIdentity {
    /// Bearer name presented by the caller
    pub name: String,
    /// Wallet owner ID
    pub user_id: u64,
    /// Role
    pub role: Role,
}

impl DevIdentity {
    /// Parse `name:user_id:role`
    pub fn parse(entry: &str) -> EngineResult<Self> {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        if parts.len() != 3 || parts[0].is_empty() {
            return Err(EngineError::Configuration(format!(
                "dev identity must be name:user_id:role, got '{}'",
                entry
            )));
        }
        let user_id = parts[1].parse().map_err(|_| {
            EngineError::Configuration(format!("invalid user id in dev identity '{}'", entry))
        })?;
        let role = Role::from_str(parts[2]).ok_or_else(|| {
            EngineError::Configuration(format!("invalid role in dev identity '{}'", entry))
        })?;
        Ok(Self {
            name: parts[0].to_string(),
            user_id,
            role,
        })
    }

    /// Parse a comma-separated list, skipping blanks
    pub fn parse_list(list: &str) -> EngineResult<Vec<Self>> {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// Engine configuration
#[derive(Clone, Deserialize)]
pub struct EngineConfig {
    /// Ticket content key, 64 hex chars
    pub encryption_key: String,
    /// Payment gateway merchant secret
    pub payment_secret: String,
    /// Payment gateway merchant ID
    #[serde(default)]
    pub payment_merchant_id: String,
    /// Points granted when a wallet is created
    #[serde(default = "default_initial_grant")]
    pub initial_grant: i64,
    /// Upper bound on tickets per purchase
    #[serde(default = "default_max_purchase_quantity")]
    pub max_purchase_quantity: u32,
    /// Security code generation attempts before giving up
    #[serde(default = "default_code_attempts")]
    pub security_code_attempts: u32,
    /// Static identities for the bundled authenticator
    #[serde(default)]
    pub dev_identities: Vec<DevIdentity>,
}

fn random_key_hex() -> String {
    let mut bytes = [0u8; scratch_core::crypto::KEY_SIZE];
    OsRng.fill_bytes(&mut bytes);
    let encoded = hex::encode(bytes);
    bytes.zeroize();
    encoded
}

fn default_initial_grant() -> i64 {
    INITIAL_GRANT
}

fn default_max_purchase_quantity() -> u32 {
    10
}

fn default_code_attempts() -> u32 {
    scratch_core::security_code::MAX_GENERATION_ATTEMPTS
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - SCRATCH_ENCRYPTION_KEY: ticket key, 64 hex chars
    /// - SCRATCH_PAYMENT_SECRET: gateway merchant secret
    /// - SCRATCH_PAYMENT_MERCHANT_ID: gateway merchant ID
    /// - SCRATCH_INITIAL_GRANT: points for a new wallet (default 50)
    /// - SCRATCH_MAX_PURCHASE_QUANTITY: tickets per purchase (default 10)
    /// - SCRATCH_DEV_USERS: `name:user_id:role` entries, comma-separated
    pub fn from_env() -> EngineResult<Self> {
        let dev_identities = match env::var("SCRATCH_DEV_USERS") {
            Ok(list) => DevIdentity::parse_list(&list)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            encryption_key: env::var("SCRATCH_ENCRYPTION_KEY").unwrap_or_default(),
            payment_secret: env::var("SCRATCH_PAYMENT_SECRET").unwrap_or_default(),
            payment_merchant_id: env::var("SCRATCH_PAYMENT_MERCHANT_ID").unwrap_or_default(),
            initial_grant: env::var("SCRATCH_INITIAL_GRANT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(INITIAL_GRANT),
            max_purchase_quantity: env::var("SCRATCH_MAX_PURCHASE_QUANTITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            security_code_attempts: default_code_attempts(),
            dev_identities,
        })
    }

    /// Development configuration with a fixed key and two demo identities
    pub fn development() -> Self {
        Self {
            encryption_key: DEV_ENCRYPTION_KEY.to_string(),
            payment_secret: "dev-payment-secret".to_string(),
            payment_merchant_id: "1000".to_string(),
            initial_grant: INITIAL_GRANT,
            max_purchase_quantity: 10,
            security_code_attempts: default_code_attempts(),
            dev_identities: vec![
                DevIdentity {
                    name: "admin".to_string(),
                    user_id: 1,
                    role: Role::Admin,
                },
                DevIdentity {
                    name: "alice".to_string(),
                    user_id: 2,
                    role: Role::User,
                },
            ],
        }
    }

    /// Test configuration with a freshly generated key
    pub fn test() -> Self {
        Self {
            encryption_key: random_key_hex(),
            payment_secret: "test-payment-secret".to_string(),
            payment_merchant_id: "1000".to_string(),
            initial_grant: INITIAL_GRANT,
            max_purchase_quantity: 10,
            security_code_attempts: default_code_attempts(),
            dev_identities: Vec::new(),
        }
    }

    /// Set the initial grant
    pub fn with_initial_grant(mut self, grant: i64) -> Self {
        self.initial_grant = grant;
        self
    }

    /// Set the purchase cap
    pub fn with_max_purchase_quantity(mut self, max: u32) -> Self {
        self.max_purchase_quantity = max;
        self
    }

    /// Decode the ticket key
    pub fn encryption_key(&self) -> EngineResult<EncryptionKey> {
        if self.encryption_key.is_empty() {
            return Err(EngineError::Configuration(
                "SCRATCH_ENCRYPTION_KEY is not set".to_string(),
            ));
        }
        Ok(EncryptionKey::from_hex(&self.encryption_key)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        self.encryption_key()?;

        if self.payment_secret.is_empty() {
            return Err(EngineError::Configuration(
                "SCRATCH_PAYMENT_SECRET is not set".to_string(),
            ));
        }

        if self.initial_grant < 0 {
            return Err(EngineError::Configuration(format!(
                "initial grant must not be negative, got {}",
                self.initial_grant
            )));
        }

        if self.max_purchase_quantity == 0 {
            return Err(EngineError::Configuration(
                "max purchase quantity must be at least 1".to_string(),
            ));
        }

        if self.security_code_attempts == 0 {
            return Err(EngineError::Configuration(
                "security code attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("encryption_key", &"[REDACTED]")
            .field("payment_secret", &"[REDACTED]")
            .field("payment_merchant_id", &self.payment_merchant_id)
            .field("initial_grant", &self.initial_grant)
            .field("max_purchase_quantity", &self.max_purchase_quantity)
            .field("security_code_attempts", &self.security_code_attempts)
            .field("dev_identities", &self.dev_identities.len())
            .finish()
    }
}

impl Drop for EngineConfig {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.payment_secret.zeroize();
    }
}
