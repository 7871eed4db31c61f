//! Caller identity
//!
//! The engine never authenticates anyone itself. An [`Authenticator`] turns a
//! presented credential into a [`Caller`], and every operation receives the
//! caller explicitly.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DevIdentity;
use crate::error::{EngineError, EngineResult};
use scratch_core::UserId;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Player
    User,
    /// Operator
    Admin,
}

impl Role {
    /// Parse from string (for environment variables)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Wallet owner ID
    pub user_id: UserId,
    /// Role
    pub role: Role,
}

impl Caller {
    /// Player caller
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::User,
        }
    }

    /// Operator caller
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Whether the caller is an operator
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the caller is an operator
    pub fn require_admin(&self, operation: &str) -> EngineResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = self.user_id, operation, "admin operation refused");
            Err(EngineError::Forbidden(format!(
                "{} requires the admin role",
                operation
            )))
        }
    }
}

/// Resolves credentials to callers
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve `credential`, failing `Forbidden` when unknown
    async fn authenticate(&self, credential: &str) -> EngineResult<Caller>;
}

/// Authenticator over a fixed identity list
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    identities: HashMap<String, Caller>,
}

impl StaticAuthenticator {
    /// Build from configured identities
    pub fn new(identities: &[DevIdentity]) -> Self {
        let identities = identities
            .iter()
            .map(|id| {
                (
                    id.name.clone(),
                    Caller {
                        user_id: id.user_id,
                        role: id.role,
                    },
                )
            })
            .collect();
        Self { identities }
    }

    /// Number of known identities
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether no identity is configured
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, credential: &str) -> EngineResult<Caller> {
        self.identities
            .get(credential.trim())
            .copied()
            .ok_or_else(|| EngineError::Forbidden("unknown credential".to_string()))
    }
}
