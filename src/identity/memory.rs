//! In-memory identity service for local development and tests.

use dashmap::DashMap;

use super::{IdentityError, IdentityService};

#[derive(Default)]
pub struct MemoryIdentity {
    /// token -> uid
    tokens: DashMap<String, String>,
    /// uid -> display name
    accounts: DashMap<String, Option<String>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and a token that resolves to it.
    pub fn register(&self, token: &str, uid: &str, display_name: Option<&str>) {
        self.tokens.insert(token.to_string(), uid.to_string());
        self.accounts
            .insert(uid.to_string(), display_name.map(str::to_string));
    }

    pub fn has_account(&self, uid: &str) -> bool {
        self.accounts.contains_key(uid)
    }
}

#[async_trait::async_trait]
impl IdentityService for MemoryIdentity {
    async fn verify_id_token(&self, token: &str) -> Result<String, IdentityError> {
        self.tokens
            .get(token)
            .map(|uid| uid.clone())
            .ok_or(IdentityError::InvalidToken)
    }

    async fn display_name(&self, uid: &str) -> Result<Option<String>, IdentityError> {
        Ok(self.accounts.get(uid).and_then(|name| name.clone()))
    }

    async fn set_display_name(&self, uid: &str, name: &str) -> Result<(), IdentityError> {
        self.accounts
            .insert(uid.to_string(), Some(name.to_string()));
        Ok(())
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        self.accounts
            .remove(uid)
            .ok_or_else(|| IdentityError::AccountNotFound(uid.to_string()))?;
        self.tokens.retain(|_, v| v.as_str() != uid);
        Ok(())
    }
}
