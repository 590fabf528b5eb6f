//! Identity service abstraction.
//!
//! Token verification and account lifecycle live in the managed identity
//! service; this trait is the only seam the handlers see.

mod firebase;
mod memory;

pub use firebase::FirebaseIdentity;
pub use memory::MemoryIdentity;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("identity account {0} not found")]
    AccountNotFound(String),
    #[error("identity service request failed: {0}")]
    Backend(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        IdentityError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Verify a bearer id-token and return the account UID.
    async fn verify_id_token(&self, token: &str) -> Result<String, IdentityError>;

    /// The display name currently held by the identity service, if any.
    async fn display_name(&self, uid: &str) -> Result<Option<String>, IdentityError>;

    async fn set_display_name(&self, uid: &str, name: &str) -> Result<(), IdentityError>;

    /// Remove the account. The caller remains responsible for the user
    /// document; the two deletes are not atomic.
    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;
}
