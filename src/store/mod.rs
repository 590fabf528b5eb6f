//! Document store abstraction.
//!
//! All persistence goes through the managed document service. The trait keeps
//! handlers and the seeder independent of the wire client so they can run
//! against the in-memory backend locally and in tests.

mod firestore;
mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    AdminAction, HealthRecord, NewAdminAction, ProfileUpdate, Role, User, UserStatus,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Backend(String),
    #[error("malformed document {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// The three collections used by this service: `users` (keyed by the
/// identity-service UID), `healthData` and `adminActions` (auto-id).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, StoreError>;

    /// Create a user document keyed by `user.id`. `createdAt` and `updatedAt`
    /// are assigned by the store; any values on `user` are ignored.
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    /// Apply a validated profile update and touch `updatedAt`.
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), StoreError>;

    /// Set the account status and touch `updatedAt`.
    async fn set_user_status(&self, id: &str, status: UserStatus) -> Result<(), StoreError>;

    async fn delete_user(&self, id: &str) -> Result<(), StoreError>;

    /// Insert one screening record. The record's own `timestamp` is kept
    /// as-is (observation time, not write time).
    async fn insert_health_record(&self, record: &HealthRecord) -> Result<(), StoreError>;

    /// The most recent screening record for a user, if any.
    async fn latest_health_record(&self, user_id: &str)
        -> Result<Option<HealthRecord>, StoreError>;

    /// Append an audit entry; the store assigns id and timestamp.
    /// Entries are never mutated or deleted afterwards.
    async fn append_admin_action(&self, entry: &NewAdminAction) -> Result<(), StoreError>;

    /// All audit entries, newest first.
    async fn list_admin_actions(&self) -> Result<Vec<AdminAction>, StoreError>;
}
