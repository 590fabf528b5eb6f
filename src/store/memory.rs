//! In-memory document store for local development and tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{
    AdminAction, HealthRecord, NewAdminAction, ProfileUpdate, Role, User, UserStatus,
};

use super::{DocumentStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    health: DashMap<String, HealthRecord>,
    actions: DashMap<String, AdminAction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user document as-is. Fixture helper; the trait's
    /// `create_user` is the real write path.
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn insert_health_record_raw(&self, record: HealthRecord) {
        self.health.insert(record.id.clone(), record);
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn health_record_count(&self) -> usize {
        self.health.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.role == role)
            .map(|u| u.clone())
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut user = user.clone();
        user.created_at = Some(now);
        user.updated_at = Some(now);
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<(), StoreError> {
        if let Some(mut user) = self.users.get_mut(id) {
            user.name = update.name.clone();
            user.gender = update.gender;
            user.birthdate = update.birthdate.clone();
            user.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_user_status(&self, id: &str, status: UserStatus) -> Result<(), StoreError> {
        if let Some(mut user) = self.users.get_mut(id) {
            user.status = status;
            user.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        self.users.remove(id);
        Ok(())
    }

    async fn insert_health_record(&self, record: &HealthRecord) -> Result<(), StoreError> {
        let mut record = record.clone();
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        self.health.insert(record.id.clone(), record);
        Ok(())
    }

    async fn latest_health_record(
        &self,
        user_id: &str,
    ) -> Result<Option<HealthRecord>, StoreError> {
        Ok(self
            .health
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .max_by_key(|r| r.timestamp))
    }

    async fn append_admin_action(&self, entry: &NewAdminAction) -> Result<(), StoreError> {
        let id = Uuid::new_v4().to_string();
        self.actions.insert(
            id.clone(),
            AdminAction {
                id,
                user_id: entry.user_id.clone(),
                user_name: entry.user_name.clone(),
                action: entry.action,
                admin_id: entry.admin_id.clone(),
                timestamp: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn list_admin_actions(&self) -> Result<Vec<AdminAction>, StoreError> {
        let mut actions: Vec<AdminAction> = self.actions.iter().map(|a| a.clone()).collect();
        actions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(actions)
    }
}
