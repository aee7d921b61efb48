use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::{
    repo::{StoreError, UserStore},
    repo_types::User,
};

/// Process-local store keyed by lowercased email. Used by tests and by
/// `USER_STORE=memory` for running without Postgres.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Number of stored records whose email matches case-insensitively.
    #[cfg(test)]
    pub async fn count_by_email(&self, email: &str) -> usize {
        let key = email.to_lowercase();
        self.users
            .read()
            .await
            .values()
            .filter(|u| u.email.to_lowercase() == key)
            .count()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&email.to_lowercase()).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let key = user.email.to_lowercase();
        if users.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        users.insert(key, user.clone());
        Ok(user)
    }
}
