//! Process-memory repositories. Everything is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use groundwater_core::{AccessRecord, AccessRepository, AccessUpdate, AccountError, User, UserRepository};

#[derive(Default)]
struct UserTables {
    by_id: HashMap<String, User>,
    // normalized email -> user id
    by_email: HashMap<String, String>,
}

/// Users keyed by id with an email index.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    tables: Arc<RwLock<UserTables>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert_if_absent(&self, user: User) -> Result<User, AccountError> {
        // Check and insert under one write guard.
        let mut tables = self.tables.write().await;
        if tables.by_email.contains_key(&user.email) {
            return Err(AccountError::EmailTaken);
        }
        tables.by_email.insert(user.email.clone(), user.id.clone());
        tables.by_id.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_email
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AccountError> {
        Ok(self.tables.read().await.by_id.get(id).cloned())
    }

    async fn count(&self) -> Result<usize, AccountError> {
        Ok(self.tables.read().await.by_id.len())
    }
}

/// Access records keyed by user id.
#[derive(Clone, Default)]
pub struct InMemoryAccessRepository {
    records: Arc<RwLock<HashMap<String, AccessRecord>>>,
}

impl InMemoryAccessRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessRepository for InMemoryAccessRepository {
    async fn insert(&self, user_id: &str, record: AccessRecord) -> Result<(), AccountError> {
        self.records.write().await.insert(user_id.to_string(), record);
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<AccessRecord>, AccountError> {
        Ok(self.records.read().await.get(user_id).cloned())
    }

    async fn update(
        &self,
        user_id: &str,
        update: AccessUpdate<'_>,
    ) -> Result<Option<AccessRecord>, AccountError> {
        let mut records = self.records.write().await;
        Ok(records.get_mut(user_id).map(|record| {
            update(record);
            record.clone()
        }))
    }
}
