use crate::domain_model::{Session, User};
use crate::domain_port::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub const SESSION_KEY: &str = "@gymtrack:token";
pub const USER_KEY: &str = "@gymtrack:user";

async fn read_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get_item(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

async fn write_json<T: Serialize + Sync>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set_item(key, &raw).await
}

/// Token pair stored as `{"token": ..., "refresh_token": ...}`.
pub struct KvSessionStorage {
    store: Arc<dyn KvStore>,
}

impl KvSessionStorage {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl SessionStorage for KvSessionStorage {
    async fn get(&self) -> Result<Option<Session>, StorageError> {
        read_json(self.store.as_ref(), SESSION_KEY).await
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        write_json(self.store.as_ref(), SESSION_KEY, session).await
    }

    async fn remove(&self) -> Result<(), StorageError> {
        self.store.remove_item(SESSION_KEY).await
    }
}

pub struct KvUserStorage {
    store: Arc<dyn KvStore>,
}

impl KvUserStorage {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl UserStorage for KvUserStorage {
    async fn get(&self) -> Result<Option<User>, StorageError> {
        read_json(self.store.as_ref(), USER_KEY).await
    }

    async fn save(&self, user: &User) -> Result<(), StorageError> {
        write_json(self.store.as_ref(), USER_KEY, user).await
    }

    async fn remove(&self) -> Result<(), StorageError> {
        self.store.remove_item(USER_KEY).await
    }
}
