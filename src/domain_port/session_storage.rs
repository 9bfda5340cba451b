use crate::domain_model::{Session, User};
use crate::domain_port::StorageError;

#[async_trait::async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self) -> Result<Option<Session>, StorageError>;
    async fn save(&self, session: &Session) -> Result<(), StorageError>;
    async fn remove(&self) -> Result<(), StorageError>;
}

#[async_trait::async_trait]
pub trait UserStorage: Send + Sync {
    async fn get(&self) -> Result<Option<User>, StorageError>;
    async fn save(&self, user: &User) -> Result<(), StorageError>;
    async fn remove(&self) -> Result<(), StorageError>;
}
