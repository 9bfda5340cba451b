use crate::domain_model::*;
use crate::gateway::ApiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Answer of `POST /sessions`: the user plus a fresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInResponse {
    pub user: User,
    #[serde(flatten)]
    pub session: Session,
}

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn sign_in(&self, input: SignInInput) -> Result<User, ApiError>;
    async fn sign_up(&self, input: SignUpInput) -> Result<(), ApiError>;
    /// Forgets the user locally and removes the stored user and session.
    async fn sign_out(&self) -> Result<(), ApiError>;
    /// Picks up a session persisted by an earlier run.
    async fn restore(&self) -> Result<Option<User>, ApiError>;
    async fn update_user(&self, user: User) -> Result<(), ApiError>;
    async fn update_profile(&self, update: ProfileUpdate) -> Result<(), ApiError>;
    async fn upload_avatar(&self, upload: AvatarUpload) -> Result<User, ApiError>;
    fn current_user(&self) -> Option<User>;
    fn avatar_url(&self, user: &User) -> Option<String>;
}
