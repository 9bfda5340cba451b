use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{SignOut, UserStorage};
use crate::gateway::{ApiError, AuthGateway};
use crate::logger::*;
use serde::de::IgnoredAny;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::task::JoinHandle;

/// Session state shared by the front end and the gateway's sign-out hook.
///
/// Every sign-in and sign-out starts a new epoch. Writes and removals of the
/// stored blobs happen under `storage_lock`, so a cleanup scheduled for an
/// old epoch can tell that a newer session has been stored since.
pub struct RealSessionService {
    gateway: Arc<AuthGateway>,
    user_storage: Arc<dyn UserStorage>,
    current: RwLock<Option<User>>,
    epoch: AtomicU64,
    storage_lock: tokio::sync::Mutex<()>,
}

impl RealSessionService {
    pub fn new(gateway: Arc<AuthGateway>, user_storage: Arc<dyn UserStorage>) -> Self {
        Self {
            gateway,
            user_storage,
            current: RwLock::new(None),
            epoch: AtomicU64::new(0),
            storage_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn set_current(&self, user: Option<User>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = user;
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Drops the in-memory session: current user and default token.
    /// Returns the epoch this sign-out opened.
    pub fn forget(&self) -> u64 {
        self.set_current(None);
        self.gateway.set_access_token(None);
        self.next_epoch()
    }

    async fn remove_stored(&self) -> Result<(), ApiError> {
        self.user_storage.remove().await?;
        self.gateway.session_storage().remove().await?;
        Ok(())
    }

    /// Removes the stored user and session unless a session newer than
    /// `epoch` has been set up in the meantime. Returns whether it did.
    pub async fn remove_stored_if_current(&self, epoch: u64) -> Result<bool, ApiError> {
        let _storage = self.storage_lock.lock().await;
        if self.epoch() != epoch {
            return Ok(false);
        }
        self.remove_stored().await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn sign_in(&self, input: SignInInput) -> Result<User, ApiError> {
        let response: SignInResponse = self
            .gateway
            .send_json(Method::Post, "/sessions", &input)
            .await?;

        let _storage = self.storage_lock.lock().await;
        self.next_epoch();
        self.user_storage.save(&response.user).await?;
        self.gateway
            .session_storage()
            .save(&response.session)
            .await?;
        self.gateway
            .set_access_token(Some(response.session.access_token.clone()));
        self.set_current(Some(response.user.clone()));

        info!(user_id = %response.user.id, "signed in");
        Ok(response.user)
    }

    async fn sign_up(&self, input: SignUpInput) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .gateway
            .send_json(Method::Post, "/users", &input)
            .await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let _storage = self.storage_lock.lock().await;
        self.forget();
        self.remove_stored().await?;
        info!("signed out");
        Ok(())
    }

    async fn restore(&self) -> Result<Option<User>, ApiError> {
        let _storage = self.storage_lock.lock().await;
        let user = self.user_storage.get().await?;
        let session = self.gateway.session_storage().get().await?;
        match (user, session) {
            (Some(user), Some(session)) => {
                self.gateway.set_access_token(Some(session.access_token));
                self.set_current(Some(user.clone()));
                debug!(user_id = %user.id, "session restored");
                Ok(Some(user))
            }
            _ => Ok(None),
        }
    }

    async fn update_user(&self, user: User) -> Result<(), ApiError> {
        self.user_storage.save(&user).await?;
        self.set_current(Some(user));
        Ok(())
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .gateway
            .send_json(Method::Put, "/users", &update)
            .await?;
        if let Some(mut user) = self.current_user() {
            user.name = update.name;
            self.update_user(user).await?;
        }
        Ok(())
    }

    async fn upload_avatar(&self, upload: AvatarUpload) -> Result<User, ApiError> {
        let form = MultipartForm::new().file(
            "avatar",
            upload.file_name,
            upload.content_type,
            upload.bytes,
        );
        let user: User = self
            .gateway
            .request_json(ApiRequest::patch("/users/avatar").multipart(form))
            .await?;
        self.update_user(user.clone()).await?;
        Ok(user)
    }

    fn current_user(&self) -> Option<User> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn avatar_url(&self, user: &User) -> Option<String> {
        user.avatar
            .as_ref()
            .map(|avatar| format!("{}/avatar/{}", self.gateway.base_url(), avatar))
    }
}

/// Sign-out hook handed to the gateway.
///
/// Clears the in-memory session right away and removes the stored blobs on
/// a spawned task, since the gateway calls it synchronously. `flush` waits
/// for those tasks.
pub struct SessionSignOut {
    service: Weak<RealSessionService>,
    cleanups: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionSignOut {
    pub fn new(service: &Arc<RealSessionService>) -> Self {
        Self {
            service: Arc::downgrade(service),
            cleanups: Mutex::new(Vec::new()),
        }
    }

    /// Waits until every cleanup scheduled so far has run.
    pub async fn flush(&self) {
        let tasks = std::mem::take(
            &mut *self
                .cleanups
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "session cleanup task failed");
            }
        }
    }
}

impl SignOut for SessionSignOut {
    fn sign_out(&self) {
        let Some(service) = self.service.upgrade() else {
            return;
        };
        let epoch = service.forget();
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no runtime to clear the stored session on");
                return;
            }
        };
        let task = handle.spawn(async move {
            match service.remove_stored_if_current(epoch).await {
                Ok(true) => info!("signed out, stored session removed"),
                Ok(false) => debug!(epoch, "newer session in place, stored session kept"),
                Err(e) => warn!(error = %e, "failed to clear stored session"),
            }
        });

        let mut cleanups = self.cleanups.lock().unwrap_or_else(PoisonError::into_inner);
        cleanups.retain(|t| !t.is_finished());
        cleanups.push(task);
    }
}
