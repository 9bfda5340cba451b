use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::gateway::{AuthGateway, TokenManagerId};
use crate::infra_http::*;
use crate::infra_storage::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::anyhow;
use std::sync::Arc;
use std::time::Duration;

/// Everything the front end talks to, wired once per process.
pub struct Client {
    pub gateway: Arc<AuthGateway>,
    pub session_service: Arc<dyn SessionService>,
    pub workout_service: Arc<dyn WorkoutService>,
    sign_out_hook: Arc<SessionSignOut>,
    token_manager: TokenManagerId,
}

impl Client {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let transport: Arc<dyn HttpTransport> = match settings.api.backend.as_str() {
            "fake" => Arc::new(FakeGymBackend::new(settings.api.base_url.clone())),
            "real" => Arc::new(ReqwestTransport::try_new(
                settings.api.base_url.clone(),
                Duration::from_millis(settings.api.timeout_ms),
            )?),
            other => return Err(anyhow!("Unknown api backend: {}", other)),
        };

        let store: Arc<dyn KvStore> = match settings.storage.backend.as_str() {
            "memory" => Arc::new(MemoryKvStore::new()),
            "file" => Arc::new(FileKvStore::new(settings.storage.dir.clone())),
            other => return Err(anyhow!("Unknown storage backend: {}", other)),
        };

        Self::with_parts(transport, store).await
    }

    /// Builds the services over an explicit transport and store, registers
    /// the sign-out hook and restores a persisted session if there is one.
    pub async fn with_parts(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KvStore>,
    ) -> anyhow::Result<Self> {
        let session_storage: Arc<dyn SessionStorage> =
            Arc::new(KvSessionStorage::new(store.clone()));
        let user_storage: Arc<dyn UserStorage> = Arc::new(KvUserStorage::new(store));

        let gateway = Arc::new(AuthGateway::new(transport, session_storage));
        let session_service = Arc::new(RealSessionService::new(gateway.clone(), user_storage));
        let sign_out_hook = Arc::new(SessionSignOut::new(&session_service));
        let token_manager = gateway.register_token_manager(sign_out_hook.clone());
        let workout_service: Arc<dyn WorkoutService> =
            Arc::new(RealWorkoutService::new(gateway.clone()));

        match session_service.restore().await? {
            Some(user) => info!(user_id = %user.id, base_url = gateway.base_url(), "client ready"),
            None => info!(base_url = gateway.base_url(), "client ready, signed out"),
        }

        Ok(Self {
            gateway,
            session_service,
            workout_service,
            sign_out_hook,
            token_manager,
        })
    }

    /// Stops handling 401s and waits for pending sign-out cleanups, so a
    /// dead session is not left on disk for the next run.
    pub async fn shutdown(&self) {
        self.gateway.eject_token_manager(self.token_manager);
        self.sign_out_hook.flush().await;
        debug!("client shut down");
    }
}
