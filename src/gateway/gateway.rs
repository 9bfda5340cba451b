use crate::domain_model::*;
use crate::domain_port::*;
use crate::gateway::pending::{RefreshGuard, lock};
use crate::gateway::*;
use crate::logger::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::oneshot;

pub const REFRESH_PATH: &str = "/sessions/refresh-token";

/// Server messages on a 401 that mean "get a new access token".
pub const TOKEN_EXPIRED: &str = "token.expired";
pub const TOKEN_INVALID: &str = "token.invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenManagerId(u64);

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

enum Recovery {
    Owner,
    Queued(oneshot::Receiver<RefreshOutcome>),
    Rotated(AccessToken),
}

/// HTTP client that keeps the access token fresh.
///
/// One instance lives for the whole process. It attaches the current access
/// token to every request and, once a token manager is registered, turns an
/// expired-token 401 into a single refresh exchange followed by a replay of
/// the failed request. Requests that hit the same 401 while that exchange is
/// in flight wait for it and are resumed in the order they failed.
pub struct AuthGateway {
    transport: Arc<dyn HttpTransport>,
    session_storage: Arc<dyn SessionStorage>,
    access_token: RwLock<Option<AccessToken>>,
    token_manager: RwLock<Option<(TokenManagerId, Arc<dyn SignOut>)>>,
    next_manager_id: AtomicU64,
    refresh: Mutex<RefreshState>,
}

impl AuthGateway {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session_storage: Arc<dyn SessionStorage>,
    ) -> Self {
        Self {
            transport,
            session_storage,
            access_token: RwLock::new(None),
            token_manager: RwLock::new(None),
            next_manager_id: AtomicU64::new(1),
            refresh: Mutex::new(RefreshState::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn session_storage(&self) -> &Arc<dyn SessionStorage> {
        &self.session_storage
    }

    /// The token sent as `Authorization: Bearer ...` on outbound requests.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_access_token(&self, token: Option<AccessToken>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Installs the 401 handling. A later registration replaces an earlier
    /// one; the returned id ejects it again.
    pub fn register_token_manager(&self, sign_out: Arc<dyn SignOut>) -> TokenManagerId {
        let id = TokenManagerId(self.next_manager_id.fetch_add(1, Ordering::Relaxed));
        *self
            .token_manager
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some((id, sign_out));
        debug!(?id, "token manager registered");
        id
    }

    /// Removes the token manager if `id` is still the registered one.
    pub fn eject_token_manager(&self, id: TokenManagerId) -> bool {
        let mut slot = self
            .token_manager
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((current, _)) if *current == id => {
                *slot = None;
                debug!(?id, "token manager ejected");
                true
            }
            _ => false,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.refresh).is_refreshing()
    }

    pub fn queued_requests(&self) -> usize {
        lock(&self.refresh).queued()
    }

    fn sign_out_hook(&self) -> Option<Arc<dyn SignOut>> {
        self.token_manager
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, hook)| hook.clone())
    }

    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let sent_with = self.access_token();
        let response = self.transport.send(&request, sent_with.as_ref()).await?;
        if response.is_success() {
            return Ok(response);
        }
        if response.status != 401 {
            return Err(ApiError::from_response(&response));
        }

        let Some(sign_out) = self.sign_out_hook() else {
            return Err(ApiError::from_response(&response));
        };

        match response.error_message().as_deref() {
            Some(TOKEN_EXPIRED) | Some(TOKEN_INVALID) => {
                self.recover(request, sent_with, sign_out).await
            }
            reason => {
                warn!(%request, ?reason, "unauthorized, signing out");
                sign_out.sign_out();
                Err(ApiError::from_response(&response))
            }
        }
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        self.request(request)
            .await?
            .decode()
            .map_err(ApiError::decode)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(ApiRequest::get(path)).await
    }

    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = ApiRequest::new(method, path)
            .json(body)
            .map_err(ApiError::decode)?;
        self.request_json(request).await
    }

    async fn recover(
        &self,
        request: ApiRequest,
        sent_with: Option<AccessToken>,
        sign_out: Arc<dyn SignOut>,
    ) -> Result<ApiResponse, ApiError> {
        let Some(session) = self.session_storage.get().await? else {
            warn!(%request, "token expired and no refresh token stored, signing out");
            sign_out.sign_out();
            return Err(ApiError::SessionExpired);
        };

        let recovery = {
            let mut state = lock(&self.refresh);
            match self.access_token() {
                Some(current)
                    if !state.is_refreshing() && sent_with.as_ref() != Some(&current) =>
                {
                    Recovery::Rotated(current)
                }
                _ if state.begin() => Recovery::Owner,
                _ => {
                    let (pending, rx) = PendingRequest::new();
                    state.enqueue(pending);
                    debug!(%request, queued = state.queued(), "refresh in flight, queueing request");
                    Recovery::Queued(rx)
                }
            }
        };

        match recovery {
            Recovery::Queued(rx) => match rx.await {
                Ok(RefreshOutcome::Refreshed(token)) => {
                    self.dispatch_once(&request.replay(), &token).await
                }
                Ok(RefreshOutcome::Failed(err)) => Err(err),
                Err(_) => Err(ApiError::Cancelled),
            },
            Recovery::Rotated(token) => {
                debug!(%request, "token already rotated, replaying");
                self.dispatch_once(&request.replay(), &token).await
            }
            Recovery::Owner => {
                let mut guard = RefreshGuard::new(&self.refresh);
                info!(%request, "access token expired, refreshing session");
                match self.refresh_session(&session.refresh_token).await {
                    Ok(session) => {
                        let token = session.access_token;
                        self.set_access_token(Some(token.clone()));
                        // Queued requests must survive this future being
                        // dropped during the replay.
                        guard.record(RefreshOutcome::Refreshed(token.clone()));
                        let result = self.dispatch_once(&request.replay(), &token).await;
                        let resumed = guard.complete(RefreshOutcome::Refreshed(token));
                        info!(resumed, "session refreshed");
                        result
                    }
                    Err(err) => {
                        let rejected = guard.complete(RefreshOutcome::Failed(err.clone()));
                        warn!(%err, rejected, "session refresh failed, signing out");
                        self.set_access_token(None);
                        sign_out.sign_out();
                        Err(err)
                    }
                }
            }
        }
    }

    /// The refresh exchange goes straight to the transport: a 401 here is a
    /// failed refresh, not something to refresh again.
    async fn refresh_session(&self, refresh_token: &RefreshToken) -> Result<Session, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH)
            .json(&RefreshRequest {
                refresh_token: refresh_token.as_str(),
            })
            .map_err(ApiError::decode)?;
        let response = self
            .transport
            .send(&request, self.access_token().as_ref())
            .await?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response));
        }
        let session: Session = response.decode().map_err(ApiError::decode)?;
        self.session_storage.save(&session).await?;
        Ok(session)
    }

    /// Sends a replay. Its outcome is final; no second refresh.
    async fn dispatch_once(
        &self,
        request: &ApiRequest,
        token: &AccessToken,
    ) -> Result<ApiResponse, ApiError> {
        let response = self.transport.send(request, Some(token)).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(&response))
        }
    }
}
