#![allow(dead_code)]

use gymtrack::domain_model::*;
use gymtrack::domain_port::*;
use gymtrack::gateway::{AuthGateway, REFRESH_PATH, TOKEN_EXPIRED};
use gymtrack::infra_storage::{KvSessionStorage, MemoryKvStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub const OLD_TOKEN: &str = "token-1";
pub const NEW_TOKEN: &str = "token-2";
pub const OLD_REFRESH: &str = "refresh-1";
pub const NEW_REFRESH: &str = "refresh-2";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

/// Transport answering from a script instead of a server.
///
/// Requests carrying the currently valid token get `200 {"path": ...}`,
/// anything else gets `401 {"message": <rejection>}`. A few paths have
/// fixed answers: `/boom` (500 with message), `/bare` (502 without body),
/// `/offline` (transport error), `/blocked` (401 `user.blocked`).
/// `/hang` never answers once it is sent with a token the server accepts.
/// The refresh endpoint can be held until `release_refresh` is called,
/// `/slow` until `release_slow`.
pub struct ScriptedTransport {
    valid_token: Mutex<String>,
    rejection: Mutex<String>,
    refresh_answer: Mutex<Result<Session, ApiResponse>>,
    refresh_offline: AtomicBool,
    hold_refresh: AtomicBool,
    gate: Semaphore,
    hold_slow: AtomicBool,
    slow_gate: Semaphore,
    pub refresh_started: Notify,
    refresh_calls: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            valid_token: Mutex::new(OLD_TOKEN.to_string()),
            rejection: Mutex::new(TOKEN_EXPIRED.to_string()),
            refresh_answer: Mutex::new(Ok(Session::new(NEW_TOKEN, NEW_REFRESH))),
            refresh_offline: AtomicBool::new(false),
            hold_refresh: AtomicBool::new(false),
            gate: Semaphore::new(0),
            hold_slow: AtomicBool::new(false),
            slow_gate: Semaphore::new(0),
            refresh_started: Notify::new(),
            refresh_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The server stops accepting the current token.
    pub fn expire(&self) {
        *self.valid_token.lock().unwrap() = NEW_TOKEN.to_string();
    }

    pub fn set_rejection(&self, message: &str) {
        *self.rejection.lock().unwrap() = message.to_string();
    }

    pub fn answer_refresh(&self, response: ApiResponse) {
        *self.refresh_answer.lock().unwrap() = Err(response);
    }

    pub fn refresh_offline(&self) {
        self.refresh_offline.store(true, Ordering::SeqCst);
    }

    pub fn hold_refresh(&self) {
        self.hold_refresh.store(true, Ordering::SeqCst);
    }

    pub fn release_refresh(&self) {
        self.gate.add_permits(1);
    }

    /// Holds the answer to `/slow` requests sent with `OLD_TOKEN`.
    pub fn hold_slow(&self) {
        self.hold_slow.store(true, Ordering::SeqCst);
    }

    pub fn release_slow(&self) {
        self.slow_gate.add_permits(1);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Paths sent with `token`, in order, refresh endpoint excluded.
    pub fn paths_sent_with(&self, token: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.path != REFRESH_PATH && c.bearer.as_deref() == Some(token))
            .map(|c| c.path)
            .collect()
    }

    async fn refresh(&self) -> Result<ApiResponse, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_started.notify_one();
        if self.hold_refresh.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
        if self.refresh_offline.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout("refresh timed out".to_string()));
        }
        let answer = self.refresh_answer.lock().unwrap().clone();
        match answer {
            Ok(session) => Ok(ApiResponse::json(200, &session).unwrap()),
            Err(response) => Ok(response),
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method,
            path: request.path.clone(),
            bearer: bearer.map(|t| t.as_str().to_string()),
            body: request.body.clone(),
        });

        match request.path.as_str() {
            REFRESH_PATH => return self.refresh().await,
            "/boom" => return Ok(ApiResponse::error(500, "exercise not found")),
            "/bare" => return Ok(ApiResponse::empty(502)),
            "/offline" => return Err(TransportError::Network("connection refused".to_string())),
            "/blocked" => return Ok(ApiResponse::error(401, "user.blocked")),
            _ => {}
        }

        if request.path == "/slow"
            && self.hold_slow.load(Ordering::SeqCst)
            && bearer.map(|t| t.as_str()) == Some(OLD_TOKEN)
        {
            if let Ok(permit) = self.slow_gate.acquire().await {
                permit.forget();
            }
        }

        let valid = self.valid_token.lock().unwrap().clone();
        if request.path == "/hang" && bearer.map(|t| t.as_str()) == Some(valid.as_str()) {
            std::future::pending::<()>().await;
        }
        if bearer.map(|t| t.as_str()) == Some(valid.as_str()) {
            Ok(ApiResponse::json(200, &serde_json::json!({ "path": request.path })).unwrap())
        } else {
            let rejection = self.rejection.lock().unwrap().clone();
            Ok(ApiResponse::error(401, &rejection))
        }
    }

    fn base_url(&self) -> &str {
        "http://scripted.local"
    }
}

#[derive(Default)]
pub struct CountingSignOut {
    calls: AtomicUsize,
}

impl CountingSignOut {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SignOut for CountingSignOut {
    fn sign_out(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryKvStore>,
    pub storage: Arc<KvSessionStorage>,
    pub sign_out: Arc<CountingSignOut>,
    pub gateway: Arc<AuthGateway>,
}

/// Gateway signed in with `OLD_TOKEN`/`OLD_REFRESH`, token manager
/// registered.
pub async fn signed_in() -> Harness {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(MemoryKvStore::new());
    let storage = Arc::new(KvSessionStorage::new(store.clone()));
    storage
        .save(&Session::new(OLD_TOKEN, OLD_REFRESH))
        .await
        .unwrap();

    let gateway = Arc::new(AuthGateway::new(transport.clone(), storage.clone()));
    gateway.set_access_token(Some(AccessToken(OLD_TOKEN.to_string())));
    let sign_out = Arc::new(CountingSignOut::default());
    gateway.register_token_manager(sign_out.clone());

    Harness {
        transport,
        store,
        storage,
        sign_out,
        gateway,
    }
}

/// Yields until `path` has gone out with `token`.
pub async fn wait_for_send(transport: &ScriptedTransport, path: &str, token: &str) {
    while !transport
        .paths_sent_with(token)
        .iter()
        .any(|p| p == path)
    {
        tokio::task::yield_now().await;
    }
}

/// Yields until `n` requests are parked behind the running refresh.
pub async fn wait_for_queue(gateway: &AuthGateway, n: usize) {
    while gateway.queued_requests() < n {
        tokio::task::yield_now().await;
    }
}
