use crate::domain_model::*;
use crate::domain_port::{HttpTransport, TransportError};
use crate::gateway::{REFRESH_PATH, TOKEN_EXPIRED, TOKEN_INVALID};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

pub const DEMO_EMAIL: &str = "demo@gymtrack.app";
pub const DEMO_PASSWORD: &str = "123456";

const SEED_EXERCISES: &[(&str, &str, u32, u32)] = &[
    ("Front lat pulldown", "back", 3, 12),
    ("Bent-over row", "back", 4, 10),
    ("Seated cable row", "back", 3, 12),
    ("Barbell curl", "biceps", 3, 12),
    ("Hammer curl", "biceps", 3, 10),
    ("Triceps pushdown", "triceps", 3, 12),
    ("Skull crusher", "triceps", 3, 10),
    ("Back squat", "legs", 4, 8),
    ("Leg press", "legs", 4, 12),
    ("Overhead press", "shoulders", 3, 10),
    ("Lateral raise", "shoulders", 3, 15),
];

struct Account {
    user: User,
    password: String,
}

#[derive(Clone)]
struct IssuedToken {
    email: String,
    expired: bool,
}

#[derive(Deserialize)]
struct SignInBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct SignUpBody {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh_token: String,
}

#[derive(Deserialize)]
struct ProfileBody {
    name: String,
    old_password: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct HistoryBody {
    exercise_id: ExerciseId,
}

/// In-process stand-in for the gym REST API.
///
/// Used by the `fake` api backend. Tokens look like `fake-access-token:<id>`;
/// access tokens can be expired on demand to exercise the refresh path.
/// Every refresh rotates the refresh token.
pub struct FakeGymBackend {
    base_url: String,
    latency: Option<Duration>,
    accounts: DashMap<String, Account>,
    access_tokens: DashMap<String, IssuedToken>,
    refresh_tokens: DashMap<String, String>,
    exercises: Vec<Exercise>,
    history: DashMap<String, Vec<HistoryEntry>>,
    next_id: AtomicU64,
    refresh_calls: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

fn reply<T: Serialize + ?Sized>(status: u16, body: &T) -> ApiResponse {
    ApiResponse::json(status, body).unwrap_or_else(|e| ApiResponse::error(500, &e.to_string()))
}

fn json_body<T: serde::de::DeserializeOwned>(request: &ApiRequest) -> Result<T, ApiResponse> {
    let value = match &request.body {
        RequestBody::Json(value) => value.clone(),
        RequestBody::Encoded(text) => serde_json::from_str(text)
            .map_err(|e| ApiResponse::error(400, &format!("malformed body: {}", e)))?,
        _ => return Err(ApiResponse::error(400, "expected a JSON body")),
    };
    serde_json::from_value(value).map_err(|e| ApiResponse::error(400, &e.to_string()))
}

impl FakeGymBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let backend = Self {
            base_url: base_url.into(),
            latency: None,
            accounts: DashMap::new(),
            access_tokens: DashMap::new(),
            refresh_tokens: DashMap::new(),
            exercises: seed_exercises(),
            history: DashMap::new(),
            next_id: AtomicU64::new(1),
            refresh_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        };
        backend.create_account("Demo", DEMO_EMAIL, DEMO_PASSWORD);
        backend
    }

    /// Delay every answer, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every access token issued so far answer `token.expired`.
    pub fn expire_access_tokens(&self) {
        for mut entry in self.access_tokens.iter_mut() {
            entry.expired = true;
        }
    }

    /// Forgets every refresh token, so the next refresh fails.
    pub fn revoke_refresh_tokens(&self) {
        self.refresh_tokens.clear();
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// `METHOD path` of every request received, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Issues a token pair directly, bypassing `/sessions`.
    pub fn issue_session(&self, email: &str) -> Session {
        let session = Session::new(
            format!("fake-access-token:{}", nanoid!(10)),
            format!("fake-refresh-token:{}", nanoid!(10)),
        );
        self.access_tokens.insert(
            session.access_token.0.clone(),
            IssuedToken {
                email: email.to_string(),
                expired: false,
            },
        );
        self.refresh_tokens
            .insert(session.refresh_token.0.clone(), email.to_string());
        session
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn create_account(&self, name: &str, email: &str, password: &str) -> User {
        let user = User {
            id: UserId(self.next_id()),
            name: name.to_string(),
            email: email.to_string(),
            avatar: None,
        };
        self.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    fn authenticate(&self, bearer: Option<&AccessToken>) -> Result<String, ApiResponse> {
        let Some(token) = bearer else {
            return Err(ApiResponse::error(401, "token.missing"));
        };
        match self.access_tokens.get(token.as_str()) {
            Some(issued) if issued.expired => Err(ApiResponse::error(401, TOKEN_EXPIRED)),
            Some(issued) => Ok(issued.email.clone()),
            None => Err(ApiResponse::error(401, TOKEN_INVALID)),
        }
    }

    fn route(&self, request: &ApiRequest, bearer: Option<&AccessToken>) -> Result<ApiResponse, ApiResponse> {
        let path = request.path.trim_matches('/').to_string();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let refresh: Vec<&str> = REFRESH_PATH.trim_matches('/').split('/').collect();

        match (request.method, segments.as_slice()) {
            (Method::Post, s) if s == refresh.as_slice() => self.refresh(request),
            (Method::Post, ["sessions"]) => self.sign_in(request),
            (Method::Post, ["users"]) => self.sign_up(request),
            (Method::Put, ["users"]) => {
                let email = self.authenticate(bearer)?;
                self.update_profile(&email, request)
            }
            (Method::Patch, ["users", "avatar"]) => {
                let email = self.authenticate(bearer)?;
                self.update_avatar(&email, request)
            }
            (Method::Get, ["groups"]) => {
                self.authenticate(bearer)?;
                Ok(reply(200, &self.groups()))
            }
            (Method::Get, ["exercises", "bygroup", group]) => {
                self.authenticate(bearer)?;
                let list: Vec<&Exercise> = self
                    .exercises
                    .iter()
                    .filter(|e| e.group.eq_ignore_ascii_case(group))
                    .collect();
                Ok(reply(200, &list))
            }
            (Method::Get, ["exercises", id]) => {
                self.authenticate(bearer)?;
                let exercise = self.find_exercise(id)?;
                Ok(reply(200, exercise))
            }
            (Method::Post, ["history"]) => {
                let email = self.authenticate(bearer)?;
                self.register_history(&email, request)
            }
            (Method::Get, ["history"]) => {
                let email = self.authenticate(bearer)?;
                Ok(reply(200, &self.history_by_day(&email)))
            }
            _ => Err(ApiResponse::error(404, "route not found")),
        }
    }

    fn sign_in(&self, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        let body: SignInBody = json_body(request)?;
        let user = match self.accounts.get(&body.email) {
            Some(account) if account.password == body.password => account.user.clone(),
            _ => return Err(ApiResponse::error(400, "incorrect e-mail or password")),
        };
        let session = self.issue_session(&body.email);
        Ok(reply(
            200,
            &json!({
                "user": user,
                "token": session.access_token,
                "refresh_token": session.refresh_token,
            }),
        ))
    }

    fn sign_up(&self, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        let body: SignUpBody = json_body(request)?;
        if body.name.trim().is_empty() || body.password.is_empty() {
            return Err(ApiResponse::error(400, "name and password are required"));
        }
        if self.accounts.contains_key(&body.email) {
            return Err(ApiResponse::error(400, "e-mail already in use"));
        }
        self.create_account(&body.name, &body.email, &body.password);
        Ok(ApiResponse::empty(201))
    }

    fn refresh(&self, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let body: RefreshBody = json_body(request)?;
        let Some((_, email)) = self.refresh_tokens.remove(&body.refresh_token) else {
            return Err(ApiResponse::error(401, "refresh token not found"));
        };
        let session = self.issue_session(&email);
        Ok(reply(200, &session))
    }

    fn update_profile(&self, email: &str, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        let body: ProfileBody = json_body(request)?;
        let mut account = self
            .accounts
            .get_mut(email)
            .ok_or_else(|| ApiResponse::error(404, "user not found"))?;
        if let Some(password) = body.password {
            match body.old_password {
                None => return Err(ApiResponse::error(400, "old password is required")),
                Some(old) if old != account.password => {
                    return Err(ApiResponse::error(400, "old password does not match"));
                }
                Some(_) => account.password = password,
            }
        }
        account.user.name = body.name;
        Ok(ApiResponse::empty(200))
    }

    fn update_avatar(&self, email: &str, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        let RequestBody::Multipart(form) = &request.body else {
            return Err(ApiResponse::error(400, "expected a multipart body"));
        };
        let Some(file_name) = form.part("avatar").and_then(|p| p.file_name.clone()) else {
            return Err(ApiResponse::error(400, "avatar file is required"));
        };
        let mut account = self
            .accounts
            .get_mut(email)
            .ok_or_else(|| ApiResponse::error(404, "user not found"))?;
        account.user.avatar = Some(format!("{}-{}", nanoid!(8), file_name));
        Ok(reply(200, &account.user))
    }

    fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.exercises.iter().map(|e| e.group.clone()).collect();
        groups.sort();
        groups.dedup();
        groups
    }

    fn find_exercise(&self, id: &str) -> Result<&Exercise, ApiResponse> {
        let id: ExerciseId = id
            .parse()
            .map_err(|_| ApiResponse::error(400, "invalid exercise id"))?;
        self.exercises
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ApiResponse::error(404, "exercise not found"))
    }

    fn register_history(&self, email: &str, request: &ApiRequest) -> Result<ApiResponse, ApiResponse> {
        let body: HistoryBody = json_body(request)?;
        let exercise = self.find_exercise(&body.exercise_id.to_string())?;
        let now = Utc::now();
        let entry = HistoryEntry {
            id: self.next_id(),
            name: exercise.name.clone(),
            group: exercise.group.clone(),
            hour: now.format("%H:%M").to_string(),
            created_at: now,
        };
        self.history.entry(email.to_string()).or_default().push(entry);
        Ok(ApiResponse::empty(201))
    }

    fn history_by_day(&self, email: &str) -> Vec<HistoryByDay> {
        let mut entries = self
            .history
            .get(email)
            .map(|h| h.value().clone())
            .unwrap_or_default();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut days: Vec<HistoryByDay> = Vec::new();
        for entry in entries {
            let title = entry.created_at.format("%d.%m.%Y").to_string();
            match days.last_mut() {
                Some(day) if day.title == title => day.data.push(entry),
                _ => days.push(HistoryByDay {
                    title,
                    data: vec![entry],
                }),
            }
        }
        days
    }
}

fn seed_exercises() -> Vec<Exercise> {
    let created: DateTime<Utc> = Utc::now() - ChronoDuration::days(30);
    SEED_EXERCISES
        .iter()
        .enumerate()
        .map(|(i, (name, group, series, repetitions))| {
            let slug = name.to_lowercase().replace([' ', '-'], "_");
            Exercise {
                id: ExerciseId(i as u64 + 1),
                name: name.to_string(),
                series: *series,
                repetitions: *repetitions,
                group: group.to_string(),
                demo: format!("{}.gif", slug),
                thumb: format!("{}.png", slug),
                created_at: created,
                updated_at: created,
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl HttpTransport for FakeGymBackend {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.to_string());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(match self.route(request, bearer) {
            Ok(response) | Err(response) => response,
        })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
