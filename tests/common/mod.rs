use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use casa_del_sol::config::Config;
use casa_del_sol::services::{MemoryTokenStore, TokenStore};
use casa_del_sol::App;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const PASSWORD: &str = "correct-horse";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Mutable behaviour and request log of the mock backend
#[allow(dead_code)]
#[derive(Default)]
pub struct MockState {
    pub hits: HashMap<String, usize>,
    pub valid_access: HashSet<String>,
    pub valid_refresh: HashSet<String>,
    pub issued: usize,
    pub reject_all_access: bool,
    pub profile: Value,
    pub users: Vec<Value>,
    pub inside: Vec<Value>,
    pub actions: Vec<(String, String, Value)>,
    pub scans: Vec<Value>,
    pub query_log: Vec<(String, HashMap<String, String>)>,
    pub fail_qr: bool,
}

pub type Shared = Arc<Mutex<MockState>>;

// Allow dead_code for utilities used by other test files
#[allow(dead_code)]
pub struct TestContext {
    pub base_url: String,
    pub mock: Shared,
    pub tokens: Arc<MemoryTokenStore>,
    pub app: App,
    pub data_dir: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        let mock: Shared = Arc::new(Mutex::new(MockState {
            profile: user_json("1", "visitas", Some("authorized")),
            ..MockState::default()
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let router = mock_router(mock.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        let data_dir = std::env::temp_dir().join(format!("casa-test-{}", uuid::Uuid::new_v4()));
        let tokens = Arc::new(MemoryTokenStore::new());
        let config = Config::for_base_url(&base_url, data_dir.clone());
        let app = App::new(config, tokens.clone());

        Self {
            base_url,
            mock,
            tokens,
            app,
            data_dir,
        }
    }

    pub fn hits(&self, key: &str) -> usize {
        self.mock.lock().unwrap().hits.get(key).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.mock.lock().unwrap().hits.values().sum()
    }

    pub fn set_profile(&self, profile: Value) {
        self.mock.lock().unwrap().profile = profile;
    }

    pub fn set_users(&self, users: Vec<Value>) {
        self.mock.lock().unwrap().users = users;
    }

    /// Stores a session whose tokens the backend accepts
    pub fn sign_in_as_stored(&self, access: &str, refresh: &str) {
        {
            let mut state = self.mock.lock().unwrap();
            state.valid_access.insert(access.to_string());
            state.valid_refresh.insert(refresh.to_string());
        }
        self.tokens.set_tokens(access, refresh);
    }

    pub fn cleanup(&self) {
        std::fs::remove_dir_all(&self.data_dir).ok();
    }
}

#[allow(dead_code)]
pub fn user_json(id: &str, role: &str, status: Option<&str>) -> Value {
    let mut user = json!({
        "id": id.parse::<i64>().map(Value::from).unwrap_or_else(|_| Value::from(id)),
        "email": format!("user{}@example.com", id),
        "nombre_completo": "Test",
        "apellidos": format!("User{}", id),
        "telefono": "5512345678",
        "direccion": "Calle 1",
        "edad": 30,
        "role": role,
        "created_at": "2025-03-01T10:00:00"
    });
    if let Some(status) = status {
        user["authorization_status"] = Value::from(status);
    }
    user
}

// =============================================================================
// MOCK BACKEND
// =============================================================================

fn record(state: &Shared, key: &str) {
    *state.lock().unwrap().hits.entry(key.to_string()).or_insert(0) += 1;
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Could not validate credentials"}))).into_response()
}

fn authorized(state: &Shared, headers: &HeaderMap) -> bool {
    let state = state.lock().unwrap();
    !state.reject_all_access
        && bearer(headers)
            .map(|t| state.valid_access.contains(&t))
            .unwrap_or(false)
}

fn mock_router(state: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/status", get(auth_status))
        .route("/profile", get(profile))
        .route("/admin/users/pending", get(pending_users))
        .route("/admin/users/search", get(search_users))
        .route("/admin/stats", get(stats))
        .route("/admin/users/{id}/identification-file", get(identification_file))
        .route("/admin/users/{id}/identification", get(identification))
        .route("/admin/users/{id}/manual-exit", post(manual_exit))
        .route("/admin/users/{id}/{action}", post(user_action))
        .route("/admin/access-logs", get(access_logs))
        .route("/admin/users-inside", get(users_inside))
        .route("/qr/current", get(qr_current))
        .route("/qr/scan", post(qr_scan))
        .with_state(state)
}

async fn health(State(state): State<Shared>) -> Json<Value> {
    record(&state, "health");
    Json(json!({"status": "ok"}))
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    record(&state, "login");
    if body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid email or password"}))).into_response();
    }

    let mut state = state.lock().unwrap();
    state.issued += 1;
    let access = format!("access-{}", state.issued);
    let refresh = format!("refresh-{}", state.issued);
    state.valid_access.insert(access.clone());
    state.valid_refresh.insert(refresh.clone());
    Json(json!({"access_token": access, "refresh_token": refresh, "token_type": "bearer"})).into_response()
}

async fn register(State(state): State<Shared>, _body: Bytes) -> Response {
    record(&state, "register");
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Usuario registrado. Pendiente de autorización.",
            "user": user_json("77", "visitas", Some("pending"))
        })),
    )
        .into_response()
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "refresh");
    let mut state = state.lock().unwrap();
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    if !state.valid_refresh.contains(&token) {
        return unauthorized();
    }

    state.issued += 1;
    let access = format!("access-{}", state.issued);
    state.valid_access.insert(access.clone());
    Json(json!({"access_token": access, "token_type": "bearer"})).into_response()
}

async fn auth_status(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "auth_status");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let status = state.lock().unwrap().profile["authorization_status"].clone();
    Json(json!({
        "authorization_status": status,
        "can_access_qr": status == "authorized",
        "message": "Status checked"
    }))
    .into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "profile");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(state.lock().unwrap().profile.clone()).into_response()
}

fn page_of(users: Vec<Value>, query: &HashMap<String, String>) -> Value {
    let per_page: usize = query.get("per_page").and_then(|p| p.parse().ok()).unwrap_or(20);
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page = per_page.max(1);
    let shown: Vec<Value> = users
        .iter()
        .skip((page.max(1) - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect();
    json!({
        "total": users.len(),
        "page": page,
        "per_page": per_page,
        "total_pages": users.len().div_ceil(per_page).max(1),
        "users": shown
    })
}

async fn pending_users(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    record(&state, "pending_users");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    state.query_log.push(("pending".into(), query.clone()));
    let users: Vec<Value> = state
        .users
        .iter()
        .filter(|u| u["authorization_status"] == "pending")
        .cloned()
        .collect();
    Json(page_of(users, &query)).into_response()
}

async fn search_users(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    record(&state, "search_users");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    state.query_log.push(("search".into(), query.clone()));
    let users: Vec<Value> = state
        .users
        .iter()
        .filter(|u| match query.get("category") {
            Some(role) => u["role"] == role.as_str(),
            None => true,
        })
        .cloned()
        .collect();
    Json(page_of(users, &query)).into_response()
}

async fn stats(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "stats");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(json!({
        "users_total": 5,
        "users_authorized": 3,
        "users_pending": 1,
        "users_unauthorized": 1,
        "users_by_role": {"visitas": 2, "personal": 3}
    }))
    .into_response()
}

async fn identification_file(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "identification_file");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not Found"}))).into_response()
}

async fn identification(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "identification");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES).into_response()
}

async fn user_action(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((id, action)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    record(&state, &action);
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let mut state = state.lock().unwrap();
    state.actions.push((id.clone(), action.clone(), body));

    let new_status = match action.as_str() {
        "authorize" | "reauthorize" => Some("authorized"),
        "unauthorize" => Some("unauthorized"),
        _ => None,
    };
    if action == "reject" {
        state.users.retain(|u| u["id"].to_string().trim_matches('"') != id);
    } else if let Some(status) = new_status {
        for user in state.users.iter_mut() {
            if user["id"].to_string().trim_matches('"') == id {
                user["authorization_status"] = Value::from(status);
            }
        }
    }
    Json(json!({"message": format!("{} done", action)})).into_response()
}

async fn access_logs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    record(&state, "access_logs");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state
        .lock()
        .unwrap()
        .query_log
        .push(("access_logs".into(), query.clone()));
    Json(json!({
        "logs": [
            {"id": 1, "user_id": 4, "user_name": "Ana Ruiz", "user_email": "ana@example.com",
             "access_type": "entry", "timestamp": "2025-03-01T08:00:00", "is_manual": false},
            {"id": 2, "user_id": 4, "user_name": "Ana Ruiz", "user_email": "ana@example.com",
             "access_type": "exit", "timestamp": "2025-03-01T17:00:00Z", "is_manual": true,
             "notes": "Registered by admin"}
        ],
        "total_entries": 1,
        "total_exits": 1,
        "currently_inside": 0
    }))
    .into_response()
}

async fn users_inside(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "users_inside");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    Json(Value::Array(state.lock().unwrap().inside.clone())).into_response()
}

async fn manual_exit(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "manual_exit");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    let mut state = state.lock().unwrap();
    state.actions.push((id.clone(), "manual-exit".into(), body));
    state.inside.retain(|u| u["id"].to_string().trim_matches('"') != id);
    Json(json!({"message": "Exit registered"})).into_response()
}

async fn qr_current(State(state): State<Shared>, headers: HeaderMap) -> Response {
    record(&state, "qr_current");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    if state.lock().unwrap().fail_qr {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"detail": "down"}))).into_response();
    }
    let expires = chrono::Utc::now() + chrono::Duration::seconds(300);
    Json(json!({
        "code": "QR-CURRENT",
        "qr_image": "iVBORw0KGgo=",
        "expires_at": expires.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }))
    .into_response()
}

async fn qr_scan(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "qr_scan");
    if !authorized(&state, &headers) {
        return unauthorized();
    }
    state.lock().unwrap().scans.push(body.clone());
    if body["qr_code"] == "expired" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "El código QR ha expirado"})),
        )
            .into_response();
    }
    Json(json!({
        "message": format!("{} registrada", body["access_type"].as_str().unwrap_or("")),
        "access_log": {
            "id": 99,
            "access_type": body["access_type"],
            "timestamp": "2025-03-01T09:00:00Z",
            "is_manual": false
        }
    }))
    .into_response()
}
