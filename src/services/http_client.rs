use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{header, multipart::Form, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::modules::guard::Route;
use crate::services::navigator::Navigator;
use crate::services::token_store::TokenStore;

pub const CONNECTION_MESSAGE: &str = "Connection error. Check your network and try again.";
pub const SERVER_MESSAGE: &str = "The server ran into an error. Please try again later.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

lazy_static! {
    static ref PATH_SEGMENT: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Request rejected with status {status}")]
    Rejected { status: u16, detail: Option<String> },

    #[error("Server error with status {status}")]
    Server { status: u16 },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::Server { status } => Some(*status),
            _ => None,
        }
    }

    /// Message provided by the server, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::SessionExpired) || self.status() == Some(401)
    }

    /// Text to show the user. Server-provided details are passed through verbatim.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::Connection(_) => CONNECTION_MESSAGE.to_string(),
            Self::Server { .. } => SERVER_MESSAGE.to_string(),
            Self::SessionExpired => SESSION_EXPIRED_MESSAGE.to_string(),
            _ => fallback.to_string(),
        }
    }

    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Connection("request timed out".to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

/// Checks that an id can be placed in a URL path or file name as-is
pub fn path_segment(id: &str) -> Result<&str, ApiError> {
    if PATH_SEGMENT.is_match(id) {
        Ok(id)
    } else {
        Err(ApiError::InvalidIdentifier(id.to_string()))
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Accepts `{"detail": "..."}`, FastAPI validation lists
/// `{"detail": [{"msg": "..."}]}`, `{"error": "..."}` and `{"message": "..."}`.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    match value.get("detail") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => other.get("msg").and_then(|m| m.as_str()).map(str::to_string),
                })
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }

    ["error", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// =============================================================================
// REQUEST DESCRIPTION
// =============================================================================

/// Replayable description of a JSON request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Position of a request in its one-shot refresh lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Replayed,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BinaryResponse {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

// =============================================================================
// CLIENT
// =============================================================================

type SessionEndHook = Box<dyn Fn() + Send + Sync>;

/// Authenticated REST client.
///
/// Adds the stored bearer token to every request. A 401 triggers one refresh
/// through `/auth/refresh` followed by one replay; when the refresh is not
/// possible, or the replay is rejected again, the stored session is wiped and
/// the navigator is sent to the public entry route.
pub struct ApiClient {
    client: Client,
    base_url: String,
    default_timeout: Duration,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    refresh_lock: Mutex<()>,
    session_end_hooks: RwLock<Vec<SessionEndHook>>,
}

impl ApiClient {
    pub fn new(config: &Config, tokens: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = match Client::builder().default_headers(headers).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("HTTP client setup failed, using defaults without Accept header: {}", e);
                Client::new()
            }
        };

        Self {
            client,
            base_url: config.api_base_url.clone(),
            default_timeout: config.http_timeout,
            tokens,
            navigator,
            refresh_lock: Mutex::new(()),
            session_end_hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build(&self, request: &ApiRequest) -> RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .timeout(request.timeout.unwrap_or(self.default_timeout));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        } else if request.method == Method::POST {
            builder = builder.json(&serde_json::json!({}));
        }
        builder
    }

    /// Sends an authenticated request, refreshing the access token at most once
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut attempt = Attempt::Initial;

        loop {
            let token = self.tokens.access_token();
            let mut builder = self.build(&request);
            if let Some(token) = &token {
                builder = builder.bearer_auth(token);
            }

            tracing::debug!(method = %request.method, path = %request.path, ?attempt, "API request");
            let response = builder.send().await.map_err(ApiError::from_transport)?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return check_status(response).await;
            }

            match attempt {
                Attempt::Initial => {
                    tracing::info!(path = %request.path, "Access token rejected, refreshing");
                    self.renew_after_unauthorized(token.as_deref()).await?;
                    attempt = Attempt::Replayed;
                }
                Attempt::Replayed => {
                    tracing::warn!(path = %request.path, "Request rejected after token refresh");
                    self.end_session();
                    return Err(ApiError::SessionExpired);
                }
            }
        }
    }

    /// Sends a request without credentials and without refresh handling
    pub async fn send_public(&self, request: ApiRequest) -> Result<Response, ApiError> {
        tracing::debug!(method = %request.method, path = %request.path, "Public API request");
        let response = self
            .build(&request)
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        check_status(response).await
    }

    pub async fn post_multipart_public(
        &self,
        path: &str,
        form: Form,
        timeout: Duration,
    ) -> Result<Response, ApiError> {
        tracing::debug!(path = %path, "Multipart API request");
        let response = self
            .client
            .post(self.url(path))
            .timeout(timeout)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        check_status(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        decode_json(self.send(request).await?).await
    }

    pub async fn post_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        decode_json(self.send(request).await?).await
    }

    pub async fn get_bytes(&self, request: ApiRequest) -> Result<BinaryResponse, ApiError> {
        let response = self.send(request).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(BinaryResponse {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    /// Exchanges the stored refresh token for a new access token and persists it
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let refresh_token = self.tokens.refresh_token().ok_or(ApiError::SessionExpired)?;

        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .timeout(self.default_timeout)
            .bearer_auth(&refresh_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let refreshed: RefreshTokenResponse = decode_json(check_status(response).await?).await?;
        match &refreshed.refresh_token {
            Some(rotated) => self.tokens.set_tokens(&refreshed.access_token, rotated),
            None => self.tokens.set_access_token(&refreshed.access_token),
        }
        Ok(refreshed.access_token)
    }

    /// Serialises refreshes so concurrent 401s share one refresh call
    async fn renew_after_unauthorized(&self, rejected_token: Option<&str>) -> Result<(), ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.tokens.access_token();
        if current.is_some() && current.as_deref() != rejected_token {
            return Ok(());
        }

        match self.refresh_access_token().await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                self.end_session();
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Registers a callback run whenever the client ends the session
    pub fn on_session_end(&self, hook: impl Fn() + Send + Sync + 'static) {
        match self.session_end_hooks.write() {
            Ok(mut hooks) => hooks.push(Box::new(hook)),
            Err(e) => tracing::error!("Session end hooks poisoned: {}", e),
        }
    }

    /// Drops every piece of stored session data, notifies listeners and routes
    /// to the public entry screen
    pub fn end_session(&self) {
        self.tokens.clear();
        if let Ok(hooks) = self.session_end_hooks.read() {
            hooks.iter().for_each(|hook| hook());
        }
        self.navigator.navigate(Route::Home);
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    if status.is_server_error() {
        tracing::error!(status = code, url = %response.url(), "Server error");
        return Err(ApiError::Server { status: code });
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Rejected {
        status: code,
        detail: extract_detail(&body),
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}
