use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Client-side persisted session data: tokens plus the last fetched user as raw JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<serde_json::Value>,
}

/// Which pieces of session data are present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenPresence {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub has_user_data: bool,
}

/// Persistent key/value storage for the session, the client's equivalent of browser local storage.
///
/// Implementations must make every setter durable before returning; a failed
/// write is logged and the in-memory value is still updated.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> StoredSession;
    fn set_tokens(&self, access_token: &str, refresh_token: &str);
    fn set_access_token(&self, access_token: &str);
    fn set_user(&self, user: serde_json::Value);
    fn clear(&self);

    fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn cached_user(&self) -> Option<serde_json::Value> {
        self.load().user
    }

    fn presence(&self) -> TokenPresence {
        let session = self.load();
        TokenPresence {
            has_access_token: session.access_token.is_some(),
            has_refresh_token: session.refresh_token.is_some(),
            has_user_data: session.user.is_some(),
        }
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<StoredSession>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StoredSession) -> Self {
        Self {
            inner: RwLock::new(session),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut StoredSession)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut guard);
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> StoredSession {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        self.update(|s| {
            s.access_token = Some(access_token.to_string());
            s.refresh_token = Some(refresh_token.to_string());
        });
    }

    fn set_access_token(&self, access_token: &str) {
        self.update(|s| s.access_token = Some(access_token.to_string()));
    }

    fn set_user(&self, user: serde_json::Value) {
        self.update(|s| s.user = Some(user));
    }

    fn clear(&self) {
        self.update(|s| *s = StoredSession::default());
    }
}

// =============================================================================
// FILE-BACKED STORE
// =============================================================================

/// JSON file store; the file is rewritten on every change and removed on clear
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cache: RwLock<StoredSession>,
}

impl FileTokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let session = read_session(&path);
        Self {
            path,
            cache: RwLock::new(session),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, apply: impl FnOnce(&mut StoredSession)) {
        let mut guard = self.cache.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut guard);
        if let Err(e) = write_session(&self.path, &guard) {
            tracing::error!(path = %self.path.display(), "Failed to persist session: {}", e);
        }
    }
}

fn read_session(path: &Path) -> StoredSession {
    match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "Discarding unreadable session file: {}", e);
            StoredSession::default()
        }),
        Err(_) => StoredSession::default(),
    }
}

fn write_session(path: &Path, session: &StoredSession) -> std::io::Result<()> {
    if *session == StoredSession::default() {
        return match fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        };
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(session)?;
    fs::write(path, raw)
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> StoredSession {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        self.update(|s| {
            s.access_token = Some(access_token.to_string());
            s.refresh_token = Some(refresh_token.to_string());
        });
    }

    fn set_access_token(&self, access_token: &str) {
        self.update(|s| s.access_token = Some(access_token.to_string()));
    }

    fn set_user(&self, user: serde_json::Value) {
        self.update(|s| s.user = Some(user));
    }

    fn clear(&self) {
        self.update(|s| *s = StoredSession::default());
    }
}
