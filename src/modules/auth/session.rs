use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use super::crud::AuthApi;
use super::interface::{AuthError, Result, SessionService};
use super::model::{AuthorizationStatus, User};
use super::schema::{AuthStatusDetail, RegisterForm, RegistrationOutcome};
use crate::services::TokenStore;

/// Point-in-time view of who is signed in
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub authenticated: bool,
    pub loading: bool,
    pub status_detail: Option<AuthStatusDetail>,
}

impl SessionSnapshot {
    pub fn signed_out() -> Self {
        Self {
            user: None,
            authenticated: false,
            loading: false,
            status_detail: None,
        }
    }

    fn bootstrapping() -> Self {
        Self {
            loading: true,
            ..Self::signed_out()
        }
    }

    pub fn authorization(&self) -> Option<AuthorizationStatus> {
        self.user.as_ref().map(|u| u.authorization)
    }

    pub fn is_pending(&self) -> bool {
        self.authorization() == Some(AuthorizationStatus::Pending)
    }

    pub fn is_authorized(&self) -> bool {
        self.authorization() == Some(AuthorizationStatus::Authorized)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.authorization() == Some(AuthorizationStatus::Unauthorized)
    }

    pub fn can_access_qr(&self) -> bool {
        self.is_authorized()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map(User::is_admin).unwrap_or(false)
    }
}

/// Single source of truth for identity and authorization.
///
/// Starts in the loading state; `initialize` must run once before guards can
/// decide anything. Every state change is published to `on_change` receivers,
/// including sessions ended by the HTTP client after a failed refresh.
pub struct AuthSession {
    api: AuthApi,
    tokens: Arc<dyn TokenStore>,
    state: Arc<watch::Sender<SessionSnapshot>>,
}

impl AuthSession {
    pub fn new(api: AuthApi, tokens: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::bootstrapping());
        let state = Arc::new(state);

        let ended = state.clone();
        api.client().on_session_end(move || {
            let signed_out = SessionSnapshot::signed_out();
            let changed = ended.send_if_modified(|s| {
                if *s == signed_out {
                    return false;
                }
                *s = signed_out;
                true
            });
            if changed {
                tracing::info!("Session ended by the API client");
            }
        });

        Self { api, tokens, state }
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.state.send_replace(snapshot);
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_modify(|s| s.loading = loading);
    }

    fn sign_in(&self, user: User, status_detail: Option<AuthStatusDetail>) {
        self.publish(SessionSnapshot {
            user: Some(user),
            authenticated: true,
            loading: false,
            status_detail,
        });
    }

    /// Restores the session from the token store
    pub async fn initialize(&self) -> SessionSnapshot {
        self.set_loading(true);

        match self.bootstrap().await {
            Ok(Some(user)) => {
                tracing::info!(user_id = %user.id, "Session restored");
                self.sign_in(user, None);
            }
            Ok(None) => self.publish(SessionSnapshot::signed_out()),
            Err(e) => {
                tracing::warn!("Session bootstrap failed, clearing stored session: {}", e);
                self.tokens.clear();
                self.publish(SessionSnapshot::signed_out());
            }
        }

        self.current()
    }

    async fn bootstrap(&self) -> Result<Option<User>> {
        if self.tokens.access_token().is_none() {
            return Ok(None);
        }

        if let Some(cached) = self.tokens.cached_user() {
            match serde_json::from_value::<User>(cached) {
                Ok(user) => return Ok(Some(user)),
                Err(e) => tracing::warn!("Cached user unreadable, fetching profile: {}", e),
            }
        }

        self.api.profile().await.map(Some)
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<(User, Option<AuthStatusDetail>)> {
        self.api.login(email, password).await?;

        let user = match self.api.profile().await {
            Ok(user) => user,
            Err(e) => {
                self.tokens.clear();
                return Err(e);
            }
        };

        let detail = match self.api.auth_status().await {
            Ok(detail) => Some(detail),
            Err(e) => {
                tracing::warn!("Authorization status unavailable: {}", e);
                None
            }
        };

        Ok((user, detail))
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<RegistrationOutcome> {
        if let Err(errors) = form.check() {
            return Err(AuthError::InvalidRegistration(errors));
        }

        self.set_loading(true);
        let outcome = self.api.register(form).await;
        self.set_loading(false);

        match &outcome {
            Ok(_) => tracing::info!(email = %form.email, "Registration submitted"),
            Err(e) => tracing::warn!("Registration failed: {}", e),
        }
        outcome
    }

    /// Re-fetches the profile; a rejected session signs the user out
    pub async fn refresh_profile(&self) -> Result<User> {
        match self.api.profile().await {
            Ok(user) => {
                let detail = self.current().status_detail;
                self.sign_in(user.clone(), detail);
                Ok(user)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.logout();
                }
                Err(e)
            }
        }
    }

    pub async fn check_auth_status(&self) -> Result<AuthStatusDetail> {
        match self.api.auth_status().await {
            Ok(detail) => {
                self.state
                    .send_modify(|s| s.status_detail = Some(detail.clone()));
                Ok(detail)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.logout();
                }
                Err(e)
            }
        }
    }

    /// Brings the published state in line with the token store after another
    /// component ended the session
    pub fn reconcile(&self) {
        let current = self.current();
        if current.authenticated && self.tokens.access_token().is_none() {
            tracing::info!("Stored session disappeared, signing out");
            self.publish(SessionSnapshot::signed_out());
        }
    }
}

#[async_trait]
impl SessionService for AuthSession {
    fn current(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.set_loading(true);

        match self.try_login(email, password).await {
            Ok((user, detail)) => {
                tracing::info!(user_id = %user.id, "Signed in");
                self.sign_in(user.clone(), detail);
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                self.set_loading(false);
                Err(e)
            }
        }
    }

    fn logout(&self) {
        self.tokens.clear();
        self.publish(SessionSnapshot::signed_out());
        tracing::info!("Signed out");
    }

    fn on_change(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }
}
