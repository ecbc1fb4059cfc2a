use async_trait::async_trait;
use tokio::sync::watch;

use super::model::User;
use super::schema::FieldError;
use super::session::SessionSnapshot;
use crate::services::ApiError;

pub type Result<T> = std::result::Result<T, AuthError>;

// =============================================================================
// SERVICE TRAITS
// =============================================================================

/// Narrow view of the session used by screens and guards
#[async_trait]
pub trait SessionService: Send + Sync {
    fn current(&self) -> SessionSnapshot;
    async fn login(&self, email: &str, password: &str) -> Result<User>;
    fn logout(&self);
    fn on_change(&self) -> watch::Receiver<SessionSnapshot>;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Registration form is invalid")]
    InvalidRegistration(Vec<FieldError>),

    #[error("Invalid registration payload: {0}")]
    Payload(String),
}

impl AuthError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(e) => e.user_message(fallback),
            Self::InvalidRegistration(errors) => errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Self::Payload(e) => e.clone(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unauthorized())
    }
}
