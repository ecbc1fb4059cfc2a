use crate::services::ApiError;

use super::schema::{UNAUTHORIZE_REASON_MAX, UNAUTHORIZE_REASON_MIN};

pub type Result<T> = std::result::Result<T, AdminError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("User cannot be rejected: {}", .reasons.join(", "))]
    RejectBlocked {
        reasons: Vec<String>,
        recommendation: String,
    },

    #[error("Reason must be at least {} characters", UNAUTHORIZE_REASON_MIN)]
    ReasonTooShort,

    #[error("Reason must be at most {} characters", UNAUTHORIZE_REASON_MAX)]
    ReasonTooLong,

    #[error("Could not store the identification image: {0}")]
    Storage(String),
}

impl AdminError {
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api(e) => e.user_message(fallback),
            Self::RejectBlocked {
                reasons,
                recommendation,
            } => format!(
                "Cannot delete this user: {}. Recommendation: {}",
                reasons.join(", "),
                recommendation
            ),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unauthorized())
    }
}
