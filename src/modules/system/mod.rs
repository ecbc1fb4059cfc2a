use std::sync::Arc;

use crate::services::token_store::TokenPresence;
use crate::services::{ApiClient, ApiError, ApiRequest};

/// Liveness and local diagnostics
pub struct SystemApi {
    api: Arc<ApiClient>,
}

impl SystemApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Raw body of GET /health
    pub async fn health(&self) -> Result<serde_json::Value, ApiError> {
        let response = self.api.send_public(ApiRequest::get("/health")).await?;
        Ok(response.json().await.unwrap_or(serde_json::Value::Null))
    }

    pub async fn test_connection(&self) -> bool {
        match self.health().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(base_url = %self.api.base_url(), "Backend unreachable: {}", e);
                false
            }
        }
    }

    /// Which parts of the stored session exist; values themselves are never exposed
    pub fn token_presence(&self) -> TokenPresence {
        self.api.tokens().presence()
    }
}
