use std::sync::Arc;

use super::schema::{PendingQuery, RejectRequest, SearchFilters, Stats, UnauthorizeRequest, UserPage};
use crate::services::http_client::{path_segment, BinaryResponse};
use crate::services::{ApiClient, ApiError, ApiRequest};

/// REST calls of the administration backend
pub struct AdminApi {
    api: Arc<ApiClient>,
}

impl AdminApi {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn pending_users(&self, query: PendingQuery) -> Result<UserPage, ApiError> {
        let request = ApiRequest::get("/admin/users/pending")
            .query("page", query.page)
            .query("per_page", query.per_page)
            .query_opt("role", query.role);
        self.api.get_json(request).await
    }

    pub async fn search_users(&self, filters: &SearchFilters) -> Result<UserPage, ApiError> {
        let request = ApiRequest::get("/admin/users/search")
            .query_opt("category", filters.category)
            .query_opt("search", filters.search.as_deref())
            .query("page", filters.page)
            .query("per_page", filters.per_page)
            .query_opt("include_pending", filters.include_pending);

        let page: UserPage = self.api.get_json(request).await?;
        tracing::debug!(shown = page.users.len(), total = page.total, "User search loaded");
        Ok(page)
    }

    pub async fn authorize(&self, user_id: &str) -> Result<serde_json::Value, ApiError> {
        self.action(user_id, "authorize", None).await
    }

    /// Deletes a pending registration
    pub async fn reject(&self, user_id: &str, reason: Option<&str>) -> Result<serde_json::Value, ApiError> {
        let body = serde_json::to_value(RejectRequest { reason }).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.action(user_id, "reject", Some(body)).await
    }

    pub async fn unauthorize(&self, user_id: &str, reason: &str) -> Result<serde_json::Value, ApiError> {
        let body =
            serde_json::to_value(UnauthorizeRequest { reason }).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.action(user_id, "unauthorize", Some(body)).await
    }

    pub async fn reauthorize(&self, user_id: &str) -> Result<serde_json::Value, ApiError> {
        self.action(user_id, "reauthorize", None).await
    }

    async fn action(
        &self,
        user_id: &str,
        action: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ApiError> {
        let mut request = ApiRequest::post(format!("/admin/users/{}/{}", path_segment(user_id)?, action));
        if let Some(body) = body {
            request = request.json(&body)?;
        }
        let response = self.api.post_json(request).await?;
        tracing::info!(user_id, action, "Admin action applied");
        Ok(response)
    }

    /// Identification image bytes; older backends only serve `/identification`
    pub async fn identification(&self, user_id: &str) -> Result<BinaryResponse, ApiError> {
        let user_id = path_segment(user_id)?;
        let file = ApiRequest::get(format!("/admin/users/{}/identification-file", user_id));
        match self.api.get_bytes(file).await {
            Err(e) if e.status() == Some(404) => {
                tracing::debug!(user_id, "identification-file missing, trying legacy endpoint");
                let legacy = ApiRequest::get(format!("/admin/users/{}/identification", user_id));
                self.api.get_bytes(legacy).await
            }
            other => other,
        }
    }

    pub async fn stats(&self) -> Result<Stats, ApiError> {
        self.api.get_json(ApiRequest::get("/admin/stats")).await
    }
}
