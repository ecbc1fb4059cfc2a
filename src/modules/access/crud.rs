use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::schema::{AccessLogPage, AccessLogQuery, ManualExitRequest, UserInside};
use crate::services::http_client::path_segment;
use crate::services::{ApiClient, ApiError, ApiRequest};

pub const LOGS_FAILED_MESSAGE: &str = "Error loading the access logs";
pub const INSIDE_FAILED_MESSAGE: &str = "Error loading the users inside";
pub const MANUAL_EXIT_FAILED_MESSAGE: &str = "Error registering the exit";

/// Note attached to exits registered by an administrator
pub fn default_exit_note(at: DateTime<Utc>) -> String {
    format!(
        "Exit registered manually by an administrator - {}",
        at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Access reporting endpoints; all of them use the longer report timeout
pub struct AccessApi {
    api: Arc<ApiClient>,
    timeout: Duration,
}

impl AccessApi {
    pub fn new(api: Arc<ApiClient>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    pub async fn logs(&self, query: AccessLogQuery) -> Result<AccessLogPage, ApiError> {
        let request = ApiRequest::get("/admin/access-logs")
            .query("page", query.page)
            .query("per_page", query.per_page)
            .query_opt("date", query.date.map(|d| d.format("%Y-%m-%d")))
            .timeout(self.timeout);

        let page: AccessLogPage = self.api.get_json(request).await?;
        tracing::debug!(logs = page.logs.len(), "Access logs loaded");
        Ok(page)
    }

    pub async fn users_inside(&self) -> Result<Vec<UserInside>, ApiError> {
        let request = ApiRequest::get("/admin/users-inside").timeout(self.timeout);
        self.api.get_json(request).await
    }

    pub async fn manual_exit(&self, user_id: &str, notes: Option<&str>) -> Result<serde_json::Value, ApiError> {
        let request = ApiRequest::post(format!("/admin/users/{}/manual-exit", path_segment(user_id)?))
            .json(&ManualExitRequest { notes })?
            .timeout(self.timeout);

        let response = self.api.post_json(request).await?;
        tracing::info!(user_id, "Manual exit registered");
        Ok(response)
    }
}
