use std::sync::Arc;

use super::crud::{
    default_exit_note, AccessApi, INSIDE_FAILED_MESSAGE, LOGS_FAILED_MESSAGE, MANUAL_EXIT_FAILED_MESSAGE,
};
use super::schema::{AccessLogPage, AccessLogQuery, UserInside};
use crate::services::Clock;

/// Access-management screen state: the log page for one day and who is inside.
///
/// Nothing is patched locally; a manual exit is followed by a full reload of
/// the users inside.
pub struct AccessReport {
    api: AccessApi,
    clock: Arc<dyn Clock>,
    pub query: AccessLogQuery,
    pub logs: Option<AccessLogPage>,
    pub inside: Vec<UserInside>,
    pub loading: bool,
}

impl AccessReport {
    pub fn new(api: AccessApi, clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date_naive();
        Self {
            api,
            clock,
            query: AccessLogQuery {
                date: Some(today),
                page: 1,
                per_page: 20,
            },
            logs: None,
            inside: Vec::new(),
            loading: false,
        }
    }

    pub async fn load_logs(&mut self) -> Result<&AccessLogPage, String> {
        self.loading = true;
        let result = self.api.logs(self.query).await;
        self.loading = false;

        match result {
            Ok(page) => Ok(&*self.logs.insert(page)),
            Err(e) => {
                tracing::warn!("Access logs unavailable: {}", e);
                Err(e.user_message(LOGS_FAILED_MESSAGE))
            }
        }
    }

    pub async fn load_inside(&mut self) -> Result<&[UserInside], String> {
        self.loading = true;
        let result = self.api.users_inside().await;
        self.loading = false;

        match result {
            Ok(users) => {
                self.inside = users;
                Ok(self.inside.as_slice())
            }
            Err(e) => {
                tracing::warn!("Users inside unavailable: {}", e);
                Err(e.user_message(INSIDE_FAILED_MESSAGE))
            }
        }
    }

    /// Registers an exit on behalf of a user and reloads who is inside
    pub async fn manual_exit(&mut self, user_id: &str, notes: Option<&str>) -> Result<(), String> {
        let note = match notes {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => default_exit_note(self.clock.now()),
        };

        self.api
            .manual_exit(user_id, Some(&note))
            .await
            .map_err(|e| e.user_message(MANUAL_EXIT_FAILED_MESSAGE))?;

        self.load_inside().await.map(|_| ())
    }
}
