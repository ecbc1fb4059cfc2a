use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::auth::model::{deserialize_id, Role};
use crate::modules::qr::AccessType;
use crate::services::timestamp;

// =============================================================================
// ACCESS LOGS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccessLog {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    pub access_type: AccessType,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Response of GET /admin/access-logs
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AccessLogPage {
    #[serde(default)]
    pub logs: Vec<AccessLog>,
    #[serde(default)]
    pub total_entries: u64,
    #[serde(default)]
    pub total_exits: u64,
    #[serde(default)]
    pub currently_inside: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Query of GET /admin/access-logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessLogQuery {
    /// Sent as YYYY-MM-DD
    pub date: Option<NaiveDate>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for AccessLogQuery {
    fn default() -> Self {
        Self {
            date: None,
            page: 1,
            per_page: 50,
        }
    }
}

// =============================================================================
// USERS INSIDE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInside {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "nombre_completo", default)]
    pub name: String,
    #[serde(rename = "apellidos", default)]
    pub surname: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub entry_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub entry_id: Option<String>,
}

impl UserInside {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }
}

/// Body of POST /admin/users/{id}/manual-exit
#[derive(Debug, Serialize)]
pub struct ManualExitRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_id")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}
