use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::modules::auth::{Role, User};

pub const UNAUTHORIZE_REASON_MIN: usize = 10;
pub const UNAUTHORIZE_REASON_MAX: usize = 500;

// =============================================================================
// LISTINGS
// =============================================================================

/// Paginated user listing returned by /admin/users/pending and /admin/users/search
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

/// Query of GET /admin/users/pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingQuery {
    pub page: u32,
    pub per_page: u32,
    pub role: Option<Role>,
}

impl Default for PendingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            role: None,
        }
    }
}

/// Query of GET /admin/users/search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilters {
    /// Role filter
    pub category: Option<Role>,
    /// Free text over name and email
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
    pub include_pending: Option<bool>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            page: 1,
            per_page: 20,
            include_pending: Some(true),
        }
    }
}

impl SearchFilters {
    /// Changing any filter other than the page starts over at page one
    pub fn with_category(mut self, category: Option<Role>) -> Self {
        self.category = category;
        self.page = 1;
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self.page = 1;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }
}

// =============================================================================
// STATS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub users_total: u64,
    #[serde(default)]
    pub users_authorized: u64,
    #[serde(default)]
    pub users_pending: u64,
    #[serde(default)]
    pub users_unauthorized: u64,
    #[serde(default)]
    pub users_by_role: BTreeMap<String, u64>,
}

// =============================================================================
// ACTIONS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RejectRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UnauthorizeRequest<'a> {
    pub reason: &'a str,
}

/// Whether a user may be rejected (deleted), and why not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectCheck {
    pub allowed: bool,
    pub reasons: Vec<String>,
    pub recommendation: String,
}
