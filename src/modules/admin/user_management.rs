use super::crud::AdminApi;
use super::interface::{AdminError, Result};
use super::schema::{
    PendingQuery, RejectCheck, SearchFilters, Stats, UserPage, UNAUTHORIZE_REASON_MAX, UNAUTHORIZE_REASON_MIN,
};
use crate::modules::auth::{AuthorizationStatus, Role, User};

const LOOKUP_PAGE_SIZE: u32 = 100;

/// Client-side mirror of the backend's delete rules.
///
/// Only pending, non-admin users may be rejected. The backend validates again;
/// this only saves a round trip and explains the alternative.
pub fn check_reject(user: &User) -> RejectCheck {
    let mut reasons = Vec::new();

    match user.authorization {
        AuthorizationStatus::Authorized => reasons.push("User is authorized".to_string()),
        AuthorizationStatus::Unauthorized => {
            reasons.push("User is unauthorized (use reauthorize)".to_string())
        }
        AuthorizationStatus::Pending => {}
    }
    if user.role == Role::Admin {
        reasons.push("User is a system administrator".to_string());
    }

    let allowed = reasons.is_empty();
    let recommendation = match (allowed, user.authorization) {
        (true, _) => "Proceed with the deletion",
        (false, AuthorizationStatus::Authorized) => "Use unauthorize instead of deleting",
        (false, AuthorizationStatus::Unauthorized) => "Use reauthorize to restore access",
        (false, AuthorizationStatus::Pending) => "This user cannot be deleted",
    };

    RejectCheck {
        allowed,
        reasons,
        recommendation: recommendation.to_string(),
    }
}

/// Reason collected before unauthorizing a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizeDraft {
    pub user_id: String,
    pub user_name: String,
    reason: String,
}

impl UnauthorizeDraft {
    pub fn new(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            user_name: user.full_name(),
            reason: String::new(),
        }
    }

    pub fn set_reason(&mut self, reason: &str) {
        self.reason = reason.to_string();
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Characters counted against the limits, ignoring surrounding whitespace
    pub fn len(&self) -> usize {
        self.reason.trim().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn can_submit(&self) -> bool {
        self.checked_reason().is_ok()
    }

    pub fn checked_reason(&self) -> Result<&str> {
        match self.len() {
            n if n < UNAUTHORIZE_REASON_MIN => Err(AdminError::ReasonTooShort),
            n if n > UNAUTHORIZE_REASON_MAX => Err(AdminError::ReasonTooLong),
            _ => Ok(self.reason.trim()),
        }
    }
}

/// User administration screen state.
///
/// Every action is one REST call followed by a full reload of the current
/// listing; the list is never patched locally.
pub struct UserManagement {
    api: AdminApi,
    pub filters: SearchFilters,
    pub page: Option<UserPage>,
    pub loading: bool,
}

impl UserManagement {
    pub fn new(api: AdminApi) -> Self {
        Self {
            api,
            filters: SearchFilters::default(),
            page: None,
            loading: false,
        }
    }

    pub fn api(&self) -> &AdminApi {
        &self.api
    }

    pub async fn reload(&mut self) -> Result<&UserPage> {
        self.loading = true;
        let result = self.api.search_users(&self.filters).await;
        self.loading = false;

        let page = result?;
        Ok(&*self.page.insert(page))
    }

    pub async fn apply_filters(&mut self, filters: SearchFilters) -> Result<&UserPage> {
        self.filters = filters;
        self.reload().await
    }

    /// Looks a user up by id across every page of the unfiltered listing.
    /// The current listing and filters are left untouched.
    pub async fn find_user(&self, user_id: &str) -> Result<Option<User>> {
        let mut filters = SearchFilters {
            per_page: LOOKUP_PAGE_SIZE,
            ..SearchFilters::default()
        };

        loop {
            let page = self.api.search_users(&filters).await?;
            if let Some(user) = page.users.into_iter().find(|u| u.id == user_id) {
                return Ok(Some(user));
            }
            if filters.page >= page.total_pages {
                return Ok(None);
            }
            let next_page = filters.page + 1;
            filters = filters.with_page(next_page);
        }
    }

    pub async fn pending(&self, query: PendingQuery) -> Result<UserPage> {
        Ok(self.api.pending_users(query).await?)
    }

    pub async fn stats(&self) -> Result<Stats> {
        Ok(self.api.stats().await?)
    }

    pub async fn authorize(&mut self, user_id: &str) -> Result<()> {
        self.api.authorize(user_id).await?;
        self.reload().await.map(|_| ())
    }

    /// Rejects a pending user; blocked users never reach the network
    pub async fn reject(&mut self, user: &User, reason: Option<&str>) -> Result<()> {
        let check = check_reject(user);
        if !check.allowed {
            tracing::info!(user_id = %user.id, reasons = ?check.reasons, "Reject blocked");
            return Err(AdminError::RejectBlocked {
                reasons: check.reasons,
                recommendation: check.recommendation,
            });
        }

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        self.api.reject(&user.id, reason).await?;
        self.reload().await.map(|_| ())
    }

    pub fn begin_unauthorize(&self, user: &User) -> UnauthorizeDraft {
        UnauthorizeDraft::new(user)
    }

    pub async fn unauthorize(&mut self, draft: &UnauthorizeDraft) -> Result<()> {
        let reason = draft.checked_reason()?;
        self.api.unauthorize(&draft.user_id, reason).await?;
        self.reload().await.map(|_| ())
    }

    pub async fn reauthorize(&mut self, user_id: &str) -> Result<()> {
        self.api.reauthorize(user_id).await?;
        self.reload().await.map(|_| ())
    }
}
