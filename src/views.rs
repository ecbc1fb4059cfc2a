//! Plain-text screens for the terminal front-end.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::modules::access::{AccessLogPage, UserInside};
use crate::modules::admin::{Stats, UserPage};
use crate::modules::auth::schema::{AuthStatusDetail, FieldError};
use crate::modules::auth::User;
use crate::modules::guard::Restriction;
use crate::modules::qr::{format_mm_ss, DisplayState, LastScan, RefreshKind};
use crate::services::token_store::TokenPresence;

pub const LOADING: &str = "Loading...";

pub fn format_datetime(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn welcome(user: &User) -> String {
    format!(
        "Hello, {}!\n{}\nRole: {}",
        user.full_name(),
        user.role.welcome_message(),
        user.role.label()
    )
}

pub fn profile(user: &User, detail: Option<&AuthStatusDetail>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", user.initials(), user.full_name());
    let _ = writeln!(out, "Email:    {}", user.email);
    let _ = writeln!(out, "Role:     {}", user.role.label());
    if let Some(phone) = &user.phone {
        let _ = writeln!(out, "Phone:    {}", phone);
    }
    if let Some(address) = &user.address {
        let _ = writeln!(out, "Address:  {}", address);
    }
    if let Some(age) = user.age {
        let _ = writeln!(out, "Age:      {}", age);
    }
    if let Some(created) = &user.created_at {
        let _ = writeln!(out, "Member since {}", format_datetime(created));
    }
    let _ = writeln!(out, "Status:   {}", user.authorization.label());

    let info = detail
        .and_then(|d| d.authorization_info.as_deref())
        .or(user.authorization_info.as_deref());
    if let Some(info) = info {
        let _ = writeln!(out, "          {}", info);
    }
    if let Some(message) = detail.and_then(|d| d.message.as_deref()) {
        let _ = writeln!(out, "          {}", message);
    }
    out.trim_end().to_string()
}

pub fn pending_notice(user: &User) -> String {
    let mut out = format!(
        "Account pending authorization\n\nHello {}, your account was created but an administrator still has to authorize it.\nYou will be notified by email once you can use the system.\n\nName: {}\nEmail: {}\nRole: {}",
        user.name,
        user.full_name(),
        user.email,
        user.role.label()
    );
    if let Some(created) = &user.created_at {
        let _ = write!(out, "\nRequested: {}", format_datetime(created));
    }
    out
}

pub fn restricted(restriction: Restriction) -> String {
    format!("Access restricted\n{}", restriction.message())
}

pub fn field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn user_table(page: &UserPage) -> String {
    if page.users.is_empty() {
        return "No users found".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:<28} {:<32} {:<16} {}", "ID", "NAME", "EMAIL", "ROLE", "STATUS");
    for user in &page.users {
        let _ = writeln!(
            out,
            "{:<8} {:<28} {:<32} {:<16} {}",
            user.id,
            user.full_name(),
            user.email,
            user.role.label(),
            user.authorization.label()
        );
    }
    let _ = write!(
        out,
        "Page {} of {} ({} users)",
        page.page,
        page.total_pages.max(1),
        page.total
    );
    out
}

pub fn stats(stats: &Stats) -> String {
    let mut out = format!(
        "Total users:  {}\nAuthorized:   {}\nPending:      {}\nUnauthorized: {}",
        stats.users_total, stats.users_authorized, stats.users_pending, stats.users_unauthorized
    );
    if !stats.users_by_role.is_empty() {
        out.push_str("\nBy role:");
        for (role, count) in &stats.users_by_role {
            let label = role
                .parse::<crate::modules::auth::Role>()
                .map(|r| r.label().to_string())
                .unwrap_or_else(|_| role.clone());
            let _ = write!(out, "\n  {:<16} {}", label, count);
        }
    }
    out
}

pub fn access_logs(page: &AccessLogPage) -> String {
    let mut out = format!(
        "Entries: {}  Exits: {}  Inside: {}\n",
        page.total_entries, page.total_exits, page.currently_inside
    );
    if page.logs.is_empty() {
        out.push_str("No access records for this date");
        return out;
    }

    for log in &page.logs {
        let _ = write!(
            out,
            "\n{}  {:<5} {}",
            format_datetime(&log.timestamp),
            log.access_type.label(),
            log.user_name.as_deref().unwrap_or("-")
        );
        if let Some(email) = &log.user_email {
            let _ = write!(out, " <{}>", email);
        }
        if log.is_manual {
            out.push_str(" [manual]");
        }
        if let Some(notes) = &log.notes {
            let _ = write!(out, "\n    {}", notes);
        }
    }
    out
}

pub fn users_inside(users: &[UserInside]) -> String {
    if users.is_empty() {
        return "Nobody is inside right now".to_string();
    }

    let mut out = format!("{} inside", users.len());
    for user in users {
        let _ = write!(
            out,
            "\n{:<8} {:<28} {:<32} since {}",
            user.id,
            user.full_name(),
            user.email,
            format_datetime(&user.entry_time)
        );
    }
    out
}

pub fn qr_state(state: &DisplayState) -> String {
    if let Some(error) = &state.error {
        return format!("Could not show the access code: {}\nPress r to retry", error);
    }
    let Some(code) = &state.code else {
        return LOADING.to_string();
    };

    let refreshed = match state.last_refresh {
        Some(RefreshKind::Automatic) => " (renewed automatically)",
        Some(RefreshKind::Manual) => " (renewed)",
        _ => "",
    };
    let paused = if state.paused { " [paused]" } else { "" };
    format!(
        "Code: {}\nExpires in {}{}{}",
        code.code,
        format_mm_ss(state.remaining_secs),
        paused,
        refreshed
    )
}

pub fn last_scan(scan: &LastScan) -> String {
    let mut out = format!(
        "{} registered at {}\n{}",
        scan.access_type.label(),
        format_datetime(&scan.at),
        scan.message
    );
    if let Some(id) = &scan.access_log_id {
        let _ = write!(out, "\nRecord ID: {}", id);
    }
    out
}

pub fn token_presence(presence: &TokenPresence) -> String {
    format!(
        "Access token:  {}\nRefresh token: {}\nCached user:   {}",
        yes_no(presence.has_access_token),
        yes_no(presence.has_refresh_token),
        yes_no(presence.has_user_data)
    )
}
