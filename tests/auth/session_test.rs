use casa_del_sol::modules::auth::SessionService;
use casa_del_sol::modules::guard::{GuardOutcome, Route};
use casa_del_sol::modules::qr::{NoCamera, QrScanner, ScanError};
use casa_del_sol::services::{ApiError, SystemClock, TokenStore};
use std::sync::Arc;

use crate::common::{user_json, TestContext, PASSWORD};

#[tokio::test]
async fn guard_shows_loading_before_bootstrap() {
    let ctx = TestContext::new().await;

    assert!(ctx.app.session.current().loading);
    assert_eq!(ctx.app.guard(Route::Welcome), GuardOutcome::ShowLoading);
    assert_eq!(ctx.app.guard(Route::Home), GuardOutcome::ShowLoading);
    ctx.cleanup();
}

#[tokio::test]
async fn bootstrap_without_tokens_is_signed_out() {
    let ctx = TestContext::new().await;

    let snapshot = ctx.app.session.initialize().await;

    assert!(!snapshot.authenticated);
    assert!(!snapshot.loading);
    assert_eq!(ctx.total_hits(), 0);
    ctx.cleanup();
}

#[tokio::test]
async fn bootstrap_fetches_profile_when_no_user_cached() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("stored-access", "stored-refresh");

    let snapshot = ctx.app.session.initialize().await;

    assert!(snapshot.authenticated);
    assert_eq!(snapshot.user.map(|u| u.id), Some("1".to_string()));
    assert_eq!(ctx.hits("profile"), 1);
    assert!(ctx.tokens.cached_user().is_some());
    ctx.cleanup();
}

#[tokio::test]
async fn bootstrap_prefers_cached_user() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("stored-access", "stored-refresh");
    ctx.tokens.set_user(user_json("8", "donantes", Some("authorized")));

    let snapshot = ctx.app.session.initialize().await;

    assert!(snapshot.authenticated);
    assert_eq!(snapshot.user.map(|u| u.id), Some("8".to_string()));
    assert_eq!(ctx.hits("profile"), 0);
    ctx.cleanup();
}

#[tokio::test]
async fn bootstrap_failure_clears_stored_session() {
    let ctx = TestContext::new().await;
    ctx.tokens.set_tokens("revoked-access", "revoked-refresh");

    let snapshot = ctx.app.session.initialize().await;

    assert!(!snapshot.authenticated);
    assert!(!snapshot.loading);
    assert!(ctx.tokens.access_token().is_none());
    assert!(ctx.tokens.refresh_token().is_none());
    assert_eq!(ctx.hits("refresh"), 1);
    assert_eq!(ctx.app.navigator.last(), Some(Route::Home));
    ctx.cleanup();
}

#[tokio::test]
async fn state_changes_are_published() {
    let ctx = TestContext::new().await;
    ctx.app.session.initialize().await;
    let mut changes = ctx.app.session.on_change();
    changes.mark_unchanged();

    ctx.app
        .session
        .login("user1@example.com", PASSWORD)
        .await
        .unwrap();

    assert!(changes.has_changed().unwrap());
    assert!(changes.borrow_and_update().authenticated);
    ctx.cleanup();
}

#[tokio::test]
async fn revoked_session_is_reconciled_by_guard() {
    let ctx = TestContext::new().await;
    ctx.app.session.initialize().await;
    ctx.app
        .session
        .login("user1@example.com", PASSWORD)
        .await
        .unwrap();

    // Another component ended the session behind the screen's back
    ctx.app.api.end_session();

    assert_eq!(ctx.app.guard(Route::Profile), GuardOutcome::Redirect(Route::Home));
    assert!(!ctx.app.session.current().authenticated);
    ctx.cleanup();
}

#[tokio::test]
async fn refresh_profile_picks_up_new_status() {
    let ctx = TestContext::new().await;
    ctx.set_profile(user_json("1", "visitas", Some("pending")));
    ctx.app.session.initialize().await;
    ctx.app
        .session
        .login("user1@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(ctx.app.guard(Route::QrScanner), GuardOutcome::ShowPending);

    ctx.set_profile(user_json("1", "visitas", Some("authorized")));
    ctx.app.session.refresh_profile().await.unwrap();

    assert_eq!(ctx.app.guard(Route::QrScanner), GuardOutcome::Render);
    ctx.cleanup();
}

#[tokio::test]
async fn failed_refresh_signs_the_session_out() {
    let ctx = TestContext::new().await;
    ctx.app.session.initialize().await;
    ctx.app
        .session
        .login("user1@example.com", PASSWORD)
        .await
        .unwrap();
    assert!(ctx.app.session.current().can_access_qr());

    let mut changes = ctx.app.session.on_change();
    changes.mark_unchanged();
    ctx.mock.lock().unwrap().reject_all_access = true;

    let scanner = QrScanner::new(Arc::new(ctx.app.qr()), Arc::new(NoCamera), Arc::new(SystemClock));
    let err = scanner.submit_code("abc").await.unwrap_err();

    assert!(matches!(err, ScanError::Api(ApiError::SessionExpired)));
    assert!(changes.has_changed().unwrap());
    let snapshot = changes.borrow_and_update().clone();
    assert!(!snapshot.authenticated);
    assert!(!snapshot.can_access_qr());
    assert!(snapshot.user.is_none());
    assert!(ctx.tokens.access_token().is_none());
    assert_eq!(ctx.app.navigator.last(), Some(Route::Home));
    ctx.cleanup();
}
