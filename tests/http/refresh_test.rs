use casa_del_sol::modules::guard::Route;
use casa_del_sol::services::{ApiError, ApiRequest, TokenStore};
use serde_json::Value;

use crate::common::TestContext;

#[tokio::test]
async fn expired_access_token_is_refreshed_and_replayed() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("old-access", "refresh-ok");
    ctx.mock.lock().unwrap().valid_access.remove("old-access");

    let profile: Value = ctx
        .app
        .api
        .get_json(ApiRequest::get("/profile"))
        .await
        .expect("replayed request should succeed");

    assert_eq!(profile["id"], 1);
    assert_eq!(ctx.hits("refresh"), 1);
    assert_eq!(ctx.hits("profile"), 2);
    let access = ctx.tokens.access_token().unwrap();
    assert_ne!(access, "old-access");
    assert_eq!(ctx.tokens.refresh_token().as_deref(), Some("refresh-ok"));
    assert!(ctx.app.navigator.last().is_none());
    ctx.cleanup();
}

#[tokio::test]
async fn second_rejection_ends_the_session() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("access-x", "refresh-x");
    ctx.mock.lock().unwrap().reject_all_access = true;

    let err = ctx
        .app
        .api
        .get_json::<Value>(ApiRequest::get("/profile"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(ctx.hits("refresh"), 1);
    assert_eq!(ctx.hits("profile"), 2);
    assert!(ctx.tokens.access_token().is_none());
    assert!(ctx.tokens.refresh_token().is_none());
    assert_eq!(ctx.app.navigator.last(), Some(Route::Home));
    ctx.cleanup();
}

#[tokio::test]
async fn missing_refresh_token_ends_the_session_without_refresh_call() {
    let ctx = TestContext::new().await;
    ctx.tokens.set_access_token("unknown-access");

    let err = ctx
        .app
        .api
        .get_json::<Value>(ApiRequest::get("/profile"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(ctx.hits("refresh"), 0);
    assert_eq!(ctx.hits("profile"), 1);
    assert_eq!(ctx.app.navigator.history(), vec![Route::Home]);
    ctx.cleanup();
}

#[tokio::test]
async fn concurrent_rejections_share_one_refresh() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("stale", "refresh-shared");
    ctx.mock.lock().unwrap().valid_access.remove("stale");

    let requests = (0..5).map(|_| ctx.app.api.get_json::<Value>(ApiRequest::get("/profile")));
    let results = futures::future::join_all(requests).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(ctx.hits("refresh"), 1);
    assert!(ctx.app.navigator.last().is_none());
    ctx.cleanup();
}

#[tokio::test]
async fn public_requests_never_refresh() {
    let ctx = TestContext::new().await;
    ctx.tokens.set_tokens("whatever", "refresh-unused");

    let health = ctx.app.system().health().await.expect("health is public");

    assert_eq!(health["status"], "ok");
    assert_eq!(ctx.hits("refresh"), 0);
    ctx.cleanup();
}
