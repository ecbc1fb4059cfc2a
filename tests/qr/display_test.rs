use casa_del_sol::modules::qr::{DisplayEvent, QrDisplay, RefreshKind, Visibility};
use casa_del_sol::services::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::common::TestContext;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn display_shows_backend_code_with_countdown() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("admin-access", "admin-refresh");
    let (_visibility_tx, visibility) = watch::channel(Visibility::Visible);

    let mut handle = QrDisplay::new(Arc::new(ctx.app.qr()), Arc::new(SystemClock)).spawn(visibility);

    let first = timeout(WAIT, handle.next_event()).await.unwrap();
    assert_eq!(first, Some(DisplayEvent::Refreshed(RefreshKind::Initial)));

    let state = handle.state();
    let code = state.code.expect("code is shown");
    assert_eq!(code.code, "QR-CURRENT");
    assert!(code.image_png_bytes().unwrap().is_some());
    assert!((295..=300).contains(&state.remaining_secs));
    assert!(state.error.is_none());

    handle.stop().await;
    ctx.cleanup();
}

#[tokio::test]
async fn failed_fetch_can_be_retried() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("admin-access", "admin-refresh");
    ctx.mock.lock().unwrap().fail_qr = true;
    let (_visibility_tx, visibility) = watch::channel(Visibility::Visible);

    let mut handle = QrDisplay::new(Arc::new(ctx.app.qr()), Arc::new(SystemClock)).spawn(visibility);

    let failed = timeout(WAIT, handle.next_event()).await.unwrap();
    assert!(matches!(
        failed,
        Some(DisplayEvent::FetchFailed {
            kind: RefreshKind::Initial,
            ..
        })
    ));
    assert!(handle.state().code.is_none());
    assert!(handle.state().error.is_some());

    ctx.mock.lock().unwrap().fail_qr = false;
    handle.refresh().await;

    loop {
        let event = timeout(WAIT, handle.next_event()).await.unwrap();
        if event == Some(DisplayEvent::Refreshed(RefreshKind::Manual)) {
            break;
        }
    }
    assert!(handle.state().error.is_none());
    assert_eq!(ctx.hits("qr_current"), 2);

    handle.stop().await;
    ctx.cleanup();
}
