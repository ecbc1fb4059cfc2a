use casa_del_sol::modules::qr::{AccessType, CaptureMode, NoCamera, QrScanner, ScanError};
use casa_del_sol::services::SystemClock;
use std::sync::Arc;

use crate::common::TestContext;

fn scanner(ctx: &TestContext) -> QrScanner {
    QrScanner::new(Arc::new(ctx.app.qr()), Arc::new(NoCamera), Arc::new(SystemClock))
}

#[tokio::test]
async fn manual_entry_registers_an_exit() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("a", "r");
    let scanner = scanner(&ctx);
    assert_eq!(scanner.choose_mode(CaptureMode::Camera).await, CaptureMode::Manual);

    scanner.set_access_type(AccessType::Exit);
    scanner.set_input("  QR-CURRENT ");
    assert!(scanner.can_submit());
    let scan = scanner.submit_input().await.unwrap();

    assert_eq!(scan.access_type, AccessType::Exit);
    assert_eq!(scan.message, "exit registrada");
    assert_eq!(scan.access_log_id.as_deref(), Some("99"));
    assert_eq!(scanner.input(), "");
    assert!(!scanner.is_submitting());
    assert_eq!(scanner.last_scan(), Some(scan));

    let sent = ctx.mock.lock().unwrap().scans[0].clone();
    assert_eq!(sent["qr_code"], "QR-CURRENT");
    assert_eq!(sent["access_type"], "exit");
    ctx.cleanup();
}

#[tokio::test]
async fn backend_rejection_detail_is_shown_verbatim() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("a", "r");
    let scanner = scanner(&ctx);
    scanner.set_input("expired");

    let err = scanner.submit_input().await.unwrap_err();

    assert_eq!(err.user_message(), "El código QR ha expirado");
    assert_eq!(scanner.input(), "expired");
    assert!(scanner.last_scan().is_none());
    assert!(!scanner.is_submitting());
    ctx.cleanup();
}

#[tokio::test]
async fn empty_code_is_not_sent() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("a", "r");
    let scanner = scanner(&ctx);
    scanner.set_input("   ");

    assert!(!scanner.can_submit());
    let err = scanner.submit_input().await.unwrap_err();

    assert!(matches!(err, ScanError::EmptyCode));
    assert_eq!(ctx.hits("qr_scan"), 0);
    ctx.cleanup();
}

#[tokio::test]
async fn camera_scan_without_camera_falls_back_to_manual() {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("a", "r");
    let scanner = scanner(&ctx);

    let err = scanner
        .scan_with_camera(std::future::pending::<()>())
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Camera(_)));
    assert_eq!(scanner.mode(), CaptureMode::Manual);
    assert_eq!(ctx.hits("qr_scan"), 0);
    ctx.cleanup();
}
