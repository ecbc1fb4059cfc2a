use casa_del_sol::modules::access::AccessReport;
use casa_del_sol::modules::qr::AccessType;
use casa_del_sol::services::SystemClock;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

use crate::common::TestContext;

async fn admin_context() -> TestContext {
    let ctx = TestContext::new().await;
    ctx.sign_in_as_stored("admin-access", "admin-refresh");
    ctx.mock.lock().unwrap().inside = vec![
        json!({"id": 4, "email": "ana@example.com", "nombre_completo": "Ana", "apellidos": "Ruiz",
               "role": "personal", "entry_time": "2025-03-01T08:00:00", "entry_id": 1}),
        json!({"id": "5", "email": "leo@example.com", "nombre_completo": "Leo", "apellidos": "Paz",
               "entry_time": "2025-03-01T09:15:00Z"}),
    ];
    ctx
}

#[tokio::test]
async fn logs_are_loaded_for_the_selected_day() {
    let ctx = admin_context().await;
    let mut report = AccessReport::new(ctx.app.access(), Arc::new(SystemClock));
    report.query.date = NaiveDate::from_ymd_opt(2025, 3, 1);

    let page = report.load_logs().await.unwrap();

    assert_eq!(page.logs.len(), 2);
    assert_eq!(page.logs[0].access_type, AccessType::Entry);
    assert!(page.logs[1].is_manual);
    assert_eq!(page.total_entries, 1);
    assert!(!report.loading);

    let (_, query) = ctx.mock.lock().unwrap().query_log.last().cloned().unwrap();
    assert_eq!(query.get("date").map(String::as_str), Some("2025-03-01"));
    assert_eq!(query.get("per_page").map(String::as_str), Some("20"));
    ctx.cleanup();
}

#[tokio::test]
async fn users_inside_accept_numeric_and_string_ids() {
    let ctx = admin_context().await;
    let mut report = AccessReport::new(ctx.app.access(), Arc::new(SystemClock));

    let inside = report.load_inside().await.unwrap();

    let ids: Vec<&str> = inside.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["4", "5"]);
    assert_eq!(inside[0].full_name(), "Ana Ruiz");
    assert_eq!(inside[0].entry_time, Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap());
    assert_eq!(inside[1].entry_id, None);
    ctx.cleanup();
}

#[tokio::test]
async fn manual_exit_reloads_users_inside() {
    let ctx = admin_context().await;
    let mut report = AccessReport::new(ctx.app.access(), Arc::new(SystemClock));
    report.load_inside().await.unwrap();

    report.manual_exit("4", None).await.unwrap();

    assert_eq!(ctx.hits("users_inside"), 2);
    assert_eq!(report.inside.len(), 1);
    assert_eq!(report.inside[0].id, "5");

    let (id, action, body) = ctx.mock.lock().unwrap().actions[0].clone();
    assert_eq!((id.as_str(), action.as_str()), ("4", "manual-exit"));
    assert!(body["notes"]
        .as_str()
        .unwrap()
        .starts_with("Exit registered manually by an administrator"));
    ctx.cleanup();
}

#[tokio::test]
async fn manual_exit_keeps_custom_note() {
    let ctx = admin_context().await;
    let mut report = AccessReport::new(ctx.app.access(), Arc::new(SystemClock));

    report.manual_exit("5", Some("  Left with family  ")).await.unwrap();

    let (_, _, body) = ctx.mock.lock().unwrap().actions[0].clone();
    assert_eq!(body["notes"], "Left with family");
    ctx.cleanup();
}

#[tokio::test]
async fn failures_surface_a_readable_message() {
    let ctx = admin_context().await;
    ctx.mock.lock().unwrap().reject_all_access = true;
    let mut report = AccessReport::new(ctx.app.access(), Arc::new(SystemClock));

    let message = report.load_inside().await.unwrap_err();

    assert_eq!(message, "Your session has expired. Please sign in again.");
    assert!(report.inside.is_empty());
    ctx.cleanup();
}
