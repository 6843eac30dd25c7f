//! Integration tests for scheduled batch runs
//!
//! Pause flag, per-target failure isolation, the idempotent marker and
//! bounded re-delivery, against a mock Z-API gateway.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use condozap::models::{
    ItemStatus, JobRunResult, JobStatus, JobSummary, NotificationType, TriggerType,
};
use condozap::services::{DeliveryService, JobService, TargetService};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

async fn zapi_server(status: u16) -> MockServer {
    let server = MockServer::start().await;
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({"zaapId": "ZAAP-1", "messageId": "MSG-1"}))
    } else {
        ResponseTemplate::new(status).set_body_json(json!({"error": "instance disconnected"}))
    };
    Mock::given(method("POST"))
        .and(path("/instances/INST/token/test-api-key/send-text"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

fn finished(result: JobRunResult) -> JobSummary {
    match result {
        JobRunResult::Finished(summary) => summary,
        JobRunResult::Paused { .. } => panic!("expected a finished run"),
    }
}

async fn reminder_logs(pool: &sqlx::PgPool) -> Vec<condozap::models::JobExecutionLog> {
    JobService::list_logs(pool, "party_hall_reminder_job", 20)
        .await
        .expect("Failed to list job logs")
}

// =============================================================================
// Pause flag
// =============================================================================

#[actix_web::test]
async fn test_paused_run_is_skipped_without_deliveries() {
    let db = TestDb::new().await;
    let server = zapi_server(200).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let booking_id = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;

    JobService::set_paused(&db.pool, "party_hall_reminder_job", true)
        .await
        .unwrap();

    let result = runner(&db.pool)
        .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Scheduled)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"success": true, "message": "Function is paused"})
    );
    assert_eq!(delivery_count(&db.pool, booking_id).await, 0);
    assert_eq!(reminder_marker(&db.pool, booking_id).await, None);

    let logs = reminder_logs(&db.pool).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, JobStatus::Skipped);
    assert!(logs[0].ended_at.is_some());
}

#[actix_web::test]
async fn test_resumed_run_sends() {
    let db = TestDb::new().await;
    let server = zapi_server(200).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;

    JobService::set_paused(&db.pool, "party_hall_reminder_job", true)
        .await
        .unwrap();
    JobService::set_paused(&db.pool, "party_hall_reminder_job", false)
        .await
        .unwrap();

    let summary = finished(
        runner(&db.pool)
            .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Manual)
            .await
            .unwrap(),
    );

    assert_eq!(summary.sent, 1);
    assert!(summary.success);
}

// =============================================================================
// Per-target isolation
// =============================================================================

#[actix_web::test]
async fn test_missing_phone_fails_one_target_and_batch_continues() {
    let db = TestDb::new().await;
    let server = zapi_server(200).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let without_phone = create_booking(&db.pool, tenant_id, None, tomorrow()).await;
    let with_phone = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;

    let summary = finished(
        runner(&db.pool)
            .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Scheduled)
            .await
            .unwrap(),
    );

    assert_eq!(summary.date, tomorrow());
    assert_eq!(summary.total, 2);
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.success);

    let failed = summary
        .results
        .iter()
        .find(|r| r.target_id == without_phone)
        .unwrap();
    assert_eq!(failed.status, ItemStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("Recipient has no phone number"));

    let sent = summary
        .results
        .iter()
        .find(|r| r.target_id == with_phone)
        .unwrap();
    assert_eq!(sent.status, ItemStatus::Sent);
    assert_eq!(sent.message_id.as_deref(), Some("MSG-1"));

    assert_eq!(delivery_count(&db.pool, without_phone).await, 1);
    assert_eq!(reminder_marker(&db.pool, without_phone).await, None);
    assert!(reminder_marker(&db.pool, with_phone).await.is_some());

    let logs = reminder_logs(&db.pool).await;
    assert_eq!(logs[0].status, JobStatus::Completed);
    assert_eq!(logs[0].trigger_type, TriggerType::Scheduled);
    assert_eq!(logs[0].result_summary.as_ref().unwrap()["sent"], 1);
}

#[actix_web::test]
async fn test_all_failed_run_is_reported_as_error() {
    let db = TestDb::new().await;
    let server = zapi_server(500).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let booking_id = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;

    let summary = finished(
        runner(&db.pool)
            .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Scheduled)
            .await
            .unwrap(),
    );

    assert!(!summary.success);
    assert_eq!(summary.failed, 1);
    let error = summary.results[0].error.as_deref().unwrap();
    assert!(error.starts_with("HTTP 500"), "error was: {}", error);
    assert_eq!(reminder_marker(&db.pool, booking_id).await, None);

    let logs = reminder_logs(&db.pool).await;
    assert_eq!(logs[0].status, JobStatus::Error);
    assert!(logs[0].error_message.is_some());
}

#[actix_web::test]
async fn test_missing_gateway_aborts_run() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let booking_id = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;

    let err = runner(&db.pool)
        .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Scheduled)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("No active WhatsApp gateway"));
    assert_eq!(delivery_count(&db.pool, booking_id).await, 0);

    let logs = reminder_logs(&db.pool).await;
    assert_eq!(logs[0].status, JobStatus::Error);
}

#[actix_web::test]
async fn test_cancellations_cannot_be_scheduled() {
    let db = TestDb::new().await;

    let err = runner(&db.pool)
        .run_scheduled(NotificationType::PartyHallCancelled, None, TriggerType::Manual)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("cannot be scheduled"));
}

// =============================================================================
// Pacing
// =============================================================================

#[actix_web::test]
async fn test_sends_are_paced_and_sequential() {
    let db = TestDb::new().await;
    let server = zapi_server(200).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;

    let mut phones = HashMap::new();
    for phone in ["5511911110001", "5511911110002", "5511911110003"] {
        let id = create_booking(&db.pool, tenant_id, Some(phone), tomorrow()).await;
        phones.insert(id, phone);
    }

    let delay = Duration::from_millis(200);
    let started = Instant::now();
    let summary = finished(
        paced_runner(&db.pool, delay)
            .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Manual)
            .await
            .unwrap(),
    );
    let elapsed = started.elapsed();

    assert_eq!(summary.sent, 3);
    assert!(
        elapsed >= delay * 2,
        "three sends took {:?}, expected at least {:?}",
        elapsed,
        delay * 2
    );

    let expected: Vec<&str> = summary.results.iter().map(|r| phones[&r.target_id]).collect();
    let received: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| {
            let body: serde_json::Value = req.body_json().unwrap();
            body["phone"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(received, expected);
}

#[actix_web::test]
async fn test_longest_stored_phone_is_recorded_after_prefixing() {
    let db = TestDb::new().await;
    let server = zapi_server(200).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let phone = "1".repeat(32);
    let booking_id = create_booking(&db.pool, tenant_id, Some(&phone), tomorrow()).await;

    let summary = finished(
        runner(&db.pool)
            .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Manual)
            .await
            .unwrap(),
    );

    assert_eq!(summary.sent, 1);
    assert_eq!(delivery_count(&db.pool, booking_id).await, 1);
    assert!(reminder_marker(&db.pool, booking_id).await.is_some());

    let records =
        DeliveryService::list_for_target(&db.pool, booking_id, NotificationType::PartyHallReminder)
            .await
            .unwrap();
    assert_eq!(records[0].recipient_phone, format!("55{}", phone));
}

// =============================================================================
// Eligibility
// =============================================================================

#[actix_web::test]
async fn test_marked_targets_are_excluded() {
    let db = TestDb::new().await;
    let server = zapi_server(200).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let booking_id = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;

    let first = finished(
        runner(&db.pool)
            .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Scheduled)
            .await
            .unwrap(),
    );
    assert_eq!(first.sent, 1);

    let second = finished(
        runner(&db.pool)
            .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Scheduled)
            .await
            .unwrap(),
    );
    assert_eq!(second.total, 0);
    assert!(second.success);
    assert_eq!(delivery_count(&db.pool, booking_id).await, 1);
}

#[actix_web::test]
async fn test_other_dates_and_cancelled_bookings_are_not_eligible() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let tomorrow = tomorrow();
    create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow + chrono::Days::new(1))
        .await;
    let cancelled = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow).await;
    sqlx::query("UPDATE party_hall_bookings SET status = 'cancelled' WHERE id = $1")
        .bind(cancelled)
        .execute(&db.pool)
        .await
        .unwrap();
    let eligible = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow).await;

    let targets = TargetService::eligible(
        &db.pool,
        NotificationType::PartyHallReminder,
        tomorrow,
        test_config().dispatch.tz_offset(),
        3,
    )
    .await
    .unwrap();

    let ids: Vec<_> = targets.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![eligible]);
    assert_eq!(targets[0].tenant_name, "Residencial Aurora");
}

#[actix_web::test]
async fn test_failed_targets_are_retried_until_attempt_cap() {
    let db = TestDb::new().await;
    let server = zapi_server(500).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let booking_id = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;
    let runner = runner(&db.pool);
    let max_attempts = test_config().dispatch.max_delivery_attempts;

    for _ in 0..max_attempts {
        let summary = finished(
            runner
                .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Scheduled)
                .await
                .unwrap(),
        );
        assert_eq!(summary.total, 1);
        assert_eq!(summary.failed, 1);
    }

    let capped = finished(
        runner
            .run_scheduled(NotificationType::PartyHallReminder, None, TriggerType::Scheduled)
            .await
            .unwrap(),
    );
    assert_eq!(capped.total, 0);
    assert_eq!(
        DeliveryService::count_failed(&db.pool, booking_id, NotificationType::PartyHallReminder)
            .await
            .unwrap(),
        max_attempts
    );
}

#[actix_web::test]
async fn test_package_run_uses_todays_window() {
    let db = TestDb::new().await;
    let server = zapi_server(200).await;
    create_active_gateway(&db.pool, "zapi", &server.uri(), Some("INST")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let package_id = create_package(&db.pool, tenant_id, Some(RESIDENT_PHONE)).await;

    let summary = finished(
        runner(&db.pool)
            .run_scheduled(NotificationType::PackageArrived, None, TriggerType::Scheduled)
            .await
            .unwrap(),
    );

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.results[0].target_id, package_id);
    assert_eq!(summary.date, tomorrow() - chrono::Days::new(1));
}

#[actix_web::test]
async fn test_claim_is_exclusive() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let booking_id = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;

    let first = TargetService::try_claim(&db.pool, NotificationType::PartyHallReminder, booking_id)
        .await
        .unwrap();
    let second = TargetService::try_claim(&db.pool, NotificationType::PartyHallReminder, booking_id)
        .await
        .unwrap();

    assert!(first.is_some());
    assert!(second.is_none());

    TargetService::release_claim(
        &db.pool,
        NotificationType::PartyHallReminder,
        booking_id,
        first.unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(reminder_marker(&db.pool, booking_id).await, None);
}
