//! Integration tests for the job trigger and control endpoints

use actix_web::{http::StatusCode, test};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

#[actix_web::test]
async fn test_run_with_cron_secret() {
    let db = TestDb::new().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": {"id": "EVO-1"}})))
        .mount(&server)
        .await;
    create_active_gateway(&db.pool, "evolution", &server.uri(), Some("main")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    add_checklist_item(&db.pool, tenant_id, "Limpeza", "Recolher o lixo").await;
    let booking_id = create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), tomorrow()).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::post()
        .uri("/api/jobs/party_hall_reminder/run")
        .insert_header(bearer(CRON_SECRET))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["date"], tomorrow().to_string());
    assert_eq!(body["total"], 1);
    assert_eq!(body["sent"], 1);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["skipped"], 0);
    assert_eq!(body["results"][0]["targetId"], booking_id.to_string());
    assert_eq!(body["results"][0]["status"], "sent");

    let (message,): (String,) =
        sqlx::query_as("SELECT rendered_message FROM delivery_records WHERE target_id = $1")
            .bind(booking_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert!(message.contains("*Limpeza*"));
    assert!(message.contains("• Recolher o lixo"));
    assert!(message.contains("18:00"));
}

#[actix_web::test]
async fn test_run_with_explicit_date() {
    let db = TestDb::new().await;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": {"id": "EVO-1"}})))
        .mount(&server)
        .await;
    create_active_gateway(&db.pool, "evolution", &server.uri(), Some("main")).await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let date = chrono::NaiveDate::from_ymd_opt(2030, 12, 24).unwrap();
    create_booking(&db.pool, tenant_id, Some(RESIDENT_PHONE), date).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::post()
        .uri("/api/jobs/reminder/run?date=2030-12-24")
        .insert_header(bearer(CRON_SECRET))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["date"], "2030-12-24");
    assert_eq!(body["sent"], 1);
}

#[actix_web::test]
async fn test_run_authorization() {
    let db = TestDb::new().await;
    let (_tenant, owner_id) = create_tenant(&db.pool, "Residencial Aurora").await;
    let owner_token = create_owner_token(&db.pool, owner_id).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::post()
        .uri("/api/jobs/party_hall_reminder/run")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/jobs/party_hall_reminder/run")
        .insert_header(bearer("wrong-secret"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/jobs/party_hall_reminder/run")
        .insert_header(bearer(&owner_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_run_unknown_or_unschedulable_type_is_bad_request() {
    let db = TestDb::new().await;
    let app = test_app!(db.pool, test_config());

    for uri in ["/api/jobs/newsletter/run", "/api/jobs/party_hall_cancelled/run"] {
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header(bearer(CRON_SECRET))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);
    }
}

#[actix_web::test]
async fn test_pause_resume_and_logs() {
    let db = TestDb::new().await;
    let token = create_admin_token(&db.pool).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::post()
        .uri("/api/jobs/package_arrived/pause")
        .insert_header(bearer(&token))
        .to_request();
    let control: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(control["functionName"], "package_arrived_job");
    assert_eq!(control["paused"], true);

    let req = test::TestRequest::post()
        .uri("/api/jobs/package_arrived/run")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"success": true, "message": "Function is paused"}));

    let req = test::TestRequest::post()
        .uri("/api/jobs/package_arrived/resume")
        .insert_header(bearer(&token))
        .to_request();
    let control: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(control["paused"], false);

    let req = test::TestRequest::get()
        .uri("/api/jobs/package_arrived/logs?limit=5")
        .insert_header(bearer(&token))
        .to_request();
    let logs: Value = test::call_and_read_body_json(&app, req).await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "skipped");
    assert_eq!(logs[0]["triggerType"], "manual");
}

#[actix_web::test]
async fn test_job_control_requires_admin() {
    let db = TestDb::new().await;
    let (_tenant, owner_id) = create_tenant(&db.pool, "Residencial Aurora").await;
    let token = create_owner_token(&db.pool, owner_id).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::post()
        .uri("/api/jobs/package_arrived/pause")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
