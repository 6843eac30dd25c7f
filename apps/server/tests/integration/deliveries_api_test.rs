//! Integration tests for the delivery history endpoint

use actix_web::{http::StatusCode, test};
use condozap::models::{DeliveryStatus, NewDeliveryRecord, NotificationType};
use condozap::services::DeliveryService;
use pretty_assertions::assert_eq;
use serde_json::Value;
use uuid::Uuid;

use crate::common::*;

async fn record_failures(pool: &sqlx::PgPool, tenant_id: Uuid, count: usize) {
    for i in 0..count {
        DeliveryService::record(
            pool,
            NewDeliveryRecord {
                target_id: Uuid::new_v4(),
                tenant_id: Some(tenant_id),
                notification_type: NotificationType::PackageArrived,
                recipient_phone: NORMALIZED_PHONE.to_string(),
                rendered_message: format!("Mensagem {}", i),
                provider: None,
                provider_message_id: None,
                status: DeliveryStatus::Failed,
                error_message: Some("Connection failed".to_string()),
            },
        )
        .await
        .expect("Failed to record delivery");
    }
}

#[actix_web::test]
async fn test_deliveries_are_paginated_newest_first() {
    let db = TestDb::new().await;
    let (tenant_id, owner_id) = create_tenant(&db.pool, "Residencial Aurora").await;
    let (other_tenant, _other_owner) = create_tenant(&db.pool, "Edifício Horizonte").await;
    record_failures(&db.pool, tenant_id, 25).await;
    record_failures(&db.pool, other_tenant, 3).await;
    let token = create_owner_token(&db.pool, owner_id).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::get()
        .uri(&format!("/api/tenants/{}/deliveries", tenant_id))
        .insert_header(bearer(&token))
        .to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;

    let items = first["items"].as_array().unwrap();
    assert_eq!(items.len(), 20);
    assert_eq!(first["hasMore"], true);
    assert_eq!(items[0]["renderedMessage"], "Mensagem 24");
    assert_eq!(items[0]["status"], "failed");

    let cursor = first["nextCursor"].as_str().unwrap();
    let req = test::TestRequest::get()
        .uri(&format!("/api/tenants/{}/deliveries?cursor={}", tenant_id, cursor))
        .insert_header(bearer(&token))
        .to_request();
    let second: Value = test::call_and_read_body_json(&app, req).await;

    let items = second["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(second["hasMore"], false);
    assert!(second.get("nextCursor").is_none());
    assert_eq!(items[4]["renderedMessage"], "Mensagem 0");
}

#[actix_web::test]
async fn test_deliveries_invalid_cursor_is_bad_request() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let token = create_admin_token(&db.pool).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::get()
        .uri(&format!("/api/tenants/{}/deliveries?cursor=invalid!", tenant_id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_deliveries_of_other_tenant_are_forbidden() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let (_other, other_owner) = create_tenant(&db.pool, "Edifício Horizonte").await;
    let token = create_owner_token(&db.pool, other_owner).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::get()
        .uri(&format!("/api/tenants/{}/deliveries", tenant_id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_delivery_records_are_immutable() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    record_failures(&db.pool, tenant_id, 1).await;

    let result = sqlx::query("UPDATE delivery_records SET status = 'sent'")
        .execute(&db.pool)
        .await;

    assert!(result.is_err());
}
