//! Integration tests for template resolution and the template API
//!
//! Tenant override over system default over hardcoded fallback.

use actix_web::{http::StatusCode, test};
use condozap::models::{NotificationType, TemplateSource, UpsertTemplateOverride};
use condozap::services::TemplateService;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::*;

// =============================================================================
// Resolution
// =============================================================================

#[actix_web::test]
async fn test_override_wins_over_default() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let (other_tenant, _other_owner) = create_tenant(&db.pool, "Edifício Horizonte").await;

    TemplateService::upsert_override(
        &db.pool,
        tenant_id,
        "package_arrived",
        UpsertTemplateOverride {
            content: "Encomenda para {resident_name}!".to_string(),
            is_active: true,
        },
    )
    .await
    .unwrap();

    let resolved =
        TemplateService::resolve_or_fallback(&db.pool, NotificationType::PackageArrived, Some(tenant_id))
            .await
            .unwrap();
    assert_eq!(resolved.source, TemplateSource::TenantOverride);
    assert_eq!(resolved.content, "Encomenda para {resident_name}!");

    let other = TemplateService::resolve_or_fallback(
        &db.pool,
        NotificationType::PackageArrived,
        Some(other_tenant),
    )
    .await
    .unwrap();
    assert_eq!(other.source, TemplateSource::SystemDefault);
}

#[actix_web::test]
async fn test_inactive_override_is_ignored() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;

    TemplateService::upsert_override(
        &db.pool,
        tenant_id,
        "occurrence_registered",
        UpsertTemplateOverride {
            content: "Desativado".to_string(),
            is_active: false,
        },
    )
    .await
    .unwrap();

    let resolved = TemplateService::resolve_or_fallback(
        &db.pool,
        NotificationType::OccurrenceRegistered,
        Some(tenant_id),
    )
    .await
    .unwrap();

    assert_eq!(resolved.source, TemplateSource::SystemDefault);
}

#[actix_web::test]
async fn test_inactive_default_falls_back_to_hardcoded_text() {
    let db = TestDb::new().await;
    sqlx::query("UPDATE message_templates SET is_active = FALSE WHERE slug = 'party_hall_reminder'")
        .execute(&db.pool)
        .await
        .unwrap();

    let resolved =
        TemplateService::resolve_or_fallback(&db.pool, NotificationType::PartyHallReminder, None)
            .await
            .unwrap();

    assert_eq!(resolved.source, TemplateSource::Fallback);
    assert_eq!(
        resolved.content,
        NotificationType::PartyHallReminder.fallback_template()
    );
}

#[actix_web::test]
async fn test_seeded_defaults_match_fallbacks() {
    let db = TestDb::new().await;

    for notification_type in NotificationType::ALL {
        let resolved = TemplateService::resolve(&db.pool, notification_type.slug(), None)
            .await
            .unwrap()
            .expect("seeded template missing");
        assert_eq!(resolved.content, notification_type.fallback_template());
    }
}

#[actix_web::test]
async fn test_override_for_unknown_slug_is_rejected() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;

    let err = TemplateService::upsert_override(
        &db.pool,
        tenant_id,
        "newsletter",
        UpsertTemplateOverride {
            content: "Olá".to_string(),
            is_active: true,
        },
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("not found"));
}

// =============================================================================
// API
// =============================================================================

#[actix_web::test]
async fn test_list_templates() {
    let db = TestDb::new().await;
    let (_tenant_id, owner_id) = create_tenant(&db.pool, "Residencial Aurora").await;
    let token = create_owner_token(&db.pool, owner_id).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::get()
        .uri("/api/templates")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let slugs: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["slug"].as_str().unwrap())
        .collect();
    assert_eq!(
        slugs,
        vec![
            "occurrence_registered",
            "package_arrived",
            "party_hall_cancelled",
            "party_hall_reminder"
        ]
    );
}

#[actix_web::test]
async fn test_override_lifecycle_via_api() {
    let db = TestDb::new().await;
    let (tenant_id, owner_id) = create_tenant(&db.pool, "Residencial Aurora").await;
    let token = create_owner_token(&db.pool, owner_id).await;
    let app = test_app!(db.pool, test_config());
    let uri = format!("/api/tenants/{}/templates/package_arrived", tenant_id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"content": "📦 {resident_name}, sua encomenda chegou!"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["isActive"], true);

    let req = test::TestRequest::get()
        .uri(&format!("{}/preview", uri))
        .insert_header(bearer(&token))
        .to_request();
    let preview: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(preview["source"], "tenant_override");
    assert_eq!(preview["content"], "📦 {resident_name}, sua encomenda chegou!");

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("{}/preview", uri))
        .insert_header(bearer(&token))
        .to_request();
    let preview: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(preview["source"], "system_default");
}

#[actix_web::test]
async fn test_override_requires_tenant_ownership() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let (_other, other_owner) = create_tenant(&db.pool, "Edifício Horizonte").await;
    let token = create_owner_token(&db.pool, other_owner).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::put()
        .uri(&format!("/api/tenants/{}/templates/package_arrived", tenant_id))
        .insert_header(bearer(&token))
        .set_json(json!({"content": "Olá"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_empty_override_is_rejected() {
    let db = TestDb::new().await;
    let (tenant_id, _owner) = create_tenant(&db.pool, "Residencial Aurora").await;
    let token = create_admin_token(&db.pool).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::put()
        .uri(&format!("/api/tenants/{}/templates/package_arrived", tenant_id))
        .insert_header(bearer(&token))
        .set_json(json!({"content": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_invalid_tenant_id_is_bad_request() {
    let db = TestDb::new().await;
    let token = create_admin_token(&db.pool).await;
    let app = test_app!(db.pool, test_config());

    let req = test::TestRequest::get()
        .uri("/api/tenants/not-a-uuid/templates/package_arrived/preview")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
