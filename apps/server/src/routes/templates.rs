use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::AuthenticatedCaller;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{NotificationType, UpsertTemplateOverride};
use crate::services::{TemplateService, TenantService};

/// GET /api/templates - List system default templates
pub async fn list_templates(
    _caller: AuthenticatedCaller, // Requires authentication
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let templates = TemplateService::list_defaults(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(templates))
}

/// PUT /api/tenants/{tenant_id}/templates/{slug} - Create or replace an override
pub async fn upsert_override(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<(Uuid, String)>,
    body: web::Json<UpsertTemplateOverride>,
) -> AppResult<HttpResponse> {
    let (tenant_id, slug) = path.into_inner();
    authorize_tenant(&caller, pool.get_ref(), tenant_id).await?;

    let row =
        TemplateService::upsert_override(pool.get_ref(), tenant_id, &slug, body.into_inner())
            .await?;

    Ok(HttpResponse::Ok().json(row))
}

/// DELETE /api/tenants/{tenant_id}/templates/{slug} - Remove an override
pub async fn delete_override(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<(Uuid, String)>,
) -> AppResult<HttpResponse> {
    let (tenant_id, slug) = path.into_inner();
    authorize_tenant(&caller, pool.get_ref(), tenant_id).await?;

    TemplateService::delete_override(pool.get_ref(), tenant_id, &slug).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/tenants/{tenant_id}/templates/{slug}/preview - Effective template text
pub async fn preview_template(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<(Uuid, String)>,
) -> AppResult<HttpResponse> {
    let (tenant_id, slug) = path.into_inner();
    authorize_tenant(&caller, pool.get_ref(), tenant_id).await?;

    let notification_type = NotificationType::from_slug(&slug)
        .ok_or_else(|| AppError::NotFound(format!("Template '{}' not found", slug)))?;

    let resolved =
        TemplateService::resolve_or_fallback(pool.get_ref(), notification_type, Some(tenant_id))
            .await?;

    Ok(HttpResponse::Ok().json(resolved))
}

async fn authorize_tenant(
    caller: &AuthenticatedCaller,
    pool: &DbPool,
    tenant_id: Uuid,
) -> AppResult<()> {
    let tenant = TenantService::get_by_id(pool, tenant_id).await?;
    caller.require_tenant(tenant.owner_id)
}

/// Configure template routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/templates", web::get().to(list_templates))
        .service(
            web::resource("/api/tenants/{tenant_id}/templates/{slug}")
                .route(web::put().to(upsert_override))
                .route(web::delete().to(delete_override)),
        )
        .route(
            "/api/tenants/{tenant_id}/templates/{slug}/preview",
            web::get().to(preview_template),
        );
}
