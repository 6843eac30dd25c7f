use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::auth::AuthenticatedCaller;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::ListDeliveriesQuery;
use crate::pagination::{DeliveryCursor, PaginatedResponse};
use crate::services::{DeliveryService, TenantService};

/// GET /api/tenants/{tenant_id}/deliveries - Delivery history, newest first
pub async fn list_deliveries(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    query: web::Query<ListDeliveriesQuery>,
) -> AppResult<HttpResponse> {
    let tenant_id = path.into_inner();
    let tenant = TenantService::get_by_id(pool.get_ref(), tenant_id).await?;
    caller.require_tenant(tenant.owner_id)?;

    let cursor = query
        .cursor
        .as_deref()
        .map(DeliveryCursor::decode)
        .transpose()?;

    let (records, has_more) =
        DeliveryService::list_for_tenant(pool.get_ref(), tenant_id, cursor.as_ref()).await?;

    let next_cursor = match records.last() {
        Some(last) if has_more => Some(DeliveryCursor::new(last.id).encode()?),
        _ => None,
    };

    Ok(HttpResponse::Ok().json(PaginatedResponse::new(records, next_cursor, has_more)))
}

/// Configure delivery history routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/api/tenants/{tenant_id}/deliveries",
        web::get().to(list_deliveries),
    );
}
