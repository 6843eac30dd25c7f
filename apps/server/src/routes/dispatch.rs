use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedCaller;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::NotificationType;
use crate::services::{GatewayService, NotificationDispatcher, TargetService};

/// Body of a single-target dispatch.
///
/// Fields are optional so that missing ones produce a descriptive 400.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
}

impl DispatchRequest {
    fn validate(&self) -> AppResult<(Uuid, NotificationType)> {
        let target_id = self
            .target_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("targetId is required".to_string()))?;

        let target_id = Uuid::parse_str(target_id)
            .map_err(|_| AppError::Validation("targetId must be a UUID".to_string()))?;

        let notification_type = self
            .notification_type
            .as_deref()
            .ok_or_else(|| AppError::Validation("notificationType is required".to_string()))?
            .parse()?;

        Ok((target_id, notification_type))
    }
}

/// POST /api/notifications/dispatch - Send one notification now
pub async fn dispatch(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    dispatcher: web::Data<NotificationDispatcher>,
    body: web::Json<DispatchRequest>,
) -> AppResult<HttpResponse> {
    let (target_id, notification_type) = body.validate()?;

    let target = TargetService::load(pool.get_ref(), notification_type, target_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Target {} not found", target_id)))?;

    caller.require_tenant(target.tenant_owner_id)?;

    let config = GatewayService::get_active(pool.get_ref()).await?;
    let outcome = dispatcher
        .dispatch_one(&target, notification_type, &config)
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Configure dispatch routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/notifications/dispatch", web::post().to(dispatch));
}
