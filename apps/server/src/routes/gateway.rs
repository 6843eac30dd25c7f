use actix_web::{web, HttpResponse};

use crate::auth::AuthenticatedCaller;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CreateGatewayConfig, GatewayConfigResponse, TestGatewayRequest};
use crate::services::phone::normalize_with_country_code;
use crate::services::whatsapp::create_adapter;
use crate::services::{GatewayService, NotificationDispatcher};

const TEST_MESSAGE: &str = "✅ Mensagem de teste do CondoZap. Seu gateway WhatsApp está funcionando!";

/// GET /api/gateway-configs - List gateway configurations
pub async fn list_configs(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    caller.require_admin()?;

    let configs = GatewayService::list(pool.get_ref()).await?;
    let responses: Vec<GatewayConfigResponse> = configs.iter().map(|c| c.to_response()).collect();

    Ok(HttpResponse::Ok().json(responses))
}

/// POST /api/gateway-configs - Create a gateway configuration
pub async fn create_config(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    dispatcher: web::Data<NotificationDispatcher>,
    body: web::Json<CreateGatewayConfig>,
) -> AppResult<HttpResponse> {
    caller.require_admin()?;

    let config =
        GatewayService::create(pool.get_ref(), dispatcher.client(), body.into_inner()).await?;

    Ok(HttpResponse::Created().json(config.to_response()))
}

/// POST /api/gateway-configs/{id}/activate - Make a configuration the active one
pub async fn activate_config(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    caller.require_admin()?;

    let config = GatewayService::activate(pool.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(config.to_response()))
}

/// POST /api/gateway-configs/test - Send a test message through the active gateway
pub async fn test_config(
    caller: AuthenticatedCaller,
    pool: web::Data<DbPool>,
    dispatcher: web::Data<NotificationDispatcher>,
    body: web::Json<TestGatewayRequest>,
) -> AppResult<HttpResponse> {
    caller.require_admin()?;

    let body = body.into_inner();
    let phone = body
        .phone
        .as_deref()
        .filter(|p| p.chars().any(|c| c.is_ascii_digit()))
        .map(|p| normalize_with_country_code(p, &dispatcher.settings().default_country_code))
        .ok_or_else(|| AppError::Validation("phone is required".to_string()))?;

    let message = body
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| TEST_MESSAGE.to_string());

    let config = GatewayService::get_active(pool.get_ref()).await?;
    let provider = config.provider()?;

    let outcome = create_adapter(provider, dispatcher.client().clone())
        .send(&config, &phone, &message)
        .await;

    log::info!(
        "Gateway test via {} to {}: {}",
        provider,
        phone,
        if outcome.success { "sent" } else { "failed" }
    );

    Ok(HttpResponse::Ok().json(outcome))
}

/// Configure gateway administration routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/gateway-configs")
            .route("", web::get().to(list_configs))
            .route("", web::post().to(create_config))
            .route("/test", web::post().to(test_config))
            .route("/{id}/activate", web::post().to(activate_config)),
    );
}
