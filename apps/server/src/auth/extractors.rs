use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use crate::auth::token::{is_valid_token_format, secrets_match};
use crate::config::Config;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{AuthToken, TriggerType};
use crate::services::AuthTokenService;

/// Extractor for Bearer token authentication (API endpoints)
///
/// Usage in handlers:
/// ```ignore
/// async fn my_handler(caller: AuthenticatedCaller) -> HttpResponse {
///     caller.require_tenant(tenant.owner_id)?;
/// }
/// ```
pub struct AuthenticatedCaller {
    pub token: AuthToken,
}

impl AuthenticatedCaller {
    pub fn is_admin(&self) -> bool {
        self.token.is_admin
    }

    /// Administrators manage every tenant; síndicos only their own
    pub fn can_manage_tenant(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.token.user_id == Some(owner_id)
    }

    pub fn require_tenant(&self, owner_id: Uuid) -> AppResult<()> {
        if self.can_manage_tenant(owner_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Caller does not manage this condominium".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Administrator token required".to_string(),
            ))
        }
    }
}

impl FromRequest for AuthenticatedCaller {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = match req.app_data::<web::Data<DbPool>>().cloned() {
            Some(pool) => pool,
            None => {
                return Box::pin(async {
                    Err(AppError::Internal(
                        "Database pool not configured".to_string(),
                    ))
                });
            }
        };

        let bearer = bearer_value(req);

        Box::pin(async move {
            let token = authenticate(&pool, &bearer?).await?;
            Ok(AuthenticatedCaller { token })
        })
    }
}

/// Extractor for the batch trigger endpoints
///
/// Accepts the shared `CRON_SECRET` (scheduled run) or an administrator
/// token (manual run).
pub struct SchedulerAuth {
    pub trigger: TriggerType,
}

impl FromRequest for SchedulerAuth {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let pool = match req.app_data::<web::Data<DbPool>>().cloned() {
            Some(pool) => pool,
            None => {
                return Box::pin(async {
                    Err(AppError::Internal(
                        "Database pool not configured".to_string(),
                    ))
                });
            }
        };

        let cron_secret = req
            .app_data::<web::Data<Config>>()
            .and_then(|config| config.security.cron_secret.clone());

        let bearer = bearer_value(req);

        Box::pin(async move {
            let bearer = bearer?;

            if cron_secret
                .as_deref()
                .is_some_and(|secret| secrets_match(&bearer, secret))
            {
                return Ok(SchedulerAuth {
                    trigger: TriggerType::Scheduled,
                });
            }

            let token = authenticate(&pool, &bearer).await?;
            if !token.is_admin {
                return Err(AppError::Forbidden(
                    "Scheduler secret or administrator token required".to_string(),
                ));
            }

            Ok(SchedulerAuth {
                trigger: TriggerType::Manual,
            })
        })
    }
}

/// Value of an `Authorization: Bearer <value>` header
fn bearer_value(req: &HttpRequest) -> AppResult<String> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let value = header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized(
            "Invalid Authorization header format, expected 'Bearer <token>'".to_string(),
        )
    })?;

    Ok(value.trim().to_string())
}

/// Looks up an API token and records its use
async fn authenticate(pool: &web::Data<DbPool>, token_str: &str) -> AppResult<AuthToken> {
    if !is_valid_token_format(token_str) {
        return Err(AppError::Unauthorized(
            "Malformed Bearer token, must be 40 lowercase hex chars".to_string(),
        ));
    }

    let token = AuthTokenService::get_by_token(pool.get_ref(), token_str)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid Bearer token".to_string()))?;

    // Update last_used_at asynchronously (fire and forget)
    let pool_clone = pool.clone();
    let token_id = token.id;
    tokio::spawn(async move {
        let _ = AuthTokenService::update_last_used(pool_clone.get_ref(), token_id).await;
    });

    Ok(token)
}
