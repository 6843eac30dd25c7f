use log::{info, warn};
use sqlx::PgPool;
use std::env;

use crate::error::AppResult;
use crate::models::{AuthToken, CreateAuthToken};
use crate::services::AuthTokenService;

/// Creates the first administrator token when CONDOZAP_BOOTSTRAP_TOKEN is set.
///
/// Does nothing once any token exists. Returns the created token so the
/// caller can show it once.
pub async fn create_admin_token_if_needed(pool: &PgPool) -> AppResult<Option<AuthToken>> {
    match env::var("CONDOZAP_BOOTSTRAP_TOKEN") {
        Ok(val) if !val.is_empty() && val != "0" && !val.eq_ignore_ascii_case("false") => {}
        _ => {
            info!("CONDOZAP_BOOTSTRAP_TOKEN not set, skipping token bootstrap");
            return Ok(None);
        }
    }

    if AuthTokenService::has_any_token(pool).await? {
        warn!("CONDOZAP_BOOTSTRAP_TOKEN set but auth tokens already exist. Skipping bootstrap.");
        return Ok(None);
    }

    let input = CreateAuthToken {
        description: Some("Bootstrap admin token (created automatically)".to_string()),
        user_id: None,
        is_admin: true,
    };

    let token = AuthTokenService::create(pool, input).await?;
    info!("Bootstrap admin token {} created", token.id);

    Ok(Some(token))
}
