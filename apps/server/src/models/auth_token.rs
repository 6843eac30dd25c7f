use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// AuthToken model - identifies an API caller
///
/// `user_id` ties the token to a síndico (matched against `tenants.owner_id`);
/// admin tokens may act on every tenant.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuthToken {
    pub id: i32,
    pub token: String,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// DTO for creating a new token
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthToken {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Response that includes the full token (only on creation)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenCreatedResponse {
    pub id: i32,
    pub token: String, // Only shown once!
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Response for listing (token is masked)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenResponse {
    pub id: i32,
    pub token_prefix: String, // First 8 chars only
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    /// Mask the token for display (show first 8 chars)
    pub fn to_response(&self) -> AuthTokenResponse {
        AuthTokenResponse {
            id: self.id,
            token_prefix: format!("{}...", self.token.get(..8).unwrap_or(&self.token)),
            description: self.description.clone(),
            user_id: self.user_id,
            is_admin: self.is_admin,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        }
    }

    /// Full response with token (only for creation)
    pub fn to_created_response(&self) -> AuthTokenCreatedResponse {
        AuthTokenCreatedResponse {
            id: self.id,
            token: self.token.clone(),
            description: self.description.clone(),
            user_id: self.user_id,
            is_admin: self.is_admin,
            created_at: self.created_at,
        }
    }
}
