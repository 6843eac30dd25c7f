//! WhatsApp gateway models.
//!
//! A gateway configuration is installation-wide: every condominium sends
//! through the single active row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::error::AppError;

// =============================================================================
// Provider Enum
// =============================================================================

/// Supported WhatsApp gateway resellers, each with its own wire protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    Zpro,
    #[serde(alias = "z-api")]
    Zapi,
    Evolution,
    #[serde(alias = "wpp")]
    Wppconnect,
}

impl GatewayProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayProvider::Zpro => "zpro",
            GatewayProvider::Zapi => "zapi",
            GatewayProvider::Evolution => "evolution",
            GatewayProvider::Wppconnect => "wppconnect",
        }
    }
}

impl std::fmt::Display for GatewayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zpro" => Ok(GatewayProvider::Zpro),
            "zapi" | "z-api" => Ok(GatewayProvider::Zapi),
            "evolution" => Ok(GatewayProvider::Evolution),
            "wppconnect" | "wpp" => Ok(GatewayProvider::Wppconnect),
            other => Err(AppError::Configuration(format!(
                "Unknown WhatsApp provider '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Gateway Config Model
// =============================================================================

/// Gateway configuration row.
///
/// `provider` is kept as the raw column value; [`GatewayConfig::provider`]
/// turns it into the closed enum at dispatch time.
#[derive(Clone, FromRow)]
pub struct GatewayConfig {
    pub id: i32,
    #[sqlx(rename = "provider")]
    pub provider_name: String,
    pub api_url: String,
    pub api_key: String,
    pub instance_id: Option<String>,
    pub is_active: bool,
    pub use_official_api: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GatewayConfig {
    /// Parses the provider column. Unknown names are a configuration error.
    pub fn provider(&self) -> Result<GatewayProvider, AppError> {
        self.provider_name.parse()
    }

    /// API URL without trailing slashes, ready for path concatenation
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Masks the API key for display
    pub fn to_response(&self) -> GatewayConfigResponse {
        GatewayConfigResponse {
            id: self.id,
            provider: self.provider_name.clone(),
            api_url: self.api_url.clone(),
            api_key_hint: mask_secret(&self.api_key),
            instance_id: self.instance_id.clone(),
            is_active: self.is_active,
            use_official_api: self.use_official_api,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("id", &self.id)
            .field("provider", &self.provider_name)
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("instance_id", &self.instance_id)
            .field("is_active", &self.is_active)
            .field("use_official_api", &self.use_official_api)
            .finish()
    }
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}...", visible)
}

/// DTO for creating a gateway configuration
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGatewayConfig {
    pub provider: GatewayProvider,
    pub api_url: String,
    pub api_key: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub use_official_api: bool,
    #[serde(default)]
    pub is_active: bool,
}

/// Gateway configuration as returned by the admin API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfigResponse {
    pub id: i32,
    pub provider: String,
    pub api_url: String,
    pub api_key_hint: String,
    pub instance_id: Option<String>,
    pub is_active: bool,
    pub use_official_api: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for sending a test message through the active gateway
#[derive(Debug, Deserialize)]
pub struct TestGatewayRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
