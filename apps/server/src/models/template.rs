use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// System-wide default message template
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub slug: String,
    pub default_content: String,
    pub variables: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-condominium replacement for a default template
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantTemplateOverride {
    pub id: i32,
    pub tenant_id: Uuid,
    pub slug: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating or replacing an override
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertTemplateOverride {
    pub content: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Where the effective template text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    TenantOverride,
    SystemDefault,
    Fallback,
}

/// Template text chosen for a (slug, tenant) pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTemplate {
    pub slug: String,
    pub content: String,
    pub source: TemplateSource,
}
