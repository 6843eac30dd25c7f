use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{GatewayProvider, NotificationType};

/// Outcome of a single send attempt as stored in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Append-only record of one attempted send
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub id: i64,
    pub target_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub notification_type: String,
    pub recipient_phone: String,
    pub template_slug: String,
    pub rendered_message: String,
    pub provider: Option<String>,
    pub provider_message_id: Option<String>,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Insert payload for a delivery record
#[derive(Debug, Clone)]
pub struct NewDeliveryRecord {
    pub target_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub recipient_phone: String,
    pub rendered_message: String,
    pub provider: Option<GatewayProvider>,
    pub provider_message_id: Option<String>,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
}

/// Result of dispatching one notification, returned to callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn sent(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Query parameters for listing deliveries
#[derive(Debug, Deserialize)]
pub struct ListDeliveriesQuery {
    pub cursor: Option<String>,
}
