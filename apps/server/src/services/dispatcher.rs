//! Single-notification orchestration: template, phone, gateway, delivery log
//! and the idempotent marker.

use chrono::{DateTime, FixedOffset, Utc};
use sqlx::PgPool;

use crate::config::DispatchConfig;
use crate::error::AppResult;
use crate::models::{
    ChecklistItem, DeliveryOutcome, DeliveryStatus, GatewayConfig, NewDeliveryRecord,
    NotificationTarget, NotificationType, TargetDetails,
};
use crate::services::phone::normalize_with_country_code;
use crate::services::template::{render, TemplateService, TemplateValues};
use crate::services::whatsapp::{create_adapter, SendOutcome};
use crate::services::{DeliveryService, TargetService};

/// Error recorded when a target has nowhere to send to
pub const NO_PHONE_ERROR: &str = "Recipient has no phone number";

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M";
const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Sends one notification for one target
#[derive(Clone)]
pub struct NotificationDispatcher {
    pool: PgPool,
    client: reqwest::Client,
    settings: DispatchConfig,
}

impl NotificationDispatcher {
    pub fn new(pool: PgPool, client: reqwest::Client, settings: DispatchConfig) -> Self {
        Self {
            pool,
            client,
            settings,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn settings(&self) -> &DispatchConfig {
        &self.settings
    }

    /// Renders, sends and records one notification.
    ///
    /// Delivery failures come back as an unsuccessful outcome with a
    /// record written. Only an unusable gateway config or a database
    /// failure is an error.
    pub async fn dispatch_one(
        &self,
        target: &NotificationTarget,
        notification_type: NotificationType,
        config: &GatewayConfig,
    ) -> AppResult<DeliveryOutcome> {
        let provider = config.provider()?;
        let message = self.render_message(target, notification_type).await?;

        let (recipient_phone, send_outcome) = match target.phone() {
            Some(raw) => {
                let phone = normalize_with_country_code(raw, &self.settings.default_country_code);
                let adapter = create_adapter(provider, self.client.clone());
                let outcome = adapter.send(config, &phone, &message).await;
                (phone, outcome)
            }
            None => (String::new(), SendOutcome::failure(NO_PHONE_ERROR, None)),
        };

        DeliveryService::record(
            &self.pool,
            NewDeliveryRecord {
                target_id: target.id,
                tenant_id: Some(target.tenant_id),
                notification_type,
                recipient_phone,
                rendered_message: message,
                provider: Some(provider),
                provider_message_id: send_outcome.message_id.clone(),
                status: if send_outcome.success {
                    DeliveryStatus::Sent
                } else {
                    DeliveryStatus::Failed
                },
                error_message: send_outcome.error.clone(),
            },
        )
        .await?;

        if !send_outcome.success {
            let error = send_outcome
                .error
                .unwrap_or_else(|| "Unknown delivery error".to_string());
            log::warn!(
                "{} for target {} failed via {}: {}",
                notification_type,
                target.id,
                provider,
                error
            );
            return Ok(DeliveryOutcome::failed(error));
        }

        log::info!(
            "{} for target {} sent via {} (message id: {})",
            notification_type,
            target.id,
            provider,
            send_outcome.message_id.as_deref().unwrap_or("-")
        );

        if notification_type.is_idempotent()
            && !TargetService::mark_sent(&self.pool, notification_type, target.id).await?
        {
            log::debug!(
                "Marker for target {} was already set, keeping the first timestamp",
                target.id
            );
        }

        Ok(DeliveryOutcome::sent(send_outcome.message_id))
    }

    async fn render_message(
        &self,
        target: &NotificationTarget,
        notification_type: NotificationType,
    ) -> AppResult<String> {
        let template =
            TemplateService::resolve_or_fallback(&self.pool, notification_type, Some(target.tenant_id))
                .await?;

        let checklist = if notification_type == NotificationType::PartyHallReminder {
            TargetService::checklist(&self.pool, target.tenant_id).await?
        } else {
            Vec::new()
        };

        let values = build_values(
            target,
            notification_type,
            &checklist,
            self.settings.tz_offset(),
        );

        Ok(render(&template.content, &values))
    }
}

/// Placeholder values for a target, with dates shown in the recipients' offset
pub fn build_values(
    target: &NotificationTarget,
    notification_type: NotificationType,
    checklist: &[ChecklistItem],
    offset: FixedOffset,
) -> TemplateValues {
    let mut values = TemplateValues::new();
    values.insert("resident_name".to_string(), target.recipient_name.clone());
    values.insert("condominium_name".to_string(), target.tenant_name.clone());

    match &target.details {
        TargetDetails::Booking {
            hall_name,
            booking_date,
            start_time,
            end_time,
            ..
        } => {
            values.insert("hall_name".to_string(), hall_name.clone());
            values.insert(
                "booking_date".to_string(),
                booking_date.format(DATE_FORMAT).to_string(),
            );
            values.insert(
                "start_time".to_string(),
                start_time.format(TIME_FORMAT).to_string(),
            );
            values.insert(
                "end_time".to_string(),
                end_time.format(TIME_FORMAT).to_string(),
            );
            if notification_type == NotificationType::PartyHallReminder {
                values.insert("checklist".to_string(), format_checklist(checklist));
            }
        }
        TargetDetails::Package {
            description,
            received_at,
            ..
        } => {
            values.insert("package_description".to_string(), description.clone());
            values.insert(
                "received_at".to_string(),
                format_local(received_at, offset),
            );
        }
        TargetDetails::Occurrence { title, occurred_at } => {
            values.insert("occurrence_title".to_string(), title.clone());
            values.insert(
                "occurred_at".to_string(),
                format_local(occurred_at, offset),
            );
        }
    }

    values
}

fn format_local(at: &DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(DATE_TIME_FORMAT).to_string()
}

/// Checklist section grouped by category, in the order items are given
pub fn format_checklist(items: &[ChecklistItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut section = String::from("📋 *Checklist do salão:*");
    let mut current_category: Option<&str> = None;

    for item in items {
        if current_category != Some(item.category.as_str()) {
            section.push_str("\n\n*");
            section.push_str(&item.category);
            section.push('*');
            current_category = Some(item.category.as_str());
        }
        section.push_str("\n• ");
        section.push_str(&item.description);
    }

    section
}
