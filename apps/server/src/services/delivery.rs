use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{DeliveryRecord, DeliveryStatus, NewDeliveryRecord, NotificationType};
use crate::pagination::{DeliveryCursor, PAGE_SIZE};

const DELIVERY_COLUMNS: &str = "id, target_id, tenant_id, notification_type, recipient_phone, \
                                template_slug, rendered_message, provider, provider_message_id, \
                                status, error_message, sent_at";

pub struct DeliveryService;

impl DeliveryService {
    /// Appends a delivery record. Records are never updated afterwards.
    pub async fn record(pool: &PgPool, input: NewDeliveryRecord) -> AppResult<DeliveryRecord> {
        let record = sqlx::query_as::<_, DeliveryRecord>(&format!(
            r#"
            INSERT INTO delivery_records (
                target_id, tenant_id, notification_type, recipient_phone, template_slug,
                rendered_message, provider, provider_message_id, status, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            DELIVERY_COLUMNS
        ))
        .bind(input.target_id)
        .bind(input.tenant_id)
        .bind(input.notification_type.slug())
        .bind(&input.recipient_phone)
        .bind(input.notification_type.slug())
        .bind(&input.rendered_message)
        .bind(input.provider.map(|p| p.as_str()))
        .bind(&input.provider_message_id)
        .bind(input.status)
        .bind(&input.error_message)
        .fetch_one(pool)
        .await?;

        Ok(record)
    }

    /// Lists a tenant's deliveries newest first.
    ///
    /// Returns the page and whether more rows follow.
    pub async fn list_for_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        cursor: Option<&DeliveryCursor>,
    ) -> AppResult<(Vec<DeliveryRecord>, bool)> {
        let mut records = match cursor {
            Some(cursor) => {
                sqlx::query_as::<_, DeliveryRecord>(&format!(
                    "SELECT {} FROM delivery_records WHERE tenant_id = $1 AND id < $2 ORDER BY id DESC LIMIT $3",
                    DELIVERY_COLUMNS
                ))
                .bind(tenant_id)
                .bind(cursor.last_id)
                .bind(PAGE_SIZE + 1)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DeliveryRecord>(&format!(
                    "SELECT {} FROM delivery_records WHERE tenant_id = $1 ORDER BY id DESC LIMIT $2",
                    DELIVERY_COLUMNS
                ))
                .bind(tenant_id)
                .bind(PAGE_SIZE + 1)
                .fetch_all(pool)
                .await?
            }
        };

        let has_more = records.len() as i64 > PAGE_SIZE;
        records.truncate(PAGE_SIZE as usize);

        Ok((records, has_more))
    }

    /// All deliveries recorded for one target and type, oldest first
    pub async fn list_for_target(
        pool: &PgPool,
        target_id: Uuid,
        notification_type: NotificationType,
    ) -> AppResult<Vec<DeliveryRecord>> {
        let records = sqlx::query_as::<_, DeliveryRecord>(&format!(
            "SELECT {} FROM delivery_records WHERE target_id = $1 AND notification_type = $2 ORDER BY id",
            DELIVERY_COLUMNS
        ))
        .bind(target_id)
        .bind(notification_type.slug())
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Failed attempts for one target and type
    pub async fn count_failed(
        pool: &PgPool,
        target_id: Uuid,
        notification_type: NotificationType,
    ) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM delivery_records
            WHERE target_id = $1 AND notification_type = $2 AND status = $3
            "#,
        )
        .bind(target_id)
        .bind(notification_type.slug())
        .bind(DeliveryStatus::Failed)
        .fetch_one(pool)
        .await?;

        Ok(count.0)
    }
}
