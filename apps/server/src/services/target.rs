//! Reads notification targets and maintains their "already sent" markers.
//!
//! Marker writes are conditional updates checked by affected-row count, so
//! two concurrent callers can never both win the same target.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    BookingRow, ChecklistItem, NotificationTarget, NotificationType, OccurrenceRow, PackageRow,
    TargetKind,
};

const BOOKING_SELECT: &str = r#"
    SELECT b.id, b.tenant_id, t.name AS tenant_name, t.owner_id AS tenant_owner_id,
           b.resident_name, b.resident_phone, b.hall_name, b.booking_date,
           b.start_time, b.end_time, b.status, b.reminder_sent_at
    FROM party_hall_bookings b
    JOIN tenants t ON t.id = b.tenant_id
"#;

const PACKAGE_SELECT: &str = r#"
    SELECT p.id, p.tenant_id, t.name AS tenant_name, t.owner_id AS tenant_owner_id,
           p.resident_name, p.resident_phone, p.description, p.received_at,
           p.status, p.notification_sent_at
    FROM packages p
    JOIN tenants t ON t.id = p.tenant_id
"#;

const OCCURRENCE_SELECT: &str = r#"
    SELECT o.id, o.tenant_id, t.name AS tenant_name, t.owner_id AS tenant_owner_id,
           o.resident_name, o.resident_phone, o.title, o.occurred_at,
           o.notification_sent_at
    FROM occurrences o
    JOIN tenants t ON t.id = o.tenant_id
"#;

/// Failed deliveries of this type for the target, compared against the retry cap
const ATTEMPTS_BELOW_CAP: &str = r#"
    (SELECT COUNT(*) FROM delivery_records d
     WHERE d.target_id = {alias}.id
       AND d.notification_type = $2
       AND d.status = 'failed') < $3
"#;

fn table_name(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Booking => "party_hall_bookings",
        TargetKind::Package => "packages",
        TargetKind::Occurrence => "occurrences",
    }
}

/// UTC bounds of a calendar day in a fixed offset
pub fn day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let start = (local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc();
    (start, start + Duration::days(1))
}

pub struct TargetService;

impl TargetService {
    /// Loads a target by id in the shape its notification type needs
    pub async fn load(
        pool: &PgPool,
        notification_type: NotificationType,
        id: Uuid,
    ) -> AppResult<Option<NotificationTarget>> {
        let target = match notification_type.target_kind() {
            TargetKind::Booking => {
                sqlx::query_as::<_, BookingRow>(&format!("{} WHERE b.id = $1", BOOKING_SELECT))
                    .bind(id)
                    .fetch_optional(pool)
                    .await?
                    .map(|row| row.into_target(notification_type))
            }
            TargetKind::Package => {
                sqlx::query_as::<_, PackageRow>(&format!("{} WHERE p.id = $1", PACKAGE_SELECT))
                    .bind(id)
                    .fetch_optional(pool)
                    .await?
                    .map(NotificationTarget::from)
            }
            TargetKind::Occurrence => sqlx::query_as::<_, OccurrenceRow>(&format!(
                "{} WHERE o.id = $1",
                OCCURRENCE_SELECT
            ))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(NotificationTarget::from),
        };

        Ok(target)
    }

    /// Targets a scheduled run should notify for `window`.
    ///
    /// Excludes anything already marked and anything that has failed
    /// `max_attempts` times for this type.
    pub async fn eligible(
        pool: &PgPool,
        notification_type: NotificationType,
        window: NaiveDate,
        offset: FixedOffset,
        max_attempts: i64,
    ) -> AppResult<Vec<NotificationTarget>> {
        let slug = notification_type.slug();

        match notification_type {
            NotificationType::PartyHallReminder => {
                let sql = format!(
                    r#"{}
                    WHERE b.booking_date = $1
                      AND b.status IN ('confirmed', 'pending')
                      AND b.reminder_sent_at IS NULL
                      AND {}
                    ORDER BY b.start_time, b.id
                    "#,
                    BOOKING_SELECT,
                    ATTEMPTS_BELOW_CAP.replace("{alias}", "b")
                );

                let rows = sqlx::query_as::<_, BookingRow>(&sql)
                    .bind(window)
                    .bind(slug)
                    .bind(max_attempts)
                    .fetch_all(pool)
                    .await?;

                Ok(rows
                    .into_iter()
                    .map(|row| row.into_target(notification_type))
                    .collect())
            }
            NotificationType::PackageArrived => {
                let (start, end) = day_bounds(window, offset);
                let sql = format!(
                    r#"{}
                    WHERE p.received_at >= $1 AND p.received_at < $4
                      AND p.status = 'pending'
                      AND p.notification_sent_at IS NULL
                      AND {}
                    ORDER BY p.received_at, p.id
                    "#,
                    PACKAGE_SELECT,
                    ATTEMPTS_BELOW_CAP.replace("{alias}", "p")
                );

                let rows = sqlx::query_as::<_, PackageRow>(&sql)
                    .bind(start)
                    .bind(slug)
                    .bind(max_attempts)
                    .bind(end)
                    .fetch_all(pool)
                    .await?;

                Ok(rows.into_iter().map(NotificationTarget::from).collect())
            }
            other => Err(AppError::Validation(format!(
                "'{}' notifications cannot be scheduled",
                other
            ))),
        }
    }

    /// Sets the marker if still unset. Returns whether this call set it.
    ///
    /// No-op for types without a marker.
    pub async fn mark_sent(
        pool: &PgPool,
        notification_type: NotificationType,
        id: Uuid,
    ) -> AppResult<bool> {
        Ok(Self::try_claim(pool, notification_type, id).await?.is_some())
    }

    /// Atomically claims a target before sending.
    ///
    /// Returns the claim timestamp, or `None` if another caller already
    /// holds or completed it (or the type has no marker).
    pub async fn try_claim(
        pool: &PgPool,
        notification_type: NotificationType,
        id: Uuid,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let Some(column) = notification_type.marker_column() else {
            return Ok(None);
        };

        let sql = format!(
            "UPDATE {table} SET {column} = NOW() WHERE id = $1 AND {column} IS NULL RETURNING {column}",
            table = table_name(notification_type.target_kind()),
            column = column,
        );

        let claimed: Option<(DateTime<Utc>,)> =
            sqlx::query_as(&sql).bind(id).fetch_optional(pool).await?;

        Ok(claimed.map(|(at,)| at))
    }

    /// Clears a claim after a failed send so a later run can retry.
    ///
    /// Only clears the exact claim this caller made.
    pub async fn release_claim(
        pool: &PgPool,
        notification_type: NotificationType,
        id: Uuid,
        claimed_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(column) = notification_type.marker_column() else {
            return Ok(false);
        };

        let sql = format!(
            "UPDATE {table} SET {column} = NULL WHERE id = $1 AND {column} = $2",
            table = table_name(notification_type.target_kind()),
            column = column,
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(claimed_at)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active checklist items of a tenant, in display order
    pub async fn checklist(pool: &PgPool, tenant_id: Uuid) -> AppResult<Vec<ChecklistItem>> {
        let items = sqlx::query_as::<_, ChecklistItem>(
            r#"
            SELECT id, tenant_id, category, description, position
            FROM hall_checklist_items
            WHERE tenant_id = $1 AND is_active = TRUE
            ORDER BY category, position, id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;

        Ok(items)
    }
}
