//! Notification targets: the business entities (bookings, packages,
//! occurrences) whose state drives a WhatsApp message.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

// =============================================================================
// Notification Type Enum
// =============================================================================

/// Kind of message sent to a resident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[serde(alias = "reminder")]
    PartyHallReminder,
    #[serde(alias = "cancelled")]
    PartyHallCancelled,
    #[serde(alias = "package")]
    PackageArrived,
    #[serde(alias = "occurrence")]
    OccurrenceRegistered,
}

/// Table family a notification type reads its target from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Booking,
    Package,
    Occurrence,
}

const PARTY_HALL_REMINDER_FALLBACK: &str = "Olá {resident_name}! 👋\n\nLembrete: sua reserva do *{hall_name}* no {condominium_name} é amanhã, {booking_date}, das {start_time} às {end_time}.\n\n{checklist}\n\nQualquer dúvida, procure a administração.";

const PARTY_HALL_CANCELLED_FALLBACK: &str = "Olá {resident_name}. Sua reserva do *{hall_name}* no {condominium_name} para {booking_date} ({start_time} - {end_time}) foi cancelada.";

const PACKAGE_ARRIVED_FALLBACK: &str = "Olá {resident_name}! 📦 Chegou uma encomenda para você no {condominium_name}: {package_description}.\nRecebida em {received_at}. Retire na portaria.";

const OCCURRENCE_REGISTERED_FALLBACK: &str = "Olá {resident_name}. Uma ocorrência foi registrada no {condominium_name}: *{occurrence_title}* ({occurred_at}). Acesse o portal para mais detalhes.";

impl NotificationType {
    pub const ALL: [NotificationType; 4] = [
        NotificationType::PartyHallReminder,
        NotificationType::PartyHallCancelled,
        NotificationType::PackageArrived,
        NotificationType::OccurrenceRegistered,
    ];

    /// Template slug, also the wire name of the type
    pub fn slug(&self) -> &'static str {
        match self {
            NotificationType::PartyHallReminder => "party_hall_reminder",
            NotificationType::PartyHallCancelled => "party_hall_cancelled",
            NotificationType::PackageArrived => "package_arrived",
            NotificationType::OccurrenceRegistered => "occurrence_registered",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.slug() == slug)
    }

    pub fn target_kind(&self) -> TargetKind {
        match self {
            NotificationType::PartyHallReminder | NotificationType::PartyHallCancelled => {
                TargetKind::Booking
            }
            NotificationType::PackageArrived => TargetKind::Package,
            NotificationType::OccurrenceRegistered => TargetKind::Occurrence,
        }
    }

    /// Column recording that this notification was delivered.
    ///
    /// `None` for one-off notices, which are not subject to the
    /// at-most-once guarantee.
    pub fn marker_column(&self) -> Option<&'static str> {
        match self {
            NotificationType::PartyHallReminder => Some("reminder_sent_at"),
            NotificationType::PartyHallCancelled => None,
            NotificationType::PackageArrived | NotificationType::OccurrenceRegistered => {
                Some("notification_sent_at")
            }
        }
    }

    pub fn is_idempotent(&self) -> bool {
        self.marker_column().is_some()
    }

    /// Whether the batch runner knows how to select targets for this type
    pub fn is_schedulable(&self) -> bool {
        matches!(
            self,
            NotificationType::PartyHallReminder | NotificationType::PackageArrived
        )
    }

    /// Name used for job logs and the pause flag
    pub fn function_name(&self) -> String {
        format!("{}_job", self.slug())
    }

    /// Date window a scheduled run covers when none is given
    pub fn default_window(&self, today: NaiveDate) -> NaiveDate {
        match self {
            NotificationType::PartyHallReminder => today + Duration::days(1),
            _ => today,
        }
    }

    /// Hardcoded message used when no template row is active
    pub fn fallback_template(&self) -> &'static str {
        match self {
            NotificationType::PartyHallReminder => PARTY_HALL_REMINDER_FALLBACK,
            NotificationType::PartyHallCancelled => PARTY_HALL_CANCELLED_FALLBACK,
            NotificationType::PackageArrived => PACKAGE_ARRIVED_FALLBACK,
            NotificationType::OccurrenceRegistered => OCCURRENCE_REGISTERED_FALLBACK,
        }
    }

    /// Placeholders the dispatcher fills for this type
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            NotificationType::PartyHallReminder => &[
                "resident_name",
                "condominium_name",
                "hall_name",
                "booking_date",
                "start_time",
                "end_time",
                "checklist",
            ],
            NotificationType::PartyHallCancelled => &[
                "resident_name",
                "condominium_name",
                "hall_name",
                "booking_date",
                "start_time",
                "end_time",
            ],
            NotificationType::PackageArrived => &[
                "resident_name",
                "condominium_name",
                "package_description",
                "received_at",
            ],
            NotificationType::OccurrenceRegistered => &[
                "resident_name",
                "condominium_name",
                "occurrence_title",
                "occurred_at",
            ],
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for NotificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "reminder" => Ok(NotificationType::PartyHallReminder),
            "cancelled" => Ok(NotificationType::PartyHallCancelled),
            "package" => Ok(NotificationType::PackageArrived),
            "occurrence" => Ok(NotificationType::OccurrenceRegistered),
            other => Self::from_slug(other).ok_or_else(|| {
                AppError::Validation(format!("Unknown notification type '{}'", other))
            }),
        }
    }
}

// =============================================================================
// Notification Target
// =============================================================================

/// Entity-specific fields used to fill placeholders
#[derive(Debug, Clone)]
pub enum TargetDetails {
    Booking {
        hall_name: String,
        booking_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        status: String,
    },
    Package {
        description: String,
        received_at: DateTime<Utc>,
        status: String,
    },
    Occurrence {
        title: String,
        occurred_at: DateTime<Utc>,
    },
}

/// Uniform view over a booking, package or occurrence
#[derive(Debug, Clone)]
pub struct NotificationTarget {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub tenant_owner_id: Uuid,
    pub recipient_name: String,
    pub recipient_phone: Option<String>,
    pub details: TargetDetails,
    /// Marker for the notification type the target was loaded for
    pub sent_at: Option<DateTime<Utc>>,
}

impl NotificationTarget {
    /// Phone if present and not blank
    pub fn phone(&self) -> Option<&str> {
        self.recipient_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

// =============================================================================
// Database Rows
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub tenant_owner_id: Uuid,
    pub resident_name: String,
    pub resident_phone: Option<String>,
    pub hall_name: String,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub reminder_sent_at: Option<DateTime<Utc>>,
}

impl BookingRow {
    pub fn into_target(self, notification_type: NotificationType) -> NotificationTarget {
        let sent_at = if notification_type.is_idempotent() {
            self.reminder_sent_at
        } else {
            None
        };

        NotificationTarget {
            id: self.id,
            tenant_id: self.tenant_id,
            tenant_name: self.tenant_name,
            tenant_owner_id: self.tenant_owner_id,
            recipient_name: self.resident_name,
            recipient_phone: self.resident_phone,
            details: TargetDetails::Booking {
                hall_name: self.hall_name,
                booking_date: self.booking_date,
                start_time: self.start_time,
                end_time: self.end_time,
                status: self.status,
            },
            sent_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PackageRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub tenant_owner_id: Uuid,
    pub resident_name: String,
    pub resident_phone: Option<String>,
    pub description: String,
    pub received_at: DateTime<Utc>,
    pub status: String,
    pub notification_sent_at: Option<DateTime<Utc>>,
}

impl From<PackageRow> for NotificationTarget {
    fn from(row: PackageRow) -> Self {
        NotificationTarget {
            id: row.id,
            tenant_id: row.tenant_id,
            tenant_name: row.tenant_name,
            tenant_owner_id: row.tenant_owner_id,
            recipient_name: row.resident_name,
            recipient_phone: row.resident_phone,
            details: TargetDetails::Package {
                description: row.description,
                received_at: row.received_at,
                status: row.status,
            },
            sent_at: row.notification_sent_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OccurrenceRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub tenant_owner_id: Uuid,
    pub resident_name: String,
    pub resident_phone: Option<String>,
    pub title: String,
    pub occurred_at: DateTime<Utc>,
    pub notification_sent_at: Option<DateTime<Utc>>,
}

impl From<OccurrenceRow> for NotificationTarget {
    fn from(row: OccurrenceRow) -> Self {
        NotificationTarget {
            id: row.id,
            tenant_id: row.tenant_id,
            tenant_name: row.tenant_name,
            tenant_owner_id: row.tenant_owner_id,
            recipient_name: row.resident_name,
            recipient_phone: row.resident_phone,
            details: TargetDetails::Occurrence {
                title: row.title,
                occurred_at: row.occurred_at,
            },
            sent_at: row.notification_sent_at,
        }
    }
}
