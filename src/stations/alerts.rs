use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::error::ApiError;
use crate::core::shared::jsonb::jsonb_column;
use crate::core::shared::schema::{pet_wash_stations, station_alerts};
use crate::core::shared::DbConn;
use crate::maintenance::types::WorkPriority;
use crate::security::validation::{Validate, ValidationResult, Validator};

use super::types::HealthStatus;

db_enum! {
    pub enum AlertType {
        TelemetryThreshold => "telemetry_threshold",
        Offline => "offline",
        HardwareFault => "hardware_fault",
        LowSupplies => "low_supplies",
        PaymentTerminal => "payment_terminal",
        Security => "security",
        Other => "other",
    }
}

db_enum! {
    pub enum AlertSeverity {
        Info => "info",
        Warning => "warning",
        Critical => "critical",
    }
}

db_enum! {
    pub enum AlertStatus {
        Open => "open",
        Acknowledged => "acknowledged",
        Resolved => "resolved",
        Ignored => "ignored",
    }
}

impl AlertStatus {
    /// Statuses that still count towards station health.
    pub const ACTIVE: &'static [AlertStatus] = &[AlertStatus::Open, AlertStatus::Acknowledged];

    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        use AlertStatus::*;
        matches!(
            (self, next),
            (Open, Acknowledged | Resolved | Ignored) | (Acknowledged, Resolved | Ignored)
        )
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

impl AlertSeverity {
    pub fn work_order_priority(self) -> WorkPriority {
        match self {
            AlertSeverity::Critical => WorkPriority::Urgent,
            AlertSeverity::Warning => WorkPriority::High,
            AlertSeverity::Info => WorkPriority::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub channel: String,
    pub recipient: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = diesel::sql_types::Jsonb)]
#[serde(transparent)]
pub struct NotificationsSent(pub Vec<NotificationRecord>);

jsonb_column!(NotificationsSent);

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = station_alerts, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct StationAlert {
    pub id: Uuid,
    pub station_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub status: AlertStatus,
    pub work_order_id: Option<Uuid>,
    pub source_telemetry_id: Option<Uuid>,
    pub notifications_sent: NotificationsSent,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StationAlert {
    pub fn open(
        station_id: Uuid,
        alert_type: AlertType,
        severity: AlertSeverity,
        title: String,
        message: String,
        source_telemetry_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            station_id,
            alert_type,
            severity,
            title,
            message,
            status: AlertStatus::Open,
            work_order_id: None,
            source_telemetry_id,
            notifications_sent: NotificationsSent::default(),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the alert to `next`, stamping who did it. Illegal moves are a
    /// conflict and leave the alert untouched.
    pub fn transition(
        &mut self,
        next: AlertStatus,
        actor: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if !self.status.can_transition_to(next) {
            return Err(ApiError::Conflict(format!(
                "Alert cannot move from {} to {}",
                self.status, next
            )));
        }
        match next {
            AlertStatus::Acknowledged => {
                self.acknowledged_at = Some(now);
                self.acknowledged_by = Some(actor.to_string());
            }
            AlertStatus::Resolved | AlertStatus::Ignored => {
                self.resolved_at = Some(now);
                self.resolved_by = Some(actor.to_string());
                if notes.is_some() {
                    self.resolution_notes = notes;
                }
            }
            AlertStatus::Open => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

fn notifications(validator: Validator, sent: Option<&NotificationsSent>) -> Validator {
    let Some(sent) = sent else { return validator };
    sent.0.iter().enumerate().fold(validator, |v, (i, record)| {
        v.text(&record.channel, &format!("notificationsSent[{i}].channel"), 40)
            .text(&record.recipient, &format!("notificationsSent[{i}].recipient"), 200)
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub station_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub notifications_sent: Option<NotificationsSent>,
}

impl Validate for CreateAlertRequest {
    const REQUIRED: &'static [&'static str] =
        &["stationId", "alertType", "severity", "title", "message"];

    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .text(&self.title, "title", 200)
            .text(&self.message, "message", 4000);
        notifications(validator, self.notifications_sent.as_ref()).validate()
    }
}

/// Editable descriptive fields. Status moves only through the action routes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertRequest {
    pub severity: Option<AlertSeverity>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub resolution_notes: Option<String>,
    pub notifications_sent: Option<NotificationsSent>,
}

impl Validate for UpdateAlertRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .opt(self.title.as_deref(), |v, t| v.text(t, "title", 200))
            .opt(self.message.as_deref(), |v, m| v.text(m, "message", 4000))
            .opt(self.resolution_notes.as_deref(), |v, n| {
                v.length(n, "resolutionNotes", None, Some(4000))
            });
        notifications(validator, self.notifications_sent.as_ref()).validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertActionRequest {
    pub resolution_notes: Option<String>,
}

impl Validate for AlertActionRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.resolution_notes.as_deref(), |v, n| {
                v.length(n, "resolutionNotes", None, Some(4000))
            })
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertWorkOrderRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<WorkPriority>,
    pub assigned_to: Option<String>,
    pub scheduled_date: Option<chrono::NaiveDate>,
    pub asset_id: Option<Uuid>,
}

impl Validate for AlertWorkOrderRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.title.as_deref(), |v, t| v.text(t, "title", 200))
            .opt(self.assigned_to.as_deref(), |v, a| v.length(a, "assignedTo", None, Some(160)))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAlertsQuery {
    pub station_id: Option<Uuid>,
    pub status: Option<AlertStatus>,
    pub severity: Option<AlertSeverity>,
}

/// Health of a station given the type and severity of its active alerts.
pub fn derive_health(active: &[(AlertType, AlertSeverity)]) -> HealthStatus {
    if active.iter().any(|(t, _)| *t == AlertType::Offline) {
        HealthStatus::Offline
    } else if active.iter().any(|(_, s)| *s == AlertSeverity::Critical) {
        HealthStatus::Critical
    } else if active.iter().any(|(_, s)| *s == AlertSeverity::Warning) {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

/// Re-derives and stores `health_status` for one station. Call inside the
/// transaction that changed its alerts.
pub fn recompute_station_health(
    conn: &mut DbConn,
    station_id: Uuid,
) -> Result<HealthStatus, ApiError> {
    let active: Vec<(AlertType, AlertSeverity)> = station_alerts::table
        .filter(station_alerts::station_id.eq(station_id))
        .filter(station_alerts::status.eq_any(AlertStatus::ACTIVE.to_vec()))
        .select((station_alerts::alert_type, station_alerts::severity))
        .load(conn)?;

    let health = derive_health(&active);
    diesel::update(pet_wash_stations::table.find(station_id))
        .set((
            pet_wash_stations::health_status.eq(health),
            pet_wash_stations::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    Ok(health)
}
