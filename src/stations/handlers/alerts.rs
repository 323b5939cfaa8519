use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{countries, pet_wash_stations, station_alerts};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::core::shared::DbConn;
use crate::maintenance::handlers::insert_work_order;
use crate::maintenance::types::{CreateWorkOrderRequest, WorkOrder, WorkType};
use crate::security::{ActionBody, AdminIdentity, ApiPath, FilterQuery, ValidatedJson};
use crate::stations::alerts::{
    recompute_station_health, AlertActionRequest, AlertSeverity, AlertStatus,
    AlertWorkOrderRequest, CreateAlertRequest, ListAlertsQuery, StationAlert, UpdateAlertRequest,
};

pub async fn handle_list_alerts(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListAlertsQuery>,
) -> Result<Json<Vec<StationAlert>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = station_alerts::table.into_boxed();
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(station_alerts::station_id.eq(station_id));
        }
        if let Some(status) = query.status {
            db_query = db_query.filter(station_alerts::status.eq(status));
        }
        if let Some(severity) = query.severity {
            db_query = db_query.filter(station_alerts::severity.eq(severity));
        }
        Ok(db_query
            .order((station_alerts::created_at.desc(), station_alerts::id.asc()))
            .load::<StationAlert>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_alert(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StationAlert>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        station_alerts::table
            .find(id)
            .first::<StationAlert>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Alert"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_alert(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateAlertRequest>,
) -> Result<(StatusCode, Json<StationAlert>), ApiError> {
    let mut alert = StationAlert::open(
        req.station_id,
        req.alert_type,
        req.severity,
        req.title,
        req.message,
        None,
        Utc::now(),
    );
    if let Some(sent) = req.notifications_sent {
        alert.notifications_sent = sent;
    }

    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let row = diesel::insert_into(station_alerts::table)
                .values(&alert)
                .get_result::<StationAlert>(conn)?;
            recompute_station_health(conn, row.station_id)?;
            Ok(row)
        })
    })
    .await?;
    info!(
        "Opened {} {} alert {} for station {}",
        row.severity, row.alert_type, row.id, row.station_id
    );
    Ok((StatusCode::CREATED, Json(row)))
}

fn lock_alert(conn: &mut DbConn, id: Uuid) -> Result<StationAlert, ApiError> {
    station_alerts::table
        .find(id)
        .for_update()
        .first::<StationAlert>(conn)
        .optional()?
        .ok_or_else(|| ApiError::not_found("Alert"))
}

fn save_alert(conn: &mut DbConn, alert: &StationAlert) -> Result<StationAlert, ApiError> {
    Ok(diesel::update(station_alerts::table.find(alert.id))
        .set(alert)
        .get_result::<StationAlert>(conn)?)
}

pub async fn handle_update_alert(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAlertRequest>,
) -> Result<Json<StationAlert>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut alert = lock_alert(conn, id)?;
            if let Some(severity) = req.severity {
                alert.severity = severity;
            }
            if let Some(title) = req.title {
                alert.title = title;
            }
            if let Some(message) = req.message {
                alert.message = message;
            }
            if let Some(notes) = req.resolution_notes {
                alert.resolution_notes = Some(notes);
            }
            if let Some(sent) = req.notifications_sent {
                alert.notifications_sent = sent;
            }
            alert.updated_at = Utc::now();

            let row = save_alert(conn, &alert)?;
            recompute_station_health(conn, row.station_id)?;
            Ok(row)
        })
    })
    .await?;
    Ok(Json(row))
}

async fn transition_alert(
    state: &AppState,
    id: Uuid,
    next: AlertStatus,
    actor: String,
    notes: Option<String>,
) -> Result<StationAlert, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut alert = lock_alert(conn, id)?;
            alert.transition(next, &actor, notes, Utc::now())?;
            let row = save_alert(conn, &alert)?;
            recompute_station_health(conn, row.station_id)?;
            Ok(row)
        })
    })
    .await?;
    info!("Alert {} is now {} (by {})", row.id, row.status, actor_of(&row));
    Ok(row)
}

fn actor_of(alert: &StationAlert) -> &str {
    match alert.status {
        AlertStatus::Acknowledged => alert.acknowledged_by.as_deref().unwrap_or("-"),
        _ => alert.resolved_by.as_deref().unwrap_or("-"),
    }
}

pub async fn handle_acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StationAlert>, ApiError> {
    let row = transition_alert(&state, id, AlertStatus::Acknowledged, admin.subject, None).await?;
    Ok(Json(row))
}

pub async fn handle_resolve_alert(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    ApiPath(id): ApiPath<Uuid>,
    ActionBody(req): ActionBody<AlertActionRequest>,
) -> Result<Json<StationAlert>, ApiError> {
    let row = transition_alert(
        &state,
        id,
        AlertStatus::Resolved,
        admin.subject,
        req.resolution_notes,
    )
    .await?;
    Ok(Json(row))
}

pub async fn handle_ignore_alert(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    ApiPath(id): ApiPath<Uuid>,
    ActionBody(req): ActionBody<AlertActionRequest>,
) -> Result<Json<StationAlert>, ApiError> {
    let row = transition_alert(
        &state,
        id,
        AlertStatus::Ignored,
        admin.subject,
        req.resolution_notes,
    )
    .await?;
    Ok(Json(row))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertWorkOrderResponse {
    pub alert: StationAlert,
    pub work_order: WorkOrder,
}

fn remediation_request(
    alert: &StationAlert,
    req: AlertWorkOrderRequest,
    currency: String,
) -> CreateWorkOrderRequest {
    let work_type = match alert.severity {
        AlertSeverity::Critical => WorkType::Emergency,
        _ => WorkType::Corrective,
    };
    CreateWorkOrderRequest {
        work_order_number: None,
        station_id: alert.station_id,
        asset_id: req.asset_id,
        title: req.title.unwrap_or_else(|| alert.title.clone()),
        description: req.description.or_else(|| Some(alert.message.clone())),
        work_type: Some(work_type),
        priority: Some(req.priority.unwrap_or_else(|| alert.severity.work_order_priority())),
        assigned_to: req.assigned_to,
        scheduled_date: req.scheduled_date,
        labor_hours: None,
        labor_cost: None,
        parts_cost: None,
        currency,
        parts_used: None,
    }
}

/// Opens a remediation work order for an active alert and links the two.
pub async fn handle_alert_work_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ActionBody(req): ActionBody<AlertWorkOrderRequest>,
) -> Result<(StatusCode, Json<AlertWorkOrderResponse>), ApiError> {
    let response = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut alert = lock_alert(conn, id)?;
            if !alert.status.is_active() {
                return Err(ApiError::Conflict(format!(
                    "Alert is {} and cannot get a work order",
                    alert.status
                )));
            }
            if let Some(existing) = alert.work_order_id {
                return Err(ApiError::Conflict(format!(
                    "Alert already linked to work order {existing}"
                )));
            }

            let currency: String = pet_wash_stations::table
                .inner_join(countries::table)
                .filter(pet_wash_stations::id.eq(alert.station_id))
                .select(countries::currency_code)
                .first(conn)?;

            let now = Utc::now();
            let order = WorkOrder::from_request(remediation_request(&alert, req, currency), now);
            let work_order = insert_work_order(conn, &order)?;

            alert.work_order_id = Some(work_order.id);
            alert.updated_at = now;
            let alert = save_alert(conn, &alert)?;
            Ok(AlertWorkOrderResponse { alert, work_order })
        })
    })
    .await?;
    info!(
        "Alert {} linked to work order {}",
        response.alert.id, response.work_order.work_order_number
    );
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maintenance::types::WorkPriority;
    use crate::stations::alerts::AlertType;

    #[test]
    fn test_remediation_request_defaults_from_alert() {
        let alert = StationAlert::open(
            Uuid::new_v4(),
            AlertType::TelemetryThreshold,
            AlertSeverity::Critical,
            "High water pressure".into(),
            "Water pressure 95.0 psi above 80.0 psi".into(),
            None,
            Utc::now(),
        );
        let req = remediation_request(&alert, AlertWorkOrderRequest::default(), "ILS".into());
        assert_eq!(req.station_id, alert.station_id);
        assert_eq!(req.title, "High water pressure");
        assert_eq!(req.work_type, Some(WorkType::Emergency));
        assert_eq!(req.priority, Some(WorkPriority::Urgent));
        assert_eq!(req.currency, "ILS");

        let custom = AlertWorkOrderRequest {
            title: Some("Inspect regulator".into()),
            priority: Some(WorkPriority::Low),
            ..Default::default()
        };
        let req = remediation_request(&alert, custom, "ILS".into());
        assert_eq!(req.title, "Inspect regulator");
        assert_eq!(req.priority, Some(WorkPriority::Low));
    }
}
