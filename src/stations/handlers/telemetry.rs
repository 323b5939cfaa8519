use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{pet_wash_stations, station_alerts, station_telemetry};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::core::shared::DbConn;
use crate::security::{ApiPath, FilterQuery, ValidatedJson};
use crate::stations::alerts::{recompute_station_health, AlertStatus, StationAlert};
use crate::stations::telemetry::{
    evaluate_thresholds, CreateTelemetryRequest, ListTelemetryQuery, StationTelemetry,
    ThresholdBreach,
};
use crate::stations::types::HealthStatus;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryIngestResponse {
    #[serde(flatten)]
    pub telemetry: StationTelemetry,
    pub alerts_opened: Vec<StationAlert>,
    pub health_status: HealthStatus,
}

pub async fn handle_list_telemetry(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListTelemetryQuery>,
) -> Result<Json<Vec<StationTelemetry>>, ApiError> {
    if matches!(query.limit, Some(limit) if limit <= 0) {
        return Err(ApiError::BadRequest("limit must be positive".to_string()));
    }
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = station_telemetry::table.into_boxed();
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(station_telemetry::station_id.eq(station_id));
        }
        if let Some(since) = query.since {
            db_query = db_query.filter(station_telemetry::recorded_at.ge(since));
        }
        if let Some(limit) = query.limit {
            db_query = db_query.limit(limit);
        }
        Ok(db_query
            .order((station_telemetry::recorded_at.desc(), station_telemetry::id.asc()))
            .load::<StationTelemetry>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_telemetry(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StationTelemetry>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        station_telemetry::table
            .find(id)
            .first::<StationTelemetry>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Telemetry reading"))
    })
    .await?;
    Ok(Json(row))
}

/// Opens an alert for `breach` unless the station already has an active
/// alert of the same type and title.
fn open_alert_for(
    conn: &mut DbConn,
    reading: &StationTelemetry,
    breach: ThresholdBreach,
) -> Result<Option<StationAlert>, ApiError> {
    let already_open: i64 = station_alerts::table
        .filter(station_alerts::station_id.eq(reading.station_id))
        .filter(station_alerts::alert_type.eq(breach.alert_type))
        .filter(station_alerts::title.eq(&breach.title))
        .filter(station_alerts::status.eq_any(AlertStatus::ACTIVE.to_vec()))
        .count()
        .get_result(conn)?;
    if already_open > 0 {
        return Ok(None);
    }

    let alert = StationAlert::open(
        reading.station_id,
        breach.alert_type,
        breach.severity,
        breach.title,
        breach.message,
        Some(reading.id),
        Utc::now(),
    );
    let row = diesel::insert_into(station_alerts::table)
        .values(&alert)
        .get_result::<StationAlert>(conn)?;
    Ok(Some(row))
}

pub async fn handle_create_telemetry(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateTelemetryRequest>,
) -> Result<(StatusCode, Json<TelemetryIngestResponse>), ApiError> {
    let now = Utc::now();
    let reading = StationTelemetry {
        id: Uuid::new_v4(),
        station_id: req.station_id,
        recorded_at: req.recorded_at.unwrap_or(now),
        water_pressure_psi: req.water_pressure_psi,
        water_temperature_c: req.water_temperature_c,
        power_consumption_kw: req.power_consumption_kw,
        water_flow_lpm: req.water_flow_lpm,
        shampoo_level_percent: req.shampoo_level_percent,
        conditioner_level_percent: req.conditioner_level_percent,
        is_online: req.is_online.unwrap_or(true),
        error_codes: req.error_codes,
        created_at: now,
    };
    let thresholds = state.config.telemetry.clone();

    let response = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            // Serializes concurrent readings for one station so alert
            // de-duplication and the health write see each other.
            pet_wash_stations::table
                .find(reading.station_id)
                .select(pet_wash_stations::id)
                .for_update()
                .first::<Uuid>(conn)
                .optional()?
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("Station {} does not exist", reading.station_id))
                })?;

            let telemetry = diesel::insert_into(station_telemetry::table)
                .values(&reading)
                .get_result::<StationTelemetry>(conn)?;

            let mut alerts_opened = Vec::new();
            for breach in evaluate_thresholds(&telemetry, &thresholds) {
                if let Some(alert) = open_alert_for(conn, &telemetry, breach)? {
                    alerts_opened.push(alert);
                }
            }
            let health_status = recompute_station_health(conn, telemetry.station_id)?;

            Ok(TelemetryIngestResponse {
                telemetry,
                alerts_opened,
                health_status,
            })
        })
    })
    .await?;

    if !response.alerts_opened.is_empty() {
        warn!(
            "Telemetry {} for station {} opened {} alert(s); health is now {}",
            response.telemetry.id,
            response.telemetry.station_id,
            response.alerts_opened.len(),
            response.health_status
        );
    } else {
        info!(
            "Recorded telemetry {} for station {}",
            response.telemetry.id, response.telemetry.station_id
        );
    }
    Ok((StatusCode::CREATED, Json(response)))
}
