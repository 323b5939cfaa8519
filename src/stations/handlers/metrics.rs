use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::station_performance_metrics as metrics;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::security::{ApiPath, FilterQuery, ValidatedJson};
use crate::stations::metrics::{ListMetricsQuery, RecordMetricsRequest, StationPerformanceMetrics};

pub async fn handle_list_metrics(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListMetricsQuery>,
) -> Result<Json<Vec<StationPerformanceMetrics>>, ApiError> {
    query.check_range()?;
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = metrics::table.into_boxed();
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(metrics::station_id.eq(station_id));
        }
        if let Some(from) = query.from {
            db_query = db_query.filter(metrics::metric_date.ge(from));
        }
        if let Some(to) = query.to {
            db_query = db_query.filter(metrics::metric_date.le(to));
        }
        Ok(db_query
            .order((metrics::metric_date.desc(), metrics::station_id.asc()))
            .load::<StationPerformanceMetrics>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_metrics(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StationPerformanceMetrics>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        metrics::table
            .find(id)
            .first::<StationPerformanceMetrics>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Performance metrics"))
    })
    .await?;
    Ok(Json(row))
}

/// Records one station-day. A second report for the same day replaces the
/// figures in place and answers 200 instead of 201.
pub async fn handle_record_metrics(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RecordMetricsRequest>,
) -> Result<(StatusCode, Json<StationPerformanceMetrics>), ApiError> {
    let row = req.into_row(Utc::now());
    let new_id = row.id;

    let saved = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(metrics::table)
            .values(&row)
            .on_conflict((metrics::station_id, metrics::metric_date))
            .do_update()
            .set((
                metrics::total_washes.eq(excluded(metrics::total_washes)),
                metrics::revenue.eq(excluded(metrics::revenue)),
                metrics::currency.eq(excluded(metrics::currency)),
                metrics::average_wash_duration_sec.eq(excluded(metrics::average_wash_duration_sec)),
                metrics::uptime_percent.eq(excluded(metrics::uptime_percent)),
                metrics::water_usage_liters.eq(excluded(metrics::water_usage_liters)),
                metrics::energy_usage_kwh.eq(excluded(metrics::energy_usage_kwh)),
                metrics::customer_rating.eq(excluded(metrics::customer_rating)),
                metrics::updated_at.eq(excluded(metrics::updated_at)),
            ))
            .get_result::<StationPerformanceMetrics>(conn)?)
    })
    .await?;

    let status = if saved.id == new_id {
        StatusCode::CREATED
    } else {
        debug!(
            "Replaced metrics for station {} on {}",
            saved.station_id, saved.metric_date
        );
        StatusCode::OK
    };
    Ok((status, Json(saved)))
}
