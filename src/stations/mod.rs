//! Stations and everything they report: telemetry readings, the alerts those
//! readings open, and daily performance figures.

pub mod alerts;
pub mod handlers;
pub mod metrics;
pub mod telemetry;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use handlers::*;
pub use types::*;

pub fn configure_station_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/stations",
            get(handle_list_stations).post(handle_create_station),
        )
        .route("/stations/map", get(handle_station_map))
        .route(
            "/stations/:id",
            get(handle_get_station).put(handle_update_station),
        )
        .route(
            "/telemetry",
            get(handle_list_telemetry).post(handle_create_telemetry),
        )
        .route("/telemetry/:id", get(handle_get_telemetry))
        .route("/alerts", get(handle_list_alerts).post(handle_create_alert))
        .route("/alerts/:id", get(handle_get_alert).put(handle_update_alert))
        .route("/alerts/:id/acknowledge", post(handle_acknowledge_alert))
        .route("/alerts/:id/resolve", post(handle_resolve_alert))
        .route("/alerts/:id/ignore", post(handle_ignore_alert))
        .route("/alerts/:id/work-order", post(handle_alert_work_order))
        .route(
            "/performance-metrics",
            get(handle_list_metrics).post(handle_record_metrics),
        )
        .route("/performance-metrics/:id", get(handle_get_metrics))
}
