//! Spare parts: warehouse stock, per-station stock and the movement log.

pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use handlers::*;
pub use types::*;

pub fn configure_inventory_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/spare-parts",
            get(handle_list_spare_parts).post(handle_create_spare_part),
        )
        .route(
            "/spare-parts/:id",
            get(handle_get_spare_part).put(handle_update_spare_part),
        )
        .route(
            "/station-spare-parts",
            get(handle_list_station_spare_parts).post(handle_create_station_spare_part),
        )
        .route(
            "/station-spare-parts/:id",
            get(handle_get_station_spare_part).put(handle_update_station_spare_part),
        )
        .route("/inventory/adjust", post(handle_adjust_inventory))
        .route("/inventory/movements", get(handle_list_movements))
}
