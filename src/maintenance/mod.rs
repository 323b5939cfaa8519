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

pub fn configure_maintenance_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assets", get(handle_list_assets).post(handle_create_asset))
        .route("/assets/:id", get(handle_get_asset).put(handle_update_asset))
        .route(
            "/work-orders",
            get(handle_list_work_orders).post(handle_create_work_order),
        )
        .route(
            "/work-orders/:id",
            get(handle_get_work_order).put(handle_update_work_order),
        )
        .route("/work-orders/:id/status", post(handle_work_order_status))
}
