//! Aggregate dashboards computed per request from grouped counts and sums.

pub mod handlers;
pub mod types;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use handlers::*;
pub use types::*;

pub fn configure_analytics_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/global", get(handle_global_analytics))
        .route("/analytics/franchisee/:id", get(handle_franchisee_analytics))
}
