pub mod handlers;
pub mod types;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use handlers::*;
pub use types::*;

pub fn configure_geography_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/countries",
            get(handle_list_countries).post(handle_create_country),
        )
        .route(
            "/countries/:id",
            get(handle_get_country).put(handle_update_country),
        )
        .route(
            "/territories",
            get(handle_list_territories).post(handle_create_territory),
        )
        .route(
            "/territories/:id",
            get(handle_get_territory).put(handle_update_territory),
        )
}
