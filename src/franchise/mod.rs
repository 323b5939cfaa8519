pub mod handlers;
pub mod types;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use handlers::*;
pub use types::*;

pub fn configure_franchise_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/franchisees",
            get(handle_list_franchisees).post(handle_create_franchisee),
        )
        .route(
            "/franchisees/:id",
            get(handle_get_franchisee).put(handle_update_franchisee),
        )
}
