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

pub fn configure_billing_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bills", get(handle_list_bills).post(handle_create_bill))
        .route("/bills/:id", get(handle_get_bill).put(handle_update_bill))
        .route("/bills/:id/pay", post(handle_pay_bill))
}
