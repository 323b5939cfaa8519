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

pub fn configure_subscription_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/subscription-plans",
            get(handle_list_plans).post(handle_create_plan),
        )
        .route(
            "/subscription-plans/:id",
            get(handle_get_plan).put(handle_update_plan),
        )
        .route(
            "/subscriptions",
            get(handle_list_subscriptions).post(handle_create_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(handle_get_subscription).put(handle_update_subscription),
        )
        .route("/subscriptions/:id/redeem", post(handle_redeem_credits))
        .route("/subscriptions/:id/renew", post(handle_renew_subscription))
}
