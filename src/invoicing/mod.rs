//! Electronic invoicing towards the Israeli Tax Authority.

pub mod breaker;
pub mod client;
pub mod handlers;
pub mod service;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
pub use client::{HttpItaClient, InvoiceSubmission, ItaClient, ItaError, ItaOutcome};
pub use handlers::*;
pub use types::*;

pub fn configure_invoicing_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/invoices",
            get(handle_list_invoices).post(handle_create_invoice),
        )
        .route("/invoices/retry-failed", post(handle_retry_failed))
        .route("/invoices/:id", get(handle_get_invoice))
        .route("/invoices/:id/submit", post(handle_submit_invoice))
        .route("/ita/circuit-breaker", get(handle_breaker_status))
        .route("/ita/circuit-breaker/reset", post(handle_breaker_reset))
}
