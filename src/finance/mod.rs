//! Organizational finance: accounts payable, the expense ledger, and the
//! payment rules shared with station bills.

pub mod handlers;
pub mod payment;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::shared::state::AppState;

pub use handlers::*;
pub use payment::{apply_payment, AppliedPayment, PaymentRequest, PaymentStatus};
pub use types::*;

pub fn configure_finance_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/accounts-payable",
            get(handle_list_payables).post(handle_create_payable),
        )
        .route(
            "/accounts-payable/:id",
            get(handle_get_payable).put(handle_update_payable),
        )
        .route("/accounts-payable/:id/pay", post(handle_pay_payable))
        .route("/ledger", get(handle_list_ledger))
}
