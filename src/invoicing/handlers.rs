use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::electronic_invoices;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::security::{ApiPath, FilterQuery, ValidatedJson};

use super::breaker::BreakerSnapshot;
use super::service::{load_invoice, retry_failed, submit_invoice};
use super::types::{
    CreateInvoiceRequest, ElectronicInvoice, ItaSubmissionStatus, ListInvoicesQuery, RetrySummary,
};

pub async fn handle_list_invoices(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListInvoicesQuery>,
) -> Result<Json<Vec<ElectronicInvoice>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = electronic_invoices::table.into_boxed();
        if let Some(status) = query.status {
            db_query = db_query.filter(electronic_invoices::ita_submission_status.eq(status));
        }
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(electronic_invoices::station_id.eq(station_id));
        }
        if let Some(franchisee_id) = query.franchisee_id {
            db_query = db_query.filter(electronic_invoices::franchisee_id.eq(franchisee_id));
        }
        Ok(db_query
            .order((
                electronic_invoices::issue_date.desc(),
                electronic_invoices::id.asc(),
            ))
            .load::<ElectronicInvoice>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_invoice(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ElectronicInvoice>, ApiError> {
    Ok(Json(load_invoice(&state, id).await?))
}

/// Persists the invoice as `pending` (or `not_required`) and, when an
/// allocation is needed, submits it straight away. An ITA failure leaves the
/// invoice in `error` for a later retry rather than failing the request.
pub async fn handle_create_invoice(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<ElectronicInvoice>), ApiError> {
    let invoice =
        ElectronicInvoice::from_request(req, state.config.ita.allocation_threshold, Utc::now());
    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(electronic_invoices::table)
            .values(&invoice)
            .get_result::<ElectronicInvoice>(conn)?)
    })
    .await?;
    info!(
        "Issued invoice {} for {} ({} {})",
        row.invoice_number, row.customer_name, row.total_amount, row.currency
    );

    let row = if row.requires_allocation {
        submit_invoice(&state, row).await?
    } else {
        row
    };
    Ok((StatusCode::CREATED, Json(row)))
}

/// Explicit (re)submission. Unlike create, an ITA failure is surfaced as 502
/// after the attempt has been recorded.
pub async fn handle_submit_invoice(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ElectronicInvoice>, ApiError> {
    let invoice = load_invoice(&state, id).await?;
    let row = submit_invoice(&state, invoice).await?;
    if row.ita_submission_status == ItaSubmissionStatus::Error {
        return Err(ApiError::Upstream(
            row.ita_last_error
                .unwrap_or_else(|| "ITA submission failed".to_string()),
        ));
    }
    Ok(Json(row))
}

pub async fn handle_retry_failed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RetrySummary>, ApiError> {
    Ok(Json(retry_failed(&state).await?))
}

pub async fn handle_breaker_status(State(state): State<Arc<AppState>>) -> Json<BreakerSnapshot> {
    Json(state.ita_breaker.snapshot())
}

pub async fn handle_breaker_reset(State(state): State<Arc<AppState>>) -> Json<BreakerSnapshot> {
    state.ita_breaker.reset();
    Json(state.ita_breaker.snapshot())
}
