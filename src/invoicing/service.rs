//! Submission pipeline: persisted invoice → row claim → breaker check →
//! ITA call → persisted outcome. The outbound call never runs inside a
//! database transaction; the claim flips the row to `submitted` first so a
//! concurrent submit of the same invoice sees it as taken.

use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::electronic_invoices;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;

use super::client::{ItaError, ItaOutcome};
use super::types::{ElectronicInvoice, ItaSubmissionStatus, RetrySummary};

async fn call_ita(state: &AppState, invoice: &ElectronicInvoice) -> Result<ItaOutcome, ItaError> {
    let Some(permit) = state.ita_breaker.try_acquire() else {
        return Err(ItaError::CircuitOpen);
    };
    let submission = invoice.submission(&state.config.ita.company_vat_number);
    let result = state.ita_client.submit_invoice(&submission).await;
    match &result {
        Ok(_) => permit.succeed(),
        Err(_) => permit.fail(),
    }
    result
}

/// Moves a `pending`/`error` row to `submitted`. Zero rows updated means
/// another request got there first.
async fn claim_for_submission(state: &AppState, invoice: &ElectronicInvoice) -> Result<(), ApiError> {
    let id = invoice.id;
    let claimed = with_conn(&state.conn, move |conn| {
        Ok(diesel::update(
            electronic_invoices::table
                .filter(electronic_invoices::id.eq(id))
                .filter(electronic_invoices::ita_submission_status.eq_any(vec![
                    ItaSubmissionStatus::Pending,
                    ItaSubmissionStatus::Error,
                ])),
        )
        .set((
            electronic_invoices::ita_submission_status.eq(ItaSubmissionStatus::Submitted),
            electronic_invoices::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?)
    })
    .await?;
    if claimed == 0 {
        return Err(ApiError::Conflict(format!(
            "Invoice {} is already being submitted",
            invoice.invoice_number
        )));
    }
    Ok(())
}

/// Submits one invoice and stores the outcome. The returned row reflects the
/// attempt even when the ITA call failed.
pub async fn submit_invoice(
    state: &AppState,
    mut invoice: ElectronicInvoice,
) -> Result<ElectronicInvoice, ApiError> {
    if !invoice.requires_allocation {
        return Err(ApiError::Conflict(format!(
            "Invoice {} is below the allocation threshold",
            invoice.invoice_number
        )));
    }
    if !invoice.ita_submission_status.is_submittable() {
        return Err(ApiError::Conflict(format!(
            "Invoice {} is already {}",
            invoice.invoice_number, invoice.ita_submission_status
        )));
    }

    claim_for_submission(state, &invoice).await?;
    let result = call_ita(state, &invoice).await;
    match &result {
        Ok(outcome) => info!(
            "ITA submission for invoice {}: {:?}",
            invoice.invoice_number, outcome
        ),
        Err(err) => warn!(
            "ITA submission for invoice {} failed: {}",
            invoice.invoice_number, err
        ),
    }
    invoice.record_attempt(&result, Utc::now());
    let outcome = invoice.outcome();

    with_conn(&state.conn, move |conn| {
        Ok(diesel::update(electronic_invoices::table.find(invoice.id))
            .set((
                &outcome,
                electronic_invoices::ita_submission_attempts
                    .eq(electronic_invoices::ita_submission_attempts + 1),
            ))
            .get_result::<ElectronicInvoice>(conn)?)
    })
    .await
}

pub async fn load_invoice(state: &AppState, id: Uuid) -> Result<ElectronicInvoice, ApiError> {
    with_conn(&state.conn, move |conn| {
        electronic_invoices::table
            .find(id)
            .first::<ElectronicInvoice>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Invoice"))
    })
    .await
}

/// Re-submits every invoice in `error`, oldest first.
pub async fn retry_failed(state: &AppState) -> Result<RetrySummary, ApiError> {
    let failed = with_conn(&state.conn, |conn| {
        Ok(electronic_invoices::table
            .filter(electronic_invoices::ita_submission_status.eq(ItaSubmissionStatus::Error))
            .order((
                electronic_invoices::created_at.asc(),
                electronic_invoices::id.asc(),
            ))
            .load::<ElectronicInvoice>(conn)?)
    })
    .await?;

    let mut summary = RetrySummary {
        total: failed.len(),
        ..RetrySummary::default()
    };
    for invoice in failed {
        let updated = submit_invoice(state, invoice).await?;
        if updated.ita_submission_status == ItaSubmissionStatus::Error {
            summary.failed += 1;
        } else {
            summary.successful += 1;
        }
    }
    if summary.total > 0 {
        info!(
            "Retried {} failed ITA submissions: {} succeeded, {} failed",
            summary.total, summary.successful, summary.failed
        );
    }
    Ok(summary)
}
