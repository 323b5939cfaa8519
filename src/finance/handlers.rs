use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::money::{round_money, total_with_vat};
use crate::core::shared::schema::{accounts_payable, ledger_entries};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::core::shared::DbConn;
use crate::security::{ActionBody, ApiPath, FilterQuery, ValidatedJson};

use super::payment::{apply_payment, settle_status, zero, PaymentRequest, PaymentStatus};
use super::types::{
    AccountPayable, CreatePayableRequest, LedgerEntry, LedgerSourceType, ListLedgerQuery,
    ListPayablesQuery, PaymentResponse, UpdatePayableRequest,
};

pub fn post_ledger_entry(conn: &mut DbConn, entry: &LedgerEntry) -> Result<LedgerEntry, ApiError> {
    Ok(diesel::insert_into(ledger_entries::table)
        .values(entry)
        .get_result::<LedgerEntry>(conn)?)
}

/// `paid` and `partially_paid` come only from recorded payments.
pub fn reject_payment_status(status: Option<PaymentStatus>) -> Result<(), ApiError> {
    match status {
        Some(s) if s.is_payment_result() => Err(ApiError::BadRequest(format!(
            "status '{s}' is set by recording a payment"
        ))),
        _ => Ok(()),
    }
}

pub async fn handle_list_ledger(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListLedgerQuery>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = ledger_entries::table.into_boxed();
        if let Some(source_type) = query.source_type {
            db_query = db_query.filter(ledger_entries::source_type.eq(source_type));
        }
        if let Some(account_code) = query.account_code {
            db_query = db_query.filter(ledger_entries::account_code.eq(account_code));
        }
        if let Some(source_id) = query.source_id {
            db_query = db_query.filter(ledger_entries::source_id.eq(source_id));
        }
        Ok(db_query
            .order((
                ledger_entries::entry_date.desc(),
                ledger_entries::created_at.desc(),
                ledger_entries::id.asc(),
            ))
            .load::<LedgerEntry>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_list_payables(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListPayablesQuery>,
) -> Result<Json<Vec<AccountPayable>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = accounts_payable::table.into_boxed();
        if let Some(status) = query.status {
            db_query = db_query.filter(accounts_payable::status.eq(status));
        }
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(accounts_payable::station_id.eq(station_id));
        }
        if let Some(franchisee_id) = query.franchisee_id {
            db_query = db_query.filter(accounts_payable::franchisee_id.eq(franchisee_id));
        }
        Ok(db_query
            .order((accounts_payable::due_date.asc(), accounts_payable::id.asc()))
            .load::<AccountPayable>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_payable(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AccountPayable>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        accounts_payable::table
            .find(id)
            .first::<AccountPayable>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Account payable"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_payable(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreatePayableRequest>,
) -> Result<(StatusCode, Json<AccountPayable>), ApiError> {
    reject_payment_status(req.status)?;
    let now = Utc::now();
    let amount = round_money(&req.amount);
    let vat = round_money(&req.vat.unwrap_or_else(zero));
    let payable = AccountPayable {
        id: Uuid::new_v4(),
        vendor_name: req.vendor_name,
        invoice_number: req.invoice_number,
        description: req.description,
        category: req.category,
        station_id: req.station_id,
        franchisee_id: req.franchisee_id,
        total_amount: total_with_vat(&amount, &vat),
        amount,
        vat,
        currency: req.currency,
        due_date: req.due_date,
        status: req.status.unwrap_or(PaymentStatus::Unpaid),
        paid_amount: zero(),
        payment_date: None,
        payment_method: None,
        payment_reference: None,
        created_at: now,
        updated_at: now,
    };

    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(accounts_payable::table)
            .values(&payable)
            .get_result::<AccountPayable>(conn)?)
    })
    .await?;
    info!(
        "Recorded payable {} from {} ({} {})",
        row.invoice_number, row.vendor_name, row.total_amount, row.currency
    );
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_payable(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePayableRequest>,
) -> Result<Json<AccountPayable>, ApiError> {
    reject_payment_status(req.status)?;
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut payable: AccountPayable = accounts_payable::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Account payable"))?;

            if let Some(vendor_name) = req.vendor_name {
                payable.vendor_name = vendor_name;
            }
            if let Some(invoice_number) = req.invoice_number {
                payable.invoice_number = invoice_number;
            }
            if let Some(description) = req.description {
                payable.description = Some(description);
            }
            if let Some(category) = req.category {
                payable.category = category;
            }
            if let Some(station_id) = req.station_id {
                payable.station_id = Some(station_id);
            }
            if let Some(franchisee_id) = req.franchisee_id {
                payable.franchisee_id = Some(franchisee_id);
            }
            if let Some(amount) = req.amount {
                payable.amount = round_money(&amount);
            }
            if let Some(vat) = req.vat {
                payable.vat = round_money(&vat);
            }
            if let Some(currency) = req.currency {
                payable.currency = currency;
            }
            if let Some(due_date) = req.due_date {
                payable.due_date = due_date;
            }
            payable.total_amount = total_with_vat(&payable.amount, &payable.vat);
            payable.status = settle_status(
                &payable.total_amount,
                &payable.paid_amount,
                payable.status,
                req.status,
            )?;
            payable.updated_at = Utc::now();

            Ok(diesel::update(accounts_payable::table.find(id))
                .set(&payable)
                .get_result::<AccountPayable>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_pay_payable(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ActionBody(req): ActionBody<PaymentRequest>,
) -> Result<Json<PaymentResponse<AccountPayable>>, ApiError> {
    let response = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut payable: AccountPayable = accounts_payable::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Account payable"))?;

            let applied = apply_payment(
                &payable.total_amount,
                &payable.paid_amount,
                payable.status,
                req.amount.as_ref(),
            )?;
            let today = Utc::now().date_naive();
            let payment_date = req.payment_date.unwrap_or(today);

            payable.paid_amount = applied.paid_amount;
            payable.status = applied.status;
            payable.payment_date = Some(payment_date);
            if req.payment_method.is_some() {
                payable.payment_method = req.payment_method;
            }
            if req.payment_reference.is_some() {
                payable.payment_reference = req.payment_reference;
            }
            payable.updated_at = Utc::now();

            let record = diesel::update(accounts_payable::table.find(id))
                .set(&payable)
                .get_result::<AccountPayable>(conn)?;

            let entry = LedgerEntry::expense_payment(
                LedgerSourceType::AccountsPayable,
                record.id,
                &record.category,
                format!(
                    "Payment to {} for invoice {}",
                    record.vendor_name, record.invoice_number
                ),
                applied.amount,
                record.currency.clone(),
                payment_date,
            );
            let ledger_entry = post_ledger_entry(conn, &entry)?;
            Ok(PaymentResponse {
                record,
                ledger_entry,
            })
        })
    })
    .await?;
    info!(
        "Paid {} {} on payable {} (now {})",
        response.ledger_entry.debit,
        response.record.currency,
        response.record.invoice_number,
        response.record.status
    );
    Ok(Json(response))
}
