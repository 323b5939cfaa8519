use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::money::{round_money, total_with_vat};
use crate::core::shared::schema::station_bills;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::finance::payment::{apply_payment, settle_status, zero, PaymentRequest};
use crate::finance::{
    post_ledger_entry, reject_payment_status, LedgerEntry, LedgerSourceType, PaymentResponse,
    PaymentStatus,
};
use crate::security::{ActionBody, ApiPath, FilterQuery, ValidatedJson};

use super::types::{CreateBillRequest, ListBillsQuery, StationBill, UpdateBillRequest};

pub async fn handle_list_bills(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListBillsQuery>,
) -> Result<Json<Vec<StationBill>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = station_bills::table.into_boxed();
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(station_bills::station_id.eq(station_id));
        }
        if let Some(status) = query.status {
            db_query = db_query.filter(station_bills::status.eq(status));
        }
        if let Some(bill_type) = query.bill_type {
            db_query = db_query.filter(station_bills::bill_type.eq(bill_type));
        }
        Ok(db_query
            .order((station_bills::due_date.asc(), station_bills::id.asc()))
            .load::<StationBill>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_bill(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StationBill>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        station_bills::table
            .find(id)
            .first::<StationBill>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Bill"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_bill(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateBillRequest>,
) -> Result<(StatusCode, Json<StationBill>), ApiError> {
    reject_payment_status(req.status)?;
    let now = Utc::now();
    let amount = round_money(&req.amount);
    let vat = round_money(&req.vat.unwrap_or_else(zero));
    let bill = StationBill {
        id: Uuid::new_v4(),
        station_id: req.station_id,
        bill_type: req.bill_type,
        vendor_name: req.vendor_name,
        bill_number: req.bill_number,
        billing_period_start: req.billing_period_start,
        billing_period_end: req.billing_period_end,
        due_date: req.due_date,
        total_amount: total_with_vat(&amount, &vat),
        amount,
        vat,
        currency: req.currency,
        status: req.status.unwrap_or(PaymentStatus::Unpaid),
        paid_amount: zero(),
        payment_date: None,
        payment_method: None,
        payment_reference: None,
        is_recurring: req.is_recurring.unwrap_or(false),
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };

    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(station_bills::table)
            .values(&bill)
            .get_result::<StationBill>(conn)?)
    })
    .await?;
    info!(
        "Recorded {} bill {} for station {} ({} {})",
        row.bill_type, row.id, row.station_id, row.total_amount, row.currency
    );
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_bill(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateBillRequest>,
) -> Result<Json<StationBill>, ApiError> {
    reject_payment_status(req.status)?;
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut bill: StationBill = station_bills::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Bill"))?;

            if let Some(bill_type) = req.bill_type {
                bill.bill_type = bill_type;
            }
            if let Some(vendor_name) = req.vendor_name {
                bill.vendor_name = vendor_name;
            }
            if let Some(bill_number) = req.bill_number {
                bill.bill_number = Some(bill_number);
            }
            if let Some(start) = req.billing_period_start {
                bill.billing_period_start = Some(start);
            }
            if let Some(end) = req.billing_period_end {
                bill.billing_period_end = Some(end);
            }
            if let Some(due_date) = req.due_date {
                bill.due_date = due_date;
            }
            if let Some(amount) = req.amount {
                bill.amount = round_money(&amount);
            }
            if let Some(vat) = req.vat {
                bill.vat = round_money(&vat);
            }
            if let Some(currency) = req.currency {
                bill.currency = currency;
            }
            if let Some(is_recurring) = req.is_recurring {
                bill.is_recurring = is_recurring;
            }
            if let Some(notes) = req.notes {
                bill.notes = Some(notes);
            }
            bill.check_billing_period()?;
            bill.total_amount = total_with_vat(&bill.amount, &bill.vat);
            bill.status = settle_status(
                &bill.total_amount,
                &bill.paid_amount,
                bill.status,
                req.status,
            )?;
            bill.updated_at = Utc::now();

            Ok(diesel::update(station_bills::table.find(id))
                .set(&bill)
                .get_result::<StationBill>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}

/// Records a payment against a bill and posts the matching ledger debit in
/// the same transaction.
pub async fn handle_pay_bill(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ActionBody(req): ActionBody<PaymentRequest>,
) -> Result<Json<PaymentResponse<StationBill>>, ApiError> {
    let response = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut bill: StationBill = station_bills::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Bill"))?;

            let applied = apply_payment(
                &bill.total_amount,
                &bill.paid_amount,
                bill.status,
                req.amount.as_ref(),
            )?;
            let payment_date = req.payment_date.unwrap_or_else(|| Utc::now().date_naive());

            bill.paid_amount = applied.paid_amount;
            bill.status = applied.status;
            bill.payment_date = Some(payment_date);
            if req.payment_method.is_some() {
                bill.payment_method = req.payment_method;
            }
            if req.payment_reference.is_some() {
                bill.payment_reference = req.payment_reference;
            }
            bill.updated_at = Utc::now();

            let record = diesel::update(station_bills::table.find(id))
                .set(&bill)
                .get_result::<StationBill>(conn)?;

            let entry = LedgerEntry::expense_payment(
                LedgerSourceType::StationBill,
                record.id,
                record.bill_type.as_str(),
                format!("Payment of {}", record.describe_payment()),
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
        "Paid {} {} on bill {} (now {})",
        response.ledger_entry.debit,
        response.record.currency,
        response.record.id,
        response.record.status
    );
    Ok(Json(response))
}
