use axum::{extract::State, http::StatusCode, Json};
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::money::round_money;
use crate::core::shared::schema::franchisees;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::security::{ApiPath, FilterQuery, ValidatedJson};

use super::types::{
    AgreementType, CreateFranchiseeRequest, Franchisee, FranchiseeStatus, ListFranchiseesQuery,
    UpdateFranchiseeRequest,
};

pub async fn handle_list_franchisees(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListFranchiseesQuery>,
) -> Result<Json<Vec<Franchisee>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = franchisees::table.into_boxed();
        if let Some(country_id) = query.country_id {
            db_query = db_query.filter(franchisees::country_id.eq(country_id));
        }
        if let Some(territory_id) = query.territory_id {
            db_query = db_query.filter(franchisees::territory_id.eq(territory_id));
        }
        if let Some(status) = query.status {
            db_query = db_query.filter(franchisees::status.eq(status));
        }
        if let Some(agreement_type) = query.agreement_type {
            db_query = db_query.filter(franchisees::agreement_type.eq(agreement_type));
        }
        Ok(db_query
            .order((franchisees::business_name.asc(), franchisees::id.asc()))
            .load::<Franchisee>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_franchisee(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Franchisee>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        franchisees::table
            .find(id)
            .first::<Franchisee>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Franchisee"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_franchisee(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateFranchiseeRequest>,
) -> Result<(StatusCode, Json<Franchisee>), ApiError> {
    let now = Utc::now();
    let franchisee = Franchisee {
        id: Uuid::new_v4(),
        country_id: req.country_id,
        territory_id: req.territory_id,
        business_name: req.business_name,
        legal_name: req.legal_name,
        tax_id: req.tax_id,
        contact_name: req.contact_name,
        contact_email: req.contact_email,
        contact_phone: req.contact_phone,
        agreement_type: req.agreement_type.unwrap_or(AgreementType::SingleUnit),
        agreement_start_date: req.agreement_start_date,
        agreement_end_date: req.agreement_end_date,
        royalty_percent: req.royalty_percent.unwrap_or_else(BigDecimal::zero),
        marketing_fee_percent: req.marketing_fee_percent.unwrap_or_else(BigDecimal::zero),
        franchise_fee: round_money(&req.franchise_fee.unwrap_or_else(BigDecimal::zero)),
        currency: req.currency,
        status: req.status.unwrap_or(FranchiseeStatus::Pending),
        created_at: now,
        updated_at: now,
    };
    franchisee.check_agreement_dates()?;

    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(franchisees::table)
            .values(&franchisee)
            .get_result::<Franchisee>(conn)?)
    })
    .await?;
    info!("Created franchisee {} ({})", row.business_name, row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_franchisee(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateFranchiseeRequest>,
) -> Result<Json<Franchisee>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut franchisee: Franchisee = franchisees::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Franchisee"))?;

            if let Some(territory_id) = req.territory_id {
                franchisee.territory_id = Some(territory_id);
            }
            if let Some(business_name) = req.business_name {
                franchisee.business_name = business_name;
            }
            if let Some(legal_name) = req.legal_name {
                franchisee.legal_name = Some(legal_name);
            }
            if let Some(tax_id) = req.tax_id {
                franchisee.tax_id = Some(tax_id);
            }
            if let Some(contact_name) = req.contact_name {
                franchisee.contact_name = contact_name;
            }
            if let Some(contact_email) = req.contact_email {
                franchisee.contact_email = contact_email;
            }
            if let Some(contact_phone) = req.contact_phone {
                franchisee.contact_phone = Some(contact_phone);
            }
            if let Some(agreement_type) = req.agreement_type {
                franchisee.agreement_type = agreement_type;
            }
            if let Some(start) = req.agreement_start_date {
                franchisee.agreement_start_date = Some(start);
            }
            if let Some(end) = req.agreement_end_date {
                franchisee.agreement_end_date = Some(end);
            }
            if let Some(royalty_percent) = req.royalty_percent {
                franchisee.royalty_percent = royalty_percent;
            }
            if let Some(marketing_fee_percent) = req.marketing_fee_percent {
                franchisee.marketing_fee_percent = marketing_fee_percent;
            }
            if let Some(franchise_fee) = req.franchise_fee {
                franchisee.franchise_fee = round_money(&franchise_fee);
            }
            if let Some(currency) = req.currency {
                franchisee.currency = currency;
            }
            if let Some(status) = req.status {
                franchisee.status = status;
            }
            franchisee.check_agreement_dates()?;
            franchisee.updated_at = Utc::now();

            Ok(diesel::update(franchisees::table.find(id))
                .set(&franchisee)
                .get_result::<Franchisee>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}
