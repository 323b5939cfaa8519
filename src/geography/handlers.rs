use axum::{extract::State, http::StatusCode, Json};
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{countries, franchise_territories};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::security::{ApiPath, FilterQuery, ValidatedJson};

use super::types::{
    Country, CreateCountryRequest, CreateTerritoryRequest, FranchiseTerritory,
    ListCountriesQuery, ListTerritoriesQuery, TerritoryStatus, UpdateCountryRequest,
    UpdateTerritoryRequest,
};

pub async fn handle_list_countries(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListCountriesQuery>,
) -> Result<Json<Vec<Country>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = countries::table.into_boxed();
        if let Some(is_active) = query.is_active {
            db_query = db_query.filter(countries::is_active.eq(is_active));
        }
        Ok(db_query.order(countries::code.asc()).load::<Country>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_country(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Country>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        countries::table
            .find(id)
            .first::<Country>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Country"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_country(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateCountryRequest>,
) -> Result<(StatusCode, Json<Country>), ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        let now = Utc::now();
        let country = Country {
            id: Uuid::new_v4(),
            code: req.code,
            name: req.name,
            currency_code: req.currency_code,
            timezone: req.timezone,
            vat_rate: req.vat_rate.unwrap_or_else(BigDecimal::zero),
            is_active: req.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        Ok(diesel::insert_into(countries::table)
            .values(&country)
            .get_result::<Country>(conn)?)
    })
    .await?;
    info!("Created country {} ({})", row.code, row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_country(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCountryRequest>,
) -> Result<Json<Country>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut country: Country = countries::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Country"))?;

            if let Some(name) = req.name {
                country.name = name;
            }
            if let Some(currency_code) = req.currency_code {
                country.currency_code = currency_code;
            }
            if let Some(timezone) = req.timezone {
                country.timezone = timezone;
            }
            if let Some(vat_rate) = req.vat_rate {
                country.vat_rate = vat_rate;
            }
            if let Some(is_active) = req.is_active {
                country.is_active = is_active;
            }
            country.updated_at = Utc::now();

            Ok(diesel::update(countries::table.find(id))
                .set(&country)
                .get_result::<Country>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_list_territories(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListTerritoriesQuery>,
) -> Result<Json<Vec<FranchiseTerritory>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = franchise_territories::table.into_boxed();
        if let Some(country_id) = query.country_id {
            db_query = db_query.filter(franchise_territories::country_id.eq(country_id));
        }
        if let Some(status) = query.status {
            db_query = db_query.filter(franchise_territories::status.eq(status));
        }
        Ok(db_query
            .order(franchise_territories::territory_code.asc())
            .load::<FranchiseTerritory>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_territory(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<FranchiseTerritory>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        franchise_territories::table
            .find(id)
            .first::<FranchiseTerritory>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Territory"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_territory(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateTerritoryRequest>,
) -> Result<(StatusCode, Json<FranchiseTerritory>), ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        let now = Utc::now();
        let territory = FranchiseTerritory {
            id: Uuid::new_v4(),
            country_id: req.country_id,
            territory_code: req.territory_code,
            name: req.name,
            region: req.region,
            status: req.status.unwrap_or(TerritoryStatus::Planning),
            population: req.population,
            max_stations: req.max_stations,
            is_exclusive: req.is_exclusive.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };
        Ok(diesel::insert_into(franchise_territories::table)
            .values(&territory)
            .get_result::<FranchiseTerritory>(conn)?)
    })
    .await?;
    info!("Created territory {} ({})", row.territory_code, row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_territory(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTerritoryRequest>,
) -> Result<Json<FranchiseTerritory>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut territory: FranchiseTerritory = franchise_territories::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Territory"))?;

            if let Some(territory_code) = req.territory_code {
                territory.territory_code = territory_code;
            }
            if let Some(name) = req.name {
                territory.name = name;
            }
            if let Some(region) = req.region {
                territory.region = Some(region);
            }
            if let Some(status) = req.status {
                territory.status = status;
            }
            if let Some(population) = req.population {
                territory.population = Some(population);
            }
            if let Some(max_stations) = req.max_stations {
                territory.max_stations = Some(max_stations);
            }
            if let Some(is_exclusive) = req.is_exclusive {
                territory.is_exclusive = is_exclusive;
            }
            territory.updated_at = Utc::now();

            Ok(diesel::update(franchise_territories::table.find(id))
                .set(&territory)
                .get_result::<FranchiseTerritory>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}
