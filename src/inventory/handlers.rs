use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::money::round_money;
use crate::core::shared::schema::{inventory_movements, spare_parts, station_spare_parts};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::core::shared::DbConn;
use crate::security::{AdminIdentity, ApiPath, FilterQuery, ValidatedJson};

use super::types::{
    apply_delta, AdjustInventoryRequest, CreateSparePartRequest, CreateStationSparePartRequest,
    InventoryMovement, ListMovementsQuery, ListSparePartsQuery, ListStationSparePartsQuery,
    SparePart, SparePartView, StationSparePart, StationSparePartView, StockDelta,
    UpdateSparePartRequest, UpdateStationSparePartRequest,
};

pub async fn handle_list_spare_parts(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListSparePartsQuery>,
) -> Result<Json<Vec<SparePartView>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = spare_parts::table.into_boxed();
        if let Some(category) = query.category {
            db_query = db_query.filter(spare_parts::category.eq(category));
        }
        if let Some(is_active) = query.is_active {
            db_query = db_query.filter(spare_parts::is_active.eq(is_active));
        }
        match query.low_stock {
            Some(true) => {
                db_query =
                    db_query.filter(spare_parts::quantity_in_stock.le(spare_parts::reorder_point));
            }
            Some(false) => {
                db_query =
                    db_query.filter(spare_parts::quantity_in_stock.gt(spare_parts::reorder_point));
            }
            None => {}
        }
        Ok(db_query
            .order((spare_parts::part_number.asc(), spare_parts::id.asc()))
            .load::<SparePart>(conn)?)
    })
    .await?;
    Ok(Json(rows.into_iter().map(SparePartView::from).collect()))
}

pub async fn handle_get_spare_part(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SparePartView>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        spare_parts::table
            .find(id)
            .first::<SparePart>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Spare part"))
    })
    .await?;
    Ok(Json(row.into()))
}

pub async fn handle_create_spare_part(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateSparePartRequest>,
) -> Result<(StatusCode, Json<SparePartView>), ApiError> {
    let now = Utc::now();
    let part = SparePart {
        id: Uuid::new_v4(),
        part_number: req.part_number,
        name: req.name,
        category: req.category,
        description: req.description,
        unit_cost: round_money(&req.unit_cost),
        currency: req.currency,
        quantity_in_stock: req.quantity_in_stock.unwrap_or(0),
        reorder_point: req.reorder_point.unwrap_or(0),
        minimum_stock_level: req.minimum_stock_level.unwrap_or(0),
        supplier_name: req.supplier_name,
        lead_time_days: req.lead_time_days,
        is_active: req.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(spare_parts::table)
            .values(&part)
            .get_result::<SparePart>(conn)?)
    })
    .await?;
    info!("Created spare part {} ({})", row.part_number, row.id);
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn handle_update_spare_part(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateSparePartRequest>,
) -> Result<Json<SparePartView>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut part: SparePart = spare_parts::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Spare part"))?;

            if let Some(name) = req.name {
                part.name = name;
            }
            if let Some(category) = req.category {
                part.category = category;
            }
            if let Some(description) = req.description {
                part.description = Some(description);
            }
            if let Some(unit_cost) = req.unit_cost {
                part.unit_cost = round_money(&unit_cost);
            }
            if let Some(currency) = req.currency {
                part.currency = currency;
            }
            if let Some(reorder_point) = req.reorder_point {
                part.reorder_point = reorder_point;
            }
            if let Some(minimum) = req.minimum_stock_level {
                part.minimum_stock_level = minimum;
            }
            if let Some(supplier_name) = req.supplier_name {
                part.supplier_name = Some(supplier_name);
            }
            if let Some(lead_time_days) = req.lead_time_days {
                part.lead_time_days = Some(lead_time_days);
            }
            if let Some(is_active) = req.is_active {
                part.is_active = is_active;
            }
            part.updated_at = Utc::now();

            Ok(diesel::update(spare_parts::table.find(id))
                .set(&part)
                .get_result::<SparePart>(conn)?)
        })
    })
    .await?;
    Ok(Json(row.into()))
}

pub async fn handle_list_station_spare_parts(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListStationSparePartsQuery>,
) -> Result<Json<Vec<StationSparePartView>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = station_spare_parts::table.into_boxed();
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(station_spare_parts::station_id.eq(station_id));
        }
        if let Some(spare_part_id) = query.spare_part_id {
            db_query = db_query.filter(station_spare_parts::spare_part_id.eq(spare_part_id));
        }
        Ok(db_query
            .order((
                station_spare_parts::station_id.asc(),
                station_spare_parts::spare_part_id.asc(),
            ))
            .load::<StationSparePart>(conn)?)
    })
    .await?;
    Ok(Json(rows.into_iter().map(StationSparePartView::from).collect()))
}

pub async fn handle_get_station_spare_part(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StationSparePartView>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        station_spare_parts::table
            .find(id)
            .first::<StationSparePart>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Station spare part"))
    })
    .await?;
    Ok(Json(row.into()))
}

pub async fn handle_create_station_spare_part(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateStationSparePartRequest>,
) -> Result<(StatusCode, Json<StationSparePartView>), ApiError> {
    let now = Utc::now();
    let allocation = StationSparePart {
        id: Uuid::new_v4(),
        station_id: req.station_id,
        spare_part_id: req.spare_part_id,
        quantity: req.quantity.unwrap_or(0),
        minimum_quantity: req.minimum_quantity.unwrap_or(0),
        last_restocked_at: None,
        created_at: now,
        updated_at: now,
    };

    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(station_spare_parts::table)
            .values(&allocation)
            .get_result::<StationSparePart>(conn)?)
    })
    .await?;
    info!(
        "Tracking spare part {} at station {}",
        row.spare_part_id, row.station_id
    );
    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn handle_update_station_spare_part(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateStationSparePartRequest>,
) -> Result<Json<StationSparePartView>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut allocation: StationSparePart = station_spare_parts::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Station spare part"))?;

            if let Some(minimum_quantity) = req.minimum_quantity {
                allocation.minimum_quantity = minimum_quantity;
            }
            allocation.updated_at = Utc::now();

            Ok(diesel::update(station_spare_parts::table.find(id))
                .set(&allocation)
                .get_result::<StationSparePart>(conn)?)
        })
    })
    .await?;
    Ok(Json(row.into()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentResponse {
    pub spare_part: SparePartView,
    pub station_spare_part: Option<StationSparePartView>,
    pub movement: InventoryMovement,
}

/// Locks the station's row for this part, creating an empty one when stock
/// is arriving at a station that never held it.
fn lock_station_stock(
    conn: &mut DbConn,
    station_id: Uuid,
    spare_part_id: Uuid,
    incoming: bool,
) -> Result<StationSparePart, ApiError> {
    let existing = station_spare_parts::table
        .filter(station_spare_parts::station_id.eq(station_id))
        .filter(station_spare_parts::spare_part_id.eq(spare_part_id))
        .for_update()
        .first::<StationSparePart>(conn)
        .optional()?;
    match existing {
        Some(row) => Ok(row),
        None if incoming => {
            let now = Utc::now();
            let row = StationSparePart {
                id: Uuid::new_v4(),
                station_id,
                spare_part_id,
                quantity: 0,
                minimum_quantity: 0,
                last_restocked_at: None,
                created_at: now,
                updated_at: now,
            };
            Ok(diesel::insert_into(station_spare_parts::table)
                .values(&row)
                .get_result(conn)?)
        }
        None => Err(ApiError::Conflict(format!(
            "Station {station_id} holds no stock of spare part {spare_part_id}"
        ))),
    }
}

/// Moves stock between the warehouse and a station, recording the movement.
/// Every change happens under row locks in one transaction and no count may
/// drop below zero.
pub async fn handle_adjust_inventory(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminIdentity>,
    ValidatedJson(req): ValidatedJson<AdjustInventoryRequest>,
) -> Result<(StatusCode, Json<AdjustmentResponse>), ApiError> {
    let response = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let delta = StockDelta::plan(req.movement_type, req.quantity, req.station_id.is_some());
            let now = Utc::now();

            let mut part: SparePart = spare_parts::table
                .find(req.spare_part_id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::BadRequest("Unknown sparePartId".to_string()))?;

            if delta.warehouse != 0 {
                part.quantity_in_stock =
                    apply_delta(part.quantity_in_stock, delta.warehouse, "warehouse")?;
                part.updated_at = now;
                part = diesel::update(spare_parts::table.find(part.id))
                    .set(&part)
                    .get_result(conn)?;
            }

            let station_row = match req.station_id {
                Some(station_id) if delta.station != 0 => {
                    let mut row =
                        lock_station_stock(conn, station_id, part.id, delta.station > 0)?;
                    row.quantity = apply_delta(row.quantity, delta.station, "station")?;
                    if delta.station > 0 {
                        row.last_restocked_at = Some(now);
                    }
                    row.updated_at = now;
                    Some(
                        diesel::update(station_spare_parts::table.find(row.id))
                            .set(&row)
                            .get_result::<StationSparePart>(conn)?,
                    )
                }
                _ => None,
            };

            let movement = InventoryMovement {
                id: Uuid::new_v4(),
                spare_part_id: part.id,
                station_id: req.station_id,
                movement_type: req.movement_type,
                quantity: req.quantity,
                reason: req.reason,
                performed_by: Some(admin.subject),
                created_at: now,
            };
            let movement = diesel::insert_into(inventory_movements::table)
                .values(&movement)
                .get_result::<InventoryMovement>(conn)?;

            Ok(AdjustmentResponse {
                spare_part: part.into(),
                station_spare_part: station_row.map(Into::into),
                movement,
            })
        })
    })
    .await?;

    info!(
        "Inventory {} of {} x {} by {}",
        response.movement.movement_type,
        response.movement.quantity,
        response.spare_part.part.part_number,
        response.movement.performed_by.as_deref().unwrap_or("-")
    );
    if response.spare_part.below_minimum {
        warn!(
            "Spare part {} below minimum stock ({} < {})",
            response.spare_part.part.part_number,
            response.spare_part.part.quantity_in_stock,
            response.spare_part.part.minimum_stock_level
        );
    }
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn handle_list_movements(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListMovementsQuery>,
) -> Result<Json<Vec<InventoryMovement>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = inventory_movements::table.into_boxed();
        if let Some(spare_part_id) = query.spare_part_id {
            db_query = db_query.filter(inventory_movements::spare_part_id.eq(spare_part_id));
        }
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(inventory_movements::station_id.eq(station_id));
        }
        Ok(db_query
            .order((
                inventory_movements::created_at.desc(),
                inventory_movements::id.asc(),
            ))
            .load::<InventoryMovement>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}
