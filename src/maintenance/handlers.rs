use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::money::round_money;
use crate::core::shared::schema::{maintenance_work_orders, station_assets};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::core::shared::DbConn;
use crate::security::{ActionBody, ApiPath, FilterQuery, ValidatedJson};

use super::types::{
    AssetStatus, CreateAssetRequest, CreateWorkOrderRequest, ListAssetsQuery,
    ListWorkOrdersQuery, StationAsset, UpdateAssetRequest, UpdateWorkOrderRequest, WorkOrder,
    WorkOrderStatus, WorkOrderStatusRequest,
};

pub async fn handle_list_assets(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListAssetsQuery>,
) -> Result<Json<Vec<StationAsset>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = station_assets::table.into_boxed();
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(station_assets::station_id.eq(station_id));
        }
        if let Some(status) = query.status {
            db_query = db_query.filter(station_assets::status.eq(status));
        }
        if let Some(asset_type) = query.asset_type {
            db_query = db_query.filter(station_assets::asset_type.eq(asset_type));
        }
        Ok(db_query
            .order((station_assets::asset_tag.asc(), station_assets::id.asc()))
            .load::<StationAsset>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_asset(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<StationAsset>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        station_assets::table
            .find(id)
            .first::<StationAsset>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Asset"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_asset(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateAssetRequest>,
) -> Result<(StatusCode, Json<StationAsset>), ApiError> {
    let now = Utc::now();
    let asset = StationAsset {
        id: Uuid::new_v4(),
        station_id: req.station_id,
        asset_tag: req.asset_tag,
        asset_type: req.asset_type,
        name: req.name,
        manufacturer: req.manufacturer,
        model: req.model,
        serial_number: req.serial_number,
        purchase_date: req.purchase_date,
        purchase_cost: req.purchase_cost.as_ref().map(round_money),
        currency: req.currency,
        warranty_expiry: req.warranty_expiry,
        status: req.status.unwrap_or(AssetStatus::Operational),
        last_maintenance_date: None,
        next_maintenance_date: req.next_maintenance_date,
        created_at: now,
        updated_at: now,
    };

    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(station_assets::table)
            .values(&asset)
            .get_result::<StationAsset>(conn)?)
    })
    .await?;
    info!("Registered asset {} at station {}", row.asset_tag, row.station_id);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_asset(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAssetRequest>,
) -> Result<Json<StationAsset>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut asset: StationAsset = station_assets::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Asset"))?;

            if let Some(asset_type) = req.asset_type {
                asset.asset_type = asset_type;
            }
            if let Some(name) = req.name {
                asset.name = name;
            }
            if let Some(manufacturer) = req.manufacturer {
                asset.manufacturer = Some(manufacturer);
            }
            if let Some(model) = req.model {
                asset.model = Some(model);
            }
            if let Some(serial_number) = req.serial_number {
                asset.serial_number = Some(serial_number);
            }
            if let Some(purchase_date) = req.purchase_date {
                asset.purchase_date = Some(purchase_date);
            }
            if let Some(purchase_cost) = req.purchase_cost {
                asset.purchase_cost = Some(round_money(&purchase_cost));
            }
            if let Some(currency) = req.currency {
                asset.currency = currency;
            }
            if let Some(warranty_expiry) = req.warranty_expiry {
                asset.warranty_expiry = Some(warranty_expiry);
            }
            if let Some(status) = req.status {
                asset.status = status;
            }
            if let Some(date) = req.last_maintenance_date {
                asset.last_maintenance_date = Some(date);
            }
            if let Some(date) = req.next_maintenance_date {
                asset.next_maintenance_date = Some(date);
            }
            asset.updated_at = Utc::now();

            Ok(diesel::update(station_assets::table.find(id))
                .set(&asset)
                .get_result::<StationAsset>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_list_work_orders(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListWorkOrdersQuery>,
) -> Result<Json<Vec<WorkOrder>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = maintenance_work_orders::table.into_boxed();
        if let Some(station_id) = query.station_id {
            db_query = db_query.filter(maintenance_work_orders::station_id.eq(station_id));
        }
        if let Some(asset_id) = query.asset_id {
            db_query = db_query.filter(maintenance_work_orders::asset_id.eq(asset_id));
        }
        if let Some(status) = query.status {
            db_query = db_query.filter(maintenance_work_orders::status.eq(status));
        }
        if let Some(priority) = query.priority {
            db_query = db_query.filter(maintenance_work_orders::priority.eq(priority));
        }
        Ok(db_query
            .order((
                maintenance_work_orders::created_at.desc(),
                maintenance_work_orders::id.asc(),
            ))
            .load::<WorkOrder>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_work_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<WorkOrder>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        maintenance_work_orders::table
            .find(id)
            .first::<WorkOrder>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Work order"))
    })
    .await?;
    Ok(Json(row))
}

/// A work order may only reference an asset installed at its own station.
fn ensure_asset_at_station(
    conn: &mut DbConn,
    asset_id: Uuid,
    station_id: Uuid,
) -> Result<(), ApiError> {
    let asset_station: Uuid = station_assets::table
        .find(asset_id)
        .select(station_assets::station_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::BadRequest(format!("Asset {asset_id} does not exist")))?;
    if asset_station != station_id {
        return Err(ApiError::BadRequest(
            "assetId belongs to a different station".to_string(),
        ));
    }
    Ok(())
}

/// Inserts a work order after checking that its asset, if any, belongs to
/// the same station.
pub fn insert_work_order(conn: &mut DbConn, order: &WorkOrder) -> Result<WorkOrder, ApiError> {
    if let Some(asset_id) = order.asset_id {
        ensure_asset_at_station(conn, asset_id, order.station_id)?;
    }
    Ok(diesel::insert_into(maintenance_work_orders::table)
        .values(order)
        .get_result::<WorkOrder>(conn)?)
}

pub async fn handle_create_work_order(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateWorkOrderRequest>,
) -> Result<(StatusCode, Json<WorkOrder>), ApiError> {
    let order = WorkOrder::from_request(req, Utc::now());
    order.ensure_total_fits()?;
    let row = with_conn(&state.conn, move |conn| insert_work_order(conn, &order)).await?;
    info!(
        "Opened work order {} for station {} ({})",
        row.work_order_number, row.station_id, row.priority
    );
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_work_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateWorkOrderRequest>,
) -> Result<Json<WorkOrder>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut order: WorkOrder = maintenance_work_orders::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Work order"))?;

            if let Some(asset_id) = req.asset_id {
                ensure_asset_at_station(conn, asset_id, order.station_id)?;
                order.asset_id = Some(asset_id);
            }
            if let Some(title) = req.title {
                order.title = title;
            }
            if let Some(description) = req.description {
                order.description = Some(description);
            }
            if let Some(work_type) = req.work_type {
                order.work_type = work_type;
            }
            if let Some(priority) = req.priority {
                order.priority = priority;
            }
            if let Some(assigned_to) = req.assigned_to {
                order.assigned_to = Some(assigned_to);
            }
            if let Some(scheduled_date) = req.scheduled_date {
                order.scheduled_date = Some(scheduled_date);
            }
            if let Some(labor_hours) = req.labor_hours {
                order.labor_hours = labor_hours;
            }
            if let Some(labor_cost) = req.labor_cost {
                order.labor_cost = labor_cost;
            }
            if let Some(parts_cost) = req.parts_cost {
                order.parts_cost = parts_cost;
            }
            if let Some(currency) = req.currency {
                order.currency = currency;
            }
            if let Some(parts_used) = req.parts_used {
                order.parts_used = parts_used;
            }
            if let Some(notes) = req.resolution_notes {
                order.resolution_notes = Some(notes);
            }
            order.recompute_totals();
            order.ensure_total_fits()?;
            order.updated_at = Utc::now();

            Ok(diesel::update(maintenance_work_orders::table.find(id))
                .set(&order)
                .get_result::<WorkOrder>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_work_order_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ActionBody(req): ActionBody<WorkOrderStatusRequest>,
) -> Result<Json<WorkOrder>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut order: WorkOrder = maintenance_work_orders::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Work order"))?;

            let now = Utc::now();
            order.transition(req.status, now)?;
            if let Some(notes) = req.resolution_notes {
                order.resolution_notes = Some(notes);
            }

            if order.status == WorkOrderStatus::Completed {
                if let Some(asset_id) = order.asset_id {
                    diesel::update(station_assets::table.find(asset_id))
                        .set((
                            station_assets::last_maintenance_date.eq(now.date_naive()),
                            station_assets::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                }
            }

            Ok(diesel::update(maintenance_work_orders::table.find(id))
                .set(&order)
                .get_result::<WorkOrder>(conn)?)
        })
    })
    .await?;
    info!("Work order {} is now {}", row.work_order_number, row.status);
    Ok(Json(row))
}
