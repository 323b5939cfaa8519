use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{franchisees, pet_wash_stations, station_alerts};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::security::{ApiPath, FilterQuery, ValidatedJson};
use crate::stations::alerts::AlertStatus;
use crate::stations::types::{
    CreateStationRequest, HealthStatus, ListStationsQuery, OperationalStatus, Station,
    StationMapPoint, UpdateStationRequest,
};

/// QR payload printed on a station when the installer does not supply one.
pub fn default_qr_code(station_code: &str) -> String {
    format!("PETWASH:{station_code}")
}

pub async fn handle_list_stations(
    State(state): State<Arc<AppState>>,
    FilterQuery(query): FilterQuery<ListStationsQuery>,
) -> Result<Json<Vec<Station>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut db_query = pet_wash_stations::table.into_boxed();
        if let Some(franchisee_id) = query.franchisee_id {
            db_query = db_query.filter(pet_wash_stations::franchisee_id.eq(franchisee_id));
        }
        if let Some(territory_id) = query.territory_id {
            db_query = db_query.filter(pet_wash_stations::territory_id.eq(territory_id));
        }
        if let Some(country_id) = query.country_id {
            db_query = db_query.filter(pet_wash_stations::country_id.eq(country_id));
        }
        if let Some(status) = query.operational_status {
            db_query = db_query.filter(pet_wash_stations::operational_status.eq(status));
        }
        if let Some(health) = query.health_status {
            db_query = db_query.filter(pet_wash_stations::health_status.eq(health));
        }
        Ok(db_query
            .order((pet_wash_stations::station_code.asc(), pet_wash_stations::id.asc()))
            .load::<Station>(conn)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn handle_get_station(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Station>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        pet_wash_stations::table
            .find(id)
            .first::<Station>(conn)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Station"))
    })
    .await?;
    Ok(Json(row))
}

pub async fn handle_create_station(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateStationRequest>,
) -> Result<(StatusCode, Json<Station>), ApiError> {
    let now = Utc::now();
    let station = Station {
        id: Uuid::new_v4(),
        franchisee_id: req.franchisee_id,
        territory_id: req.territory_id,
        country_id: req.country_id,
        qr_code: req
            .qr_code
            .unwrap_or_else(|| default_qr_code(&req.station_code)),
        station_code: req.station_code,
        identity_number: req.identity_number,
        name: req.name,
        address: req.address,
        city: req.city,
        latitude: req.latitude,
        longitude: req.longitude,
        operational_status: req.operational_status.unwrap_or(OperationalStatus::Active),
        health_status: HealthStatus::Healthy,
        installation_date: req.installation_date,
        last_maintenance_at: None,
        firmware_version: req.firmware_version,
        operating_hours: req.operating_hours.unwrap_or_default(),
        notes: req.notes,
        created_at: now,
        updated_at: now,
    };

    let row = with_conn(&state.conn, move |conn| {
        Ok(diesel::insert_into(pet_wash_stations::table)
            .values(&station)
            .get_result::<Station>(conn)?)
    })
    .await?;
    info!("Created station {} ({})", row.station_code, row.id);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn handle_update_station(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateStationRequest>,
) -> Result<Json<Station>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let mut station: Station = pet_wash_stations::table
                .find(id)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| ApiError::not_found("Station"))?;

            if let Some(franchisee_id) = req.franchisee_id {
                station.franchisee_id = Some(franchisee_id);
            }
            if let Some(territory_id) = req.territory_id {
                station.territory_id = territory_id;
            }
            if let Some(name) = req.name {
                station.name = name;
            }
            if let Some(address) = req.address {
                station.address = address;
            }
            if let Some(city) = req.city {
                station.city = city;
            }
            if let Some(latitude) = req.latitude {
                station.latitude = Some(latitude);
            }
            if let Some(longitude) = req.longitude {
                station.longitude = Some(longitude);
            }
            if let Some(status) = req.operational_status {
                station.operational_status = status;
            }
            if let Some(date) = req.installation_date {
                station.installation_date = Some(date);
            }
            if let Some(at) = req.last_maintenance_at {
                station.last_maintenance_at = Some(at);
            }
            if let Some(firmware) = req.firmware_version {
                station.firmware_version = Some(firmware);
            }
            if let Some(hours) = req.operating_hours {
                station.operating_hours = hours;
            }
            if let Some(notes) = req.notes {
                station.notes = Some(notes);
            }
            station.updated_at = Utc::now();

            Ok(diesel::update(pet_wash_stations::table.find(id))
                .set(&station)
                .get_result::<Station>(conn)?)
        })
    })
    .await?;
    Ok(Json(row))
}

type MapRow = (
    Uuid,
    String,
    String,
    String,
    Option<f64>,
    Option<f64>,
    OperationalStatus,
    HealthStatus,
    Option<Uuid>,
    Option<String>,
);

/// Stations with coordinates, joined with their franchisee's business name
/// and the number of alerts still open or acknowledged.
pub async fn handle_station_map(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StationMapPoint>>, ApiError> {
    let points = with_conn(&state.conn, move |conn| {
        let rows: Vec<MapRow> = pet_wash_stations::table
            .left_join(franchisees::table)
            .filter(pet_wash_stations::latitude.is_not_null())
            .filter(pet_wash_stations::longitude.is_not_null())
            .order(pet_wash_stations::station_code.asc())
            .select((
                pet_wash_stations::id,
                pet_wash_stations::station_code,
                pet_wash_stations::name,
                pet_wash_stations::city,
                pet_wash_stations::latitude,
                pet_wash_stations::longitude,
                pet_wash_stations::operational_status,
                pet_wash_stations::health_status,
                pet_wash_stations::franchisee_id,
                franchisees::business_name.nullable(),
            ))
            .load(conn)?;

        let open_alerts: HashMap<Uuid, i64> = station_alerts::table
            .filter(station_alerts::status.eq_any(AlertStatus::ACTIVE.to_vec()))
            .group_by(station_alerts::station_id)
            .select((station_alerts::station_id, count_star()))
            .load::<(Uuid, i64)>(conn)?
            .into_iter()
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(
                |(id, code, name, city, lat, lng, operational, health, franchisee_id, franchisee_name)| {
                    Some(StationMapPoint {
                        id,
                        station_code: code,
                        name,
                        city,
                        latitude: lat?,
                        longitude: lng?,
                        operational_status: operational,
                        health_status: health,
                        franchisee_id,
                        franchisee_name,
                        open_alerts: open_alerts.get(&id).copied().unwrap_or(0),
                    })
                },
            )
            .collect::<Vec<_>>())
    })
    .await?;
    Ok(Json(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_qr_code() {
        assert_eq!(default_qr_code("TLV-001"), "PETWASH:TLV-001");
    }
}
