use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::jsonb::jsonb_column;
use crate::core::shared::schema::pet_wash_stations;
use crate::security::validation::{ValidationError, Validate, ValidationResult, Validator};

db_enum! {
    /// Operator-controlled availability of a station.
    pub enum OperationalStatus {
        Active => "active",
        Offline => "offline",
        Maintenance => "maintenance",
        Decommissioned => "decommissioned",
    }
}

db_enum! {
    /// Derived from the station's unresolved alerts, never set by clients.
    pub enum HealthStatus {
        Healthy => "healthy",
        Warning => "warning",
        Critical => "critical",
        Offline => "offline",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<String>,
    #[serde(default)]
    pub closed: bool,
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Jsonb)]
#[serde(rename_all = "camelCase")]
pub struct OperatingHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DayHours>,
}

jsonb_column!(OperatingHours);

impl OperatingHours {
    pub fn days(&self) -> [(&'static str, Option<&DayHours>); 7] {
        [
            ("monday", self.monday.as_ref()),
            ("tuesday", self.tuesday.as_ref()),
            ("wednesday", self.wednesday.as_ref()),
            ("thursday", self.thursday.as_ref()),
            ("friday", self.friday.as_ref()),
            ("saturday", self.saturday.as_ref()),
            ("sunday", self.sunday.as_ref()),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationResult> {
        let mut validator = Validator::new();
        for (day, hours) in self.days() {
            let Some(hours) = hours else { continue };
            if hours.closed {
                continue;
            }
            let open_field = format!("operatingHours.{day}.open");
            let close_field = format!("operatingHours.{day}.close");
            match (hours.open.as_deref(), hours.close.as_deref()) {
                (Some(open), Some(close)) => {
                    validator = validator
                        .time_of_day(open, &open_field)
                        .time_of_day(close, &close_field)
                        .custom(|| {
                            (open >= close).then(|| ValidationError::InvalidValue {
                                field: close_field.clone(),
                                message: "must be later than open".to_string(),
                            })
                        });
                }
                _ => {
                    validator = validator.custom(|| {
                        Some(ValidationError::InvalidValue {
                            field: format!("operatingHours.{day}"),
                            message: "open and close are required unless closed".to_string(),
                        })
                    });
                }
            }
        }
        validator.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = pet_wash_stations, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: Uuid,
    pub franchisee_id: Option<Uuid>,
    pub territory_id: Uuid,
    pub country_id: Uuid,
    pub station_code: String,
    pub identity_number: String,
    pub qr_code: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operational_status: OperationalStatus,
    pub health_status: HealthStatus,
    pub installation_date: Option<NaiveDate>,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    pub firmware_version: Option<String>,
    pub operating_hours: OperatingHours,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn coordinates(
    validator: Validator,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Validator {
    validator
        .opt(latitude, |v, lat| v.range(lat, "latitude", Some(-90.0), Some(90.0)))
        .opt(longitude, |v, lng| v.range(lng, "longitude", Some(-180.0), Some(180.0)))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStationRequest {
    pub franchisee_id: Option<Uuid>,
    pub territory_id: Uuid,
    pub country_id: Uuid,
    pub station_code: String,
    pub identity_number: String,
    pub qr_code: Option<String>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operational_status: Option<OperationalStatus>,
    pub installation_date: Option<NaiveDate>,
    pub firmware_version: Option<String>,
    pub operating_hours: Option<OperatingHours>,
    pub notes: Option<String>,
}

impl Validate for CreateStationRequest {
    const REQUIRED: &'static [&'static str] = &[
        "territoryId",
        "countryId",
        "stationCode",
        "identityNumber",
        "name",
        "address",
        "city",
    ];

    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .code(&self.station_code, "stationCode", 32)
            .code(&self.identity_number, "identityNumber", 64)
            .opt(self.qr_code.as_deref(), |v, qr| v.text(qr, "qrCode", 128))
            .text(&self.name, "name", 160)
            .text(&self.address, "address", 500)
            .text(&self.city, "city", 120)
            .opt(self.firmware_version.as_deref(), |v, fw| {
                v.length(fw, "firmwareVersion", None, Some(40))
            });
        coordinates(validator, self.latitude, self.longitude)
            .nested(self.operating_hours.as_ref().map_or(Ok(()), OperatingHours::validate))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStationRequest {
    pub franchisee_id: Option<Uuid>,
    pub territory_id: Option<Uuid>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub operational_status: Option<OperationalStatus>,
    pub installation_date: Option<NaiveDate>,
    pub last_maintenance_at: Option<DateTime<Utc>>,
    pub firmware_version: Option<String>,
    pub operating_hours: Option<OperatingHours>,
    pub notes: Option<String>,
}

impl Validate for UpdateStationRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .opt(self.name.as_deref(), |v, n| v.text(n, "name", 160))
            .opt(self.address.as_deref(), |v, a| v.text(a, "address", 500))
            .opt(self.city.as_deref(), |v, c| v.text(c, "city", 120))
            .opt(self.firmware_version.as_deref(), |v, fw| {
                v.length(fw, "firmwareVersion", None, Some(40))
            });
        coordinates(validator, self.latitude, self.longitude)
            .nested(self.operating_hours.as_ref().map_or(Ok(()), OperatingHours::validate))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStationsQuery {
    pub franchisee_id: Option<Uuid>,
    pub territory_id: Option<Uuid>,
    pub country_id: Option<Uuid>,
    pub operational_status: Option<OperationalStatus>,
    pub health_status: Option<HealthStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationMapPoint {
    pub id: Uuid,
    pub station_code: String,
    pub name: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub operational_status: OperationalStatus,
    pub health_status: HealthStatus,
    pub franchisee_id: Option<Uuid>,
    pub franchisee_name: Option<String>,
    pub open_alerts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operating_hours_round_trip_shape() {
        let hours: OperatingHours = serde_json::from_value(serde_json::json!({
            "monday": { "open": "07:00", "close": "22:00" },
            "saturday": { "closed": true }
        }))
        .unwrap();
        assert!(hours.validate().is_ok());
        let json = serde_json::to_value(&hours).unwrap();
        assert_eq!(json["monday"]["open"], "07:00");
        assert!(json.get("tuesday").is_none());
    }

    #[test]
    fn test_operating_hours_rejects_inverted_and_partial_days() {
        let hours: OperatingHours = serde_json::from_value(serde_json::json!({
            "monday": { "open": "22:00", "close": "07:00" },
            "friday": { "open": "08:00" },
            "sunday": { "open": "25:00", "close": "26:00" }
        }))
        .unwrap();
        let errors = hours.validate().unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field().to_string()).collect();
        assert!(fields.contains(&"operatingHours.monday.close".to_string()));
        assert!(fields.contains(&"operatingHours.friday".to_string()));
        assert!(fields.contains(&"operatingHours.sunday.open".to_string()));
    }

    #[test]
    fn test_create_station_rejects_bad_coordinates() {
        let req: CreateStationRequest = serde_json::from_value(serde_json::json!({
            "territoryId": Uuid::nil(),
            "countryId": Uuid::nil(),
            "stationCode": "TLV-001",
            "identityNumber": "IL-000001",
            "name": "Dizengoff Center",
            "address": "Dizengoff 50",
            "city": "Tel Aviv",
            "latitude": 132.1,
            "longitude": 34.77
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].field(), "latitude");
    }

    #[test]
    fn test_health_status_is_not_a_create_field() {
        let req: CreateStationRequest = serde_json::from_value(serde_json::json!({
            "territoryId": Uuid::nil(),
            "countryId": Uuid::nil(),
            "stationCode": "TLV-002",
            "identityNumber": "IL-000002",
            "name": "Ramat Aviv",
            "address": "Einstein 40",
            "city": "Tel Aviv",
            "healthStatus": "critical"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }
}
