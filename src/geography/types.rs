use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::schema::{countries, franchise_territories};
use crate::security::validation::{Validate, ValidationResult, Validator};

db_enum! {
    pub enum TerritoryStatus {
        Planning => "planning",
        Active => "active",
        Saturated => "saturated",
        Closed => "closed",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = countries, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub currency_code: String,
    pub timezone: String,
    pub vat_rate: BigDecimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = franchise_territories, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseTerritory {
    pub id: Uuid,
    pub country_id: Uuid,
    pub territory_code: String,
    pub name: String,
    pub region: Option<String>,
    pub status: TerritoryStatus,
    pub population: Option<i32>,
    pub max_stations: Option<i32>,
    pub is_exclusive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCountryRequest {
    pub code: String,
    pub name: String,
    pub currency_code: String,
    pub timezone: String,
    pub vat_rate: Option<BigDecimal>,
    pub is_active: Option<bool>,
}

impl Validate for CreateCountryRequest {
    const REQUIRED: &'static [&'static str] = &["code", "name", "currencyCode", "timezone"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .country_code(&self.code, "code")
            .text(&self.name, "name", 120)
            .currency(&self.currency_code, "currencyCode")
            .text(&self.timezone, "timezone", 64)
            .opt(self.vat_rate.as_ref(), |v, rate| v.percent(rate, "vatRate"))
            .validate()
    }
}

/// `code` is the country's identity and is not updatable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCountryRequest {
    pub name: Option<String>,
    pub currency_code: Option<String>,
    pub timezone: Option<String>,
    pub vat_rate: Option<BigDecimal>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateCountryRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.name.as_deref(), |v, name| v.text(name, "name", 120))
            .opt(self.currency_code.as_deref(), |v, c| v.currency(c, "currencyCode"))
            .opt(self.timezone.as_deref(), |v, tz| v.text(tz, "timezone", 64))
            .opt(self.vat_rate.as_ref(), |v, rate| v.percent(rate, "vatRate"))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCountriesQuery {
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTerritoryRequest {
    pub country_id: Uuid,
    pub territory_code: String,
    pub name: String,
    pub region: Option<String>,
    pub status: Option<TerritoryStatus>,
    pub population: Option<i32>,
    pub max_stations: Option<i32>,
    pub is_exclusive: Option<bool>,
}

impl Validate for CreateTerritoryRequest {
    const REQUIRED: &'static [&'static str] = &["countryId", "territoryCode", "name"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .code(&self.territory_code, "territoryCode", 32)
            .text(&self.name, "name", 160)
            .opt(self.region.as_deref(), |v, r| v.length(r, "region", None, Some(120)))
            .opt(self.population, |v, p| v.non_negative_int(p, "population"))
            .opt(self.max_stations, |v, m| v.non_negative_int(m, "maxStations"))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTerritoryRequest {
    pub territory_code: Option<String>,
    pub name: Option<String>,
    pub region: Option<String>,
    pub status: Option<TerritoryStatus>,
    pub population: Option<i32>,
    pub max_stations: Option<i32>,
    pub is_exclusive: Option<bool>,
}

impl Validate for UpdateTerritoryRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.territory_code.as_deref(), |v, c| v.code(c, "territoryCode", 32))
            .opt(self.name.as_deref(), |v, n| v.text(n, "name", 160))
            .opt(self.region.as_deref(), |v, r| v.length(r, "region", None, Some(120)))
            .opt(self.population, |v, p| v.non_negative_int(p, "population"))
            .opt(self.max_stations, |v, m| v.non_negative_int(m, "maxStations"))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTerritoriesQuery {
    pub country_id: Option<Uuid>,
    pub status: Option<TerritoryStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_country_validation() {
        let req = CreateCountryRequest {
            code: "il".into(),
            name: "Israel".into(),
            currency_code: "ILS".into(),
            timezone: "Asia/Jerusalem".into(),
            vat_rate: Some(BigDecimal::from_str("118").unwrap()),
            is_active: None,
        };
        let errors = req.validate().unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["code", "vatRate"]);
    }

    #[test]
    fn test_territory_status_from_json() {
        let req: CreateTerritoryRequest = serde_json::from_value(serde_json::json!({
            "countryId": Uuid::nil(),
            "territoryCode": "IL-TA",
            "name": "Tel Aviv",
            "status": "saturated"
        }))
        .unwrap();
        assert_eq!(req.status, Some(TerritoryStatus::Saturated));
        assert!(req.validate().is_ok());

        let bad = serde_json::from_value::<CreateTerritoryRequest>(serde_json::json!({
            "countryId": Uuid::nil(),
            "territoryCode": "IL-TA",
            "name": "Tel Aviv",
            "status": "booming"
        }));
        assert!(bad.is_err());
    }
}
