use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::error::ApiError;
use crate::core::shared::schema::{inventory_movements, spare_parts, station_spare_parts};
use crate::security::validation::{ValidationError, Validate, ValidationResult, Validator};

db_enum! {
    pub enum MovementType {
        Restock => "restock",
        Allocate => "allocate",
        Consume => "consume",
        Return => "return",
        Correction => "correction",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = spare_parts, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct SparePart {
    pub id: Uuid,
    pub part_number: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub unit_cost: BigDecimal,
    pub currency: String,
    pub quantity_in_stock: i32,
    pub reorder_point: i32,
    pub minimum_stock_level: i32,
    pub supplier_name: Option<String>,
    pub lead_time_days: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A spare part as returned by the API, with stock flags computed on read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SparePartView {
    #[serde(flatten)]
    pub part: SparePart,
    pub low_stock: bool,
    pub below_minimum: bool,
}

impl From<SparePart> for SparePartView {
    fn from(part: SparePart) -> Self {
        Self {
            low_stock: part.quantity_in_stock <= part.reorder_point,
            below_minimum: part.quantity_in_stock < part.minimum_stock_level,
            part,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = station_spare_parts, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct StationSparePart {
    pub id: Uuid,
    pub station_id: Uuid,
    pub spare_part_id: Uuid,
    pub quantity: i32,
    pub minimum_quantity: i32,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSparePartView {
    #[serde(flatten)]
    pub allocation: StationSparePart,
    pub low_stock: bool,
}

impl From<StationSparePart> for StationSparePartView {
    fn from(allocation: StationSparePart) -> Self {
        Self {
            low_stock: allocation.quantity <= allocation.minimum_quantity,
            allocation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = inventory_movements)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMovement {
    pub id: Uuid,
    pub spare_part_id: Uuid,
    pub station_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reason: Option<String>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn stock_levels(
    validator: Validator,
    quantity: Option<i32>,
    reorder_point: Option<i32>,
    minimum: Option<i32>,
    lead_time_days: Option<i32>,
) -> Validator {
    validator
        .opt(quantity, |v, q| v.non_negative_int(q, "quantityInStock"))
        .opt(reorder_point, |v, r| v.non_negative_int(r, "reorderPoint"))
        .opt(minimum, |v, m| v.non_negative_int(m, "minimumStockLevel"))
        .opt(lead_time_days, |v, d| v.non_negative_int(d, "leadTimeDays"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSparePartRequest {
    pub part_number: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub unit_cost: BigDecimal,
    pub currency: String,
    pub quantity_in_stock: Option<i32>,
    pub reorder_point: Option<i32>,
    pub minimum_stock_level: Option<i32>,
    pub supplier_name: Option<String>,
    pub lead_time_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for CreateSparePartRequest {
    const REQUIRED: &'static [&'static str] =
        &["partNumber", "name", "category", "unitCost", "currency"];

    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .code(&self.part_number, "partNumber", 64)
            .text(&self.name, "name", 160)
            .code(&self.category, "category", 64)
            .money(&self.unit_cost, "unitCost")
            .currency(&self.currency, "currency")
            .opt(self.supplier_name.as_deref(), |v, s| {
                v.length(s, "supplierName", None, Some(200))
            });
        stock_levels(
            validator,
            self.quantity_in_stock,
            self.reorder_point,
            self.minimum_stock_level,
            self.lead_time_days,
        )
        .validate()
    }
}

/// Stock counts move only through `POST /inventory/adjust`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSparePartRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub unit_cost: Option<BigDecimal>,
    pub currency: Option<String>,
    pub reorder_point: Option<i32>,
    pub minimum_stock_level: Option<i32>,
    pub supplier_name: Option<String>,
    pub lead_time_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateSparePartRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .opt(self.name.as_deref(), |v, n| v.text(n, "name", 160))
            .opt(self.category.as_deref(), |v, c| v.code(c, "category", 64))
            .opt(self.unit_cost.as_ref(), |v, c| v.money(c, "unitCost"))
            .opt(self.currency.as_deref(), |v, c| v.currency(c, "currency"))
            .opt(self.supplier_name.as_deref(), |v, s| {
                v.length(s, "supplierName", None, Some(200))
            });
        stock_levels(
            validator,
            None,
            self.reorder_point,
            self.minimum_stock_level,
            self.lead_time_days,
        )
        .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSparePartsQuery {
    pub category: Option<String>,
    pub low_stock: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStationSparePartRequest {
    pub station_id: Uuid,
    pub spare_part_id: Uuid,
    pub quantity: Option<i32>,
    pub minimum_quantity: Option<i32>,
}

impl Validate for CreateStationSparePartRequest {
    const REQUIRED: &'static [&'static str] = &["stationId", "sparePartId"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.quantity, |v, q| v.non_negative_int(q, "quantity"))
            .opt(self.minimum_quantity, |v, m| v.non_negative_int(m, "minimumQuantity"))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStationSparePartRequest {
    pub minimum_quantity: Option<i32>,
}

impl Validate for UpdateStationSparePartRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.minimum_quantity, |v, m| v.non_negative_int(m, "minimumQuantity"))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStationSparePartsQuery {
    pub station_id: Option<Uuid>,
    pub spare_part_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustInventoryRequest {
    pub spare_part_id: Uuid,
    pub station_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reason: Option<String>,
}

impl Validate for AdjustInventoryRequest {
    const REQUIRED: &'static [&'static str] = &["sparePartId", "movementType", "quantity"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .custom(|| match self.movement_type {
                MovementType::Correction if self.quantity == 0 => {
                    Some(ValidationError::InvalidValue {
                        field: "quantity".to_string(),
                        message: "a correction must change the count".to_string(),
                    })
                }
                MovementType::Correction => None,
                _ if self.quantity <= 0 => Some(ValidationError::InvalidValue {
                    field: "quantity".to_string(),
                    message: "must be greater than zero".to_string(),
                }),
                _ => None,
            })
            .custom(|| {
                let needs_station = matches!(
                    self.movement_type,
                    MovementType::Allocate | MovementType::Consume | MovementType::Return
                );
                (needs_station && self.station_id.is_none())
                    .then(|| ValidationError::Required("stationId".to_string()))
            })
            .opt(self.reason.as_deref(), |v, r| v.length(r, "reason", None, Some(1000)))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMovementsQuery {
    pub spare_part_id: Option<Uuid>,
    pub station_id: Option<Uuid>,
}

/// Signed changes an adjustment makes to warehouse and station stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub warehouse: i32,
    pub station: i32,
}

impl StockDelta {
    pub fn plan(movement: MovementType, quantity: i32, has_station: bool) -> Self {
        match movement {
            MovementType::Restock => Self { warehouse: quantity, station: 0 },
            MovementType::Allocate => Self { warehouse: -quantity, station: quantity },
            MovementType::Return => Self { warehouse: quantity, station: -quantity },
            MovementType::Consume => Self { warehouse: 0, station: -quantity },
            MovementType::Correction if has_station => Self { warehouse: 0, station: quantity },
            MovementType::Correction => Self { warehouse: quantity, station: 0 },
        }
    }
}

/// `current + delta`, refusing to go below zero.
pub fn apply_delta(current: i32, delta: i32, what: &str) -> Result<i32, ApiError> {
    let next = current
        .checked_add(delta)
        .ok_or_else(|| ApiError::BadRequest(format!("{what} quantity out of range")))?;
    if next < 0 {
        return Err(ApiError::Conflict(format!(
            "Insufficient {what} stock: have {current}, need {}",
            -delta
        )));
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_delta_plan() {
        assert_eq!(
            StockDelta::plan(MovementType::Allocate, 3, true),
            StockDelta { warehouse: -3, station: 3 }
        );
        assert_eq!(
            StockDelta::plan(MovementType::Return, 2, true),
            StockDelta { warehouse: 2, station: -2 }
        );
        assert_eq!(
            StockDelta::plan(MovementType::Consume, 1, true),
            StockDelta { warehouse: 0, station: -1 }
        );
        assert_eq!(
            StockDelta::plan(MovementType::Correction, -4, false),
            StockDelta { warehouse: -4, station: 0 }
        );
        assert_eq!(
            StockDelta::plan(MovementType::Correction, -4, true),
            StockDelta { warehouse: 0, station: -4 }
        );
    }

    #[test]
    fn test_apply_delta_never_goes_negative() {
        assert_eq!(apply_delta(5, -5, "warehouse").unwrap(), 0);
        assert_eq!(apply_delta(5, 3, "warehouse").unwrap(), 8);
        assert!(matches!(apply_delta(2, -3, "station"), Err(ApiError::Conflict(_))));
        assert!(matches!(apply_delta(i32::MAX, 1, "warehouse"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_adjust_validation() {
        let req: AdjustInventoryRequest = serde_json::from_value(serde_json::json!({
            "sparePartId": Uuid::nil(),
            "movementType": "allocate",
            "quantity": 0
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field().to_string()).collect();
        assert_eq!(fields, vec!["quantity", "stationId"]);

        let correction: AdjustInventoryRequest = serde_json::from_value(serde_json::json!({
            "sparePartId": Uuid::nil(),
            "movementType": "correction",
            "quantity": -2
        }))
        .unwrap();
        assert!(correction.validate().is_ok());
    }

    #[test]
    fn test_low_stock_flags() {
        let now = Utc::now();
        let part = SparePart {
            id: Uuid::new_v4(),
            part_number: "PUMP-SEAL".into(),
            name: "Pump seal".into(),
            category: "pump".into(),
            description: None,
            unit_cost: BigDecimal::from(45),
            currency: "ILS".into(),
            quantity_in_stock: 4,
            reorder_point: 4,
            minimum_stock_level: 5,
            supplier_name: None,
            lead_time_days: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let view = SparePartView::from(part);
        assert!(view.low_stock);
        assert!(view.below_minimum);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["lowStock"], true);
        assert_eq!(json["partNumber"], "PUMP-SEAL");
    }
}
