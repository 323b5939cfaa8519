use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::error::ApiError;
use crate::core::shared::jsonb::jsonb_column;
use crate::core::shared::money::round_money;
use crate::core::shared::schema::{maintenance_work_orders, station_assets};
use crate::security::validation::{
    validate_money_scale, ValidationError, Validate, ValidationResult, Validator,
};

db_enum! {
    pub enum AssetType {
        Pump => "pump",
        Heater => "heater",
        Dryer => "dryer",
        Dispenser => "dispenser",
        ControlUnit => "control_unit",
        PaymentTerminal => "payment_terminal",
        Other => "other",
    }
}

db_enum! {
    pub enum AssetStatus {
        Operational => "operational",
        NeedsRepair => "needs_repair",
        UnderRepair => "under_repair",
        Retired => "retired",
    }
}

db_enum! {
    pub enum WorkType {
        Preventive => "preventive",
        Corrective => "corrective",
        Emergency => "emergency",
        Inspection => "inspection",
    }
}

db_enum! {
    pub enum WorkPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

db_enum! {
    pub enum WorkOrderStatus {
        Pending => "pending",
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl WorkOrderStatus {
    pub fn can_transition_to(self, next: WorkOrderStatus) -> bool {
        use WorkOrderStatus::*;
        matches!(
            (self, next),
            (Pending, Scheduled | InProgress | Cancelled)
                | (Scheduled, InProgress | Cancelled)
                | (InProgress, Completed | Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = station_assets, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct StationAsset {
    pub id: Uuid,
    pub station_id: Uuid,
    pub asset_tag: String,
    pub asset_type: AssetType,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<BigDecimal>,
    pub currency: String,
    pub warranty_expiry: Option<NaiveDate>,
    pub status: AssetStatus,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    pub station_id: Uuid,
    pub asset_tag: String,
    pub asset_type: AssetType,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<BigDecimal>,
    pub currency: String,
    pub warranty_expiry: Option<NaiveDate>,
    pub status: Option<AssetStatus>,
    pub next_maintenance_date: Option<NaiveDate>,
}

impl Validate for CreateAssetRequest {
    const REQUIRED: &'static [&'static str] =
        &["stationId", "assetTag", "assetType", "name", "currency"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .code(&self.asset_tag, "assetTag", 64)
            .text(&self.name, "name", 160)
            .opt(self.manufacturer.as_deref(), |v, m| v.length(m, "manufacturer", None, Some(120)))
            .opt(self.model.as_deref(), |v, m| v.length(m, "model", None, Some(120)))
            .opt(self.serial_number.as_deref(), |v, s| {
                v.length(s, "serialNumber", None, Some(120))
            })
            .opt(self.purchase_cost.as_ref(), |v, c| v.money(c, "purchaseCost"))
            .currency(&self.currency, "currency")
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    pub asset_type: Option<AssetType>,
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<BigDecimal>,
    pub currency: Option<String>,
    pub warranty_expiry: Option<NaiveDate>,
    pub status: Option<AssetStatus>,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_maintenance_date: Option<NaiveDate>,
}

impl Validate for UpdateAssetRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.name.as_deref(), |v, n| v.text(n, "name", 160))
            .opt(self.manufacturer.as_deref(), |v, m| v.length(m, "manufacturer", None, Some(120)))
            .opt(self.model.as_deref(), |v, m| v.length(m, "model", None, Some(120)))
            .opt(self.serial_number.as_deref(), |v, s| {
                v.length(s, "serialNumber", None, Some(120))
            })
            .opt(self.purchase_cost.as_ref(), |v, c| v.money(c, "purchaseCost"))
            .opt(self.currency.as_deref(), |v, c| v.currency(c, "currency"))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssetsQuery {
    pub station_id: Option<Uuid>,
    pub status: Option<AssetStatus>,
    pub asset_type: Option<AssetType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spare_part_id: Option<Uuid>,
    pub part_number: String,
    pub quantity: i32,
    pub unit_cost: BigDecimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = diesel::sql_types::Jsonb)]
#[serde(transparent)]
pub struct PartsUsed(pub Vec<PartUsage>);

jsonb_column!(PartsUsed);

impl PartsUsed {
    pub fn cost(&self) -> BigDecimal {
        let total = self
            .0
            .iter()
            .fold(BigDecimal::zero(), |acc, p| acc + &p.unit_cost * BigDecimal::from(p.quantity));
        round_money(&total)
    }

    /// Per-entry rules, then the rolled-up cost must still fit a money column.
    fn validate_into(&self, validator: Validator) -> Validator {
        self.0
            .iter()
            .enumerate()
            .fold(validator, |v, (i, part)| {
                v.text(&part.part_number, &format!("partsUsed[{i}].partNumber"), 64)
                    .custom(|| {
                        (part.quantity <= 0).then(|| ValidationError::InvalidValue {
                            field: format!("partsUsed[{i}].quantity"),
                            message: "must be greater than zero".to_string(),
                        })
                    })
                    .money(&part.unit_cost, &format!("partsUsed[{i}].unitCost"))
            })
            .custom(|| validate_money_scale(&self.cost(), "partsUsed").err())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = maintenance_work_orders, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: Uuid,
    pub work_order_number: String,
    pub station_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub work_type: WorkType,
    pub priority: WorkPriority,
    pub status: WorkOrderStatus,
    pub assigned_to: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub labor_hours: BigDecimal,
    pub labor_cost: BigDecimal,
    pub parts_cost: BigDecimal,
    pub total_cost: BigDecimal,
    pub currency: String,
    pub parts_used: PartsUsed,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `WO-YYYYMMDD-XXXXXX`, the suffix being six random hex digits.
pub fn generate_work_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("WO-{}-{}", now.format("%Y%m%d"), suffix)
}

impl WorkOrder {
    pub fn from_request(req: CreateWorkOrderRequest, now: DateTime<Utc>) -> Self {
        let mut order = Self {
            id: Uuid::new_v4(),
            work_order_number: req
                .work_order_number
                .unwrap_or_else(|| generate_work_order_number(now)),
            station_id: req.station_id,
            asset_id: req.asset_id,
            title: req.title,
            description: req.description,
            work_type: req.work_type.unwrap_or(WorkType::Corrective),
            priority: req.priority.unwrap_or(WorkPriority::Medium),
            status: WorkOrderStatus::Pending,
            assigned_to: req.assigned_to,
            scheduled_date: req.scheduled_date,
            started_at: None,
            completed_at: None,
            labor_hours: req.labor_hours.unwrap_or_else(BigDecimal::zero),
            labor_cost: req.labor_cost.unwrap_or_else(BigDecimal::zero),
            parts_cost: req.parts_cost.unwrap_or_else(BigDecimal::zero),
            total_cost: BigDecimal::zero(),
            currency: req.currency,
            parts_used: req.parts_used.unwrap_or_default(),
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        };
        if order.scheduled_date.is_some() {
            order.status = WorkOrderStatus::Scheduled;
        }
        order.recompute_totals();
        order
    }

    /// Parts cost follows `partsUsed` when parts are listed; total is always
    /// labor plus parts.
    pub fn recompute_totals(&mut self) {
        if !self.parts_used.0.is_empty() {
            self.parts_cost = self.parts_used.cost();
        }
        self.labor_cost = round_money(&self.labor_cost);
        self.parts_cost = round_money(&self.parts_cost);
        self.labor_hours = round_money(&self.labor_hours);
        self.total_cost = round_money(&(&self.labor_cost + &self.parts_cost));
    }

    /// Labor and parts may each be in range while their sum is not.
    pub fn ensure_total_fits(&self) -> Result<(), ApiError> {
        Validator::new().money(&self.total_cost, "totalCost").validate()?;
        Ok(())
    }

    pub fn transition(&mut self, next: WorkOrderStatus, now: DateTime<Utc>) -> Result<(), ApiError> {
        if !self.status.can_transition_to(next) {
            return Err(ApiError::Conflict(format!(
                "Work order {} cannot move from {} to {}",
                self.work_order_number, self.status, next
            )));
        }
        match next {
            WorkOrderStatus::InProgress => self.started_at = Some(now),
            WorkOrderStatus::Completed => {
                self.completed_at = Some(now);
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            _ => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

fn work_order_fields(
    validator: Validator,
    labor_hours: Option<&BigDecimal>,
    labor_cost: Option<&BigDecimal>,
    parts_cost: Option<&BigDecimal>,
    parts_used: Option<&PartsUsed>,
) -> Validator {
    let validator = validator
        .opt(labor_hours, |v, h| v.money(h, "laborHours"))
        .opt(labor_cost, |v, c| v.money(c, "laborCost"))
        .opt(parts_cost, |v, c| v.money(c, "partsCost"));
    match parts_used {
        Some(parts) => parts.validate_into(validator),
        None => validator,
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrderRequest {
    pub work_order_number: Option<String>,
    pub station_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub work_type: Option<WorkType>,
    pub priority: Option<WorkPriority>,
    pub assigned_to: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub labor_hours: Option<BigDecimal>,
    pub labor_cost: Option<BigDecimal>,
    pub parts_cost: Option<BigDecimal>,
    pub currency: String,
    pub parts_used: Option<PartsUsed>,
}

impl Validate for CreateWorkOrderRequest {
    const REQUIRED: &'static [&'static str] = &["stationId", "title", "currency"];

    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .opt(self.work_order_number.as_deref(), |v, n| v.code(n, "workOrderNumber", 40))
            .text(&self.title, "title", 200)
            .opt(self.assigned_to.as_deref(), |v, a| v.length(a, "assignedTo", None, Some(160)))
            .currency(&self.currency, "currency");
        work_order_fields(
            validator,
            self.labor_hours.as_ref(),
            self.labor_cost.as_ref(),
            self.parts_cost.as_ref(),
            self.parts_used.as_ref(),
        )
        .validate()
    }
}

/// Everything but status, which moves through `POST /work-orders/:id/status`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkOrderRequest {
    pub asset_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub work_type: Option<WorkType>,
    pub priority: Option<WorkPriority>,
    pub assigned_to: Option<String>,
    pub scheduled_date: Option<NaiveDate>,
    pub labor_hours: Option<BigDecimal>,
    pub labor_cost: Option<BigDecimal>,
    pub parts_cost: Option<BigDecimal>,
    pub currency: Option<String>,
    pub parts_used: Option<PartsUsed>,
    pub resolution_notes: Option<String>,
}

impl Validate for UpdateWorkOrderRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .opt(self.title.as_deref(), |v, t| v.text(t, "title", 200))
            .opt(self.assigned_to.as_deref(), |v, a| v.length(a, "assignedTo", None, Some(160)))
            .opt(self.currency.as_deref(), |v, c| v.currency(c, "currency"));
        work_order_fields(
            validator,
            self.labor_hours.as_ref(),
            self.labor_cost.as_ref(),
            self.parts_cost.as_ref(),
            self.parts_used.as_ref(),
        )
        .validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderStatusRequest {
    pub status: WorkOrderStatus,
    pub resolution_notes: Option<String>,
}

impl Validate for WorkOrderStatusRequest {
    const REQUIRED: &'static [&'static str] = &["status"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.resolution_notes.as_deref(), |v, n| {
                v.length(n, "resolutionNotes", None, Some(4000))
            })
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWorkOrdersQuery {
    pub station_id: Option<Uuid>,
    pub asset_id: Option<Uuid>,
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<WorkPriority>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn request() -> CreateWorkOrderRequest {
        serde_json::from_value(serde_json::json!({
            "stationId": Uuid::nil(),
            "title": "Replace pump seal",
            "currency": "ILS",
            "laborCost": "300",
            "partsCost": "999.99",
            "partsUsed": [
                { "partNumber": "SEAL-22", "quantity": 2, "unitCost": "45.50" },
                { "partNumber": "HOSE-10", "quantity": 1, "unitCost": "80" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_work_order_number_format() {
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 6, 1, 10, 0, 0).unwrap();
        let number = generate_work_order_number(now);
        assert!(number.starts_with("WO-20240601-"));
        let suffix = &number["WO-20240601-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_totals_follow_parts_used() {
        let order = WorkOrder::from_request(request(), Utc::now());
        assert_eq!(order.parts_cost, dec("171.00"));
        assert_eq!(order.total_cost, dec("471.00"));
        assert_eq!(order.total_cost, &order.labor_cost + &order.parts_cost);
        assert_eq!(order.status, WorkOrderStatus::Pending);
        assert!(order.work_order_number.starts_with("WO-"));
    }

    #[test]
    fn test_transitions() {
        use WorkOrderStatus::*;
        assert!(Pending.can_transition_to(Scheduled));
        assert!(Pending.can_transition_to(InProgress));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(Completed.is_terminal() && Cancelled.is_terminal());
    }

    #[test]
    fn test_transition_stamps_timestamps() {
        let mut order = WorkOrder::from_request(request(), Utc::now());
        assert!(order.transition(WorkOrderStatus::Completed, Utc::now()).is_err());
        order.transition(WorkOrderStatus::InProgress, Utc::now()).unwrap();
        assert!(order.started_at.is_some());
        order.transition(WorkOrderStatus::Completed, Utc::now()).unwrap();
        assert!(order.completed_at.is_some());
        assert!(matches!(
            order.transition(WorkOrderStatus::Cancelled, Utc::now()),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn test_parts_total_must_fit_money_column() {
        let mut req = request();
        req.parts_used = Some(PartsUsed(vec![PartUsage {
            spare_part_id: None,
            part_number: "DRYER-UNIT".into(),
            quantity: i32::MAX,
            unit_cost: dec("9999.99"),
        }]));
        let errors = req.validate().unwrap_err();
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["partsUsed"]);

        let update = UpdateWorkOrderRequest {
            parts_used: req.parts_used.clone(),
            ..UpdateWorkOrderRequest::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_total_of_in_range_parts_can_overflow() {
        let mut order = WorkOrder::from_request(request(), Utc::now());
        assert!(order.ensure_total_fits().is_ok());

        order.parts_used = PartsUsed::default();
        order.labor_cost = dec("9000000000.00");
        order.parts_cost = dec("9000000000.00");
        order.recompute_totals();
        assert!(matches!(
            order.ensure_total_fits(),
            Err(ApiError::Validation(details)) if details[0].field == "totalCost"
        ));
    }

    #[test]
    fn test_parts_used_validation_names_the_entry() {
        let mut req = request();
        req.parts_used.as_mut().unwrap().0[1].quantity = 0;
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.errors()[0].field(), "partsUsed[1].quantity");
    }
}
