use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::error::ApiError;
use crate::core::shared::schema::station_bills;
use crate::finance::PaymentStatus;
use crate::security::validation::{ValidationError, Validate, ValidationResult, Validator};

db_enum! {
    pub enum BillType {
        Electricity => "electricity",
        Water => "water",
        Internet => "internet",
        Insurance => "insurance",
        Rent => "rent",
        Maintenance => "maintenance",
        CleaningSupplies => "cleaning_supplies",
        Other => "other",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = station_bills, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct StationBill {
    pub id: Uuid,
    pub station_id: Uuid,
    pub bill_type: BillType,
    pub vendor_name: String,
    pub bill_number: Option<String>,
    pub billing_period_start: Option<NaiveDate>,
    pub billing_period_end: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub amount: BigDecimal,
    pub vat: BigDecimal,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub paid_amount: BigDecimal,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub is_recurring: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StationBill {
    pub fn check_billing_period(&self) -> Result<(), ApiError> {
        match (self.billing_period_start, self.billing_period_end) {
            (Some(start), Some(end)) if end < start => Err(ApiError::BadRequest(
                "billingPeriodEnd must not be before billingPeriodStart".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn describe_payment(&self) -> String {
        match &self.bill_number {
            Some(number) => format!("{} bill {} from {}", self.bill_type, number, self.vendor_name),
            None => format!("{} bill from {}", self.bill_type, self.vendor_name),
        }
    }
}

fn period(
    validator: Validator,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Validator {
    validator.custom(|| match (start, end) {
        (Some(start), Some(end)) if end < start => Some(ValidationError::InvalidValue {
            field: "billingPeriodEnd".to_string(),
            message: "must not be before billingPeriodStart".to_string(),
        }),
        _ => None,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    pub station_id: Uuid,
    pub bill_type: BillType,
    pub vendor_name: String,
    pub bill_number: Option<String>,
    pub billing_period_start: Option<NaiveDate>,
    pub billing_period_end: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub amount: BigDecimal,
    pub vat: Option<BigDecimal>,
    pub currency: String,
    pub status: Option<PaymentStatus>,
    pub is_recurring: Option<bool>,
    pub notes: Option<String>,
}

impl Validate for CreateBillRequest {
    const REQUIRED: &'static [&'static str] = &[
        "stationId",
        "billType",
        "vendorName",
        "dueDate",
        "amount",
        "currency",
    ];

    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .text(&self.vendor_name, "vendorName", 200)
            .opt(self.bill_number.as_deref(), |v, n| v.length(n, "billNumber", Some(1), Some(64)))
            .money(&self.amount, "amount")
            .opt(self.vat.as_ref(), |v, vat| v.money(vat, "vat"))
            .currency(&self.currency, "currency");
        period(validator, self.billing_period_start, self.billing_period_end).validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillRequest {
    pub bill_type: Option<BillType>,
    pub vendor_name: Option<String>,
    pub bill_number: Option<String>,
    pub billing_period_start: Option<NaiveDate>,
    pub billing_period_end: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub amount: Option<BigDecimal>,
    pub vat: Option<BigDecimal>,
    pub currency: Option<String>,
    pub status: Option<PaymentStatus>,
    pub is_recurring: Option<bool>,
    pub notes: Option<String>,
}

impl Validate for UpdateBillRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .opt(self.vendor_name.as_deref(), |v, n| v.text(n, "vendorName", 200))
            .opt(self.bill_number.as_deref(), |v, n| v.length(n, "billNumber", Some(1), Some(64)))
            .opt(self.amount.as_ref(), |v, a| v.money(a, "amount"))
            .opt(self.vat.as_ref(), |v, vat| v.money(vat, "vat"))
            .opt(self.currency.as_deref(), |v, c| v.currency(c, "currency"));
        period(validator, self.billing_period_start, self.billing_period_end).validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBillsQuery {
    pub station_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    pub bill_type: Option<BillType>,
}
