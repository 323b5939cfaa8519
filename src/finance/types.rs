use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::schema::{accounts_payable, ledger_entries};
use crate::security::validation::{Validate, ValidationResult, Validator};

use super::payment::{zero, PaymentStatus};

db_enum! {
    pub enum LedgerSourceType {
        StationBill => "station_bill",
        AccountsPayable => "accounts_payable",
        Manual => "manual",
    }
}

/// Chart-of-accounts code for an expense category. Unknown categories book
/// to general expenses.
pub fn expense_account(category: &str) -> &'static str {
    match category {
        "electricity" => "6110",
        "water" => "6120",
        "internet" => "6130",
        "insurance" => "6140",
        "rent" => "6150",
        "maintenance" => "6160",
        "cleaning_supplies" => "6170",
        "spare_parts" => "6180",
        _ => "6900",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = ledger_entries)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub account_code: String,
    pub description: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub currency: String,
    pub source_type: LedgerSourceType,
    pub source_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Expense debit for a payment against a bill or payable.
    pub fn expense_payment(
        source_type: LedgerSourceType,
        source_id: Uuid,
        category: &str,
        description: String,
        amount: BigDecimal,
        currency: String,
        entry_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_date,
            account_code: expense_account(category).to_string(),
            description,
            debit: amount,
            credit: zero(),
            currency,
            source_type,
            source_id: Some(source_id),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLedgerQuery {
    pub source_type: Option<LedgerSourceType>,
    pub account_code: Option<String>,
    pub source_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = accounts_payable, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayable {
    pub id: Uuid,
    pub vendor_name: String,
    pub invoice_number: String,
    pub description: Option<String>,
    pub category: String,
    pub station_id: Option<Uuid>,
    pub franchisee_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub vat: BigDecimal,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    pub paid_amount: BigDecimal,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayableRequest {
    pub vendor_name: String,
    pub invoice_number: String,
    pub description: Option<String>,
    pub category: String,
    pub station_id: Option<Uuid>,
    pub franchisee_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub vat: Option<BigDecimal>,
    pub currency: String,
    pub due_date: NaiveDate,
    pub status: Option<PaymentStatus>,
}

fn category(validator: Validator, value: &str) -> Validator {
    validator.code(value, "category", 64)
}

impl Validate for CreatePayableRequest {
    const REQUIRED: &'static [&'static str] = &[
        "vendorName",
        "invoiceNumber",
        "category",
        "amount",
        "currency",
        "dueDate",
    ];

    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .text(&self.vendor_name, "vendorName", 200)
            .text(&self.invoice_number, "invoiceNumber", 64)
            .money(&self.amount, "amount")
            .opt(self.vat.as_ref(), |v, vat| v.money(vat, "vat"))
            .currency(&self.currency, "currency");
        category(validator, &self.category).validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayableRequest {
    pub vendor_name: Option<String>,
    pub invoice_number: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub station_id: Option<Uuid>,
    pub franchisee_id: Option<Uuid>,
    pub amount: Option<BigDecimal>,
    pub vat: Option<BigDecimal>,
    pub currency: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<PaymentStatus>,
}

impl Validate for UpdatePayableRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        let validator = Validator::new()
            .opt(self.vendor_name.as_deref(), |v, n| v.text(n, "vendorName", 200))
            .opt(self.invoice_number.as_deref(), |v, n| v.text(n, "invoiceNumber", 64))
            .opt(self.amount.as_ref(), |v, a| v.money(a, "amount"))
            .opt(self.vat.as_ref(), |v, vat| v.money(vat, "vat"))
            .opt(self.currency.as_deref(), |v, c| v.currency(c, "currency"));
        match self.category.as_deref() {
            Some(c) => category(validator, c),
            None => validator,
        }
        .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPayablesQuery {
    pub status: Option<PaymentStatus>,
    pub station_id: Option<Uuid>,
    pub franchisee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse<T: Serialize> {
    #[serde(flatten)]
    pub record: T,
    pub ledger_entry: LedgerEntry,
}
