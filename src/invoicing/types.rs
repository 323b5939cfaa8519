use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::money::{round_money, total_with_vat, vat_for};
use crate::core::shared::schema::electronic_invoices;
use crate::security::validation::{Validate, ValidationResult, Validator};

use super::client::{InvoiceSubmission, ItaError, ItaOutcome};

db_enum! {
    pub enum ItaSubmissionStatus {
        Pending => "pending",
        Submitted => "submitted",
        Accepted => "accepted",
        Rejected => "rejected",
        Error => "error",
        NotRequired => "not_required",
    }
}

impl ItaSubmissionStatus {
    pub fn is_submittable(self) -> bool {
        matches!(self, ItaSubmissionStatus::Pending | ItaSubmissionStatus::Error)
    }
}

/// Invoices at or above `threshold` (pre-VAT, whole currency units) need an
/// ITA allocation number.
pub fn requires_allocation(amount_before_vat: &BigDecimal, threshold: u64) -> bool {
    amount_before_vat >= &BigDecimal::from(threshold)
}

pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("INV-{}-{}", now.format("%Y%m%d"), suffix)
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = electronic_invoices, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct ElectronicInvoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub station_id: Option<Uuid>,
    pub franchisee_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_tax_id: Option<String>,
    pub issue_date: NaiveDate,
    pub amount_before_vat: BigDecimal,
    pub vat_rate: BigDecimal,
    pub vat_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub requires_allocation: bool,
    pub ita_submission_status: ItaSubmissionStatus,
    pub ita_allocation_number: Option<String>,
    pub ita_submission_attempts: i32,
    pub ita_last_error: Option<String>,
    pub ita_submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ElectronicInvoice {
    pub fn from_request(req: CreateInvoiceRequest, threshold: u64, now: DateTime<Utc>) -> Self {
        let amount_before_vat = round_money(&req.amount_before_vat);
        let vat_amount = vat_for(&amount_before_vat, &req.vat_rate);
        let requires_allocation = requires_allocation(&amount_before_vat, threshold);
        Self {
            id: Uuid::new_v4(),
            invoice_number: req
                .invoice_number
                .unwrap_or_else(|| generate_invoice_number(now)),
            station_id: req.station_id,
            franchisee_id: req.franchisee_id,
            customer_name: req.customer_name,
            customer_tax_id: req.customer_tax_id,
            issue_date: req.issue_date.unwrap_or_else(|| now.date_naive()),
            total_amount: total_with_vat(&amount_before_vat, &vat_amount),
            amount_before_vat,
            vat_rate: req.vat_rate,
            vat_amount,
            currency: req.currency,
            requires_allocation,
            ita_submission_status: if requires_allocation {
                ItaSubmissionStatus::Pending
            } else {
                ItaSubmissionStatus::NotRequired
            },
            ita_allocation_number: None,
            ita_submission_attempts: 0,
            ita_last_error: None,
            ita_submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn submission(&self, issuer_vat_number: &str) -> InvoiceSubmission {
        InvoiceSubmission {
            invoice_number: self.invoice_number.clone(),
            issuer_vat_number: issuer_vat_number.to_string(),
            customer_name: self.customer_name.clone(),
            customer_vat_number: self.customer_tax_id.clone(),
            issue_date: self.issue_date,
            amount_before_vat: self.amount_before_vat.clone(),
            vat_amount: self.vat_amount.clone(),
            total_amount: self.total_amount.clone(),
            currency: self.currency.clone(),
        }
    }

    /// Folds one submission attempt into the row.
    pub fn record_attempt(&mut self, result: &Result<ItaOutcome, ItaError>, now: DateTime<Utc>) {
        self.ita_submission_attempts += 1;
        self.updated_at = now;
        match result {
            Ok(ItaOutcome::Accepted { allocation_number }) => {
                self.ita_submission_status = ItaSubmissionStatus::Accepted;
                self.ita_allocation_number = Some(allocation_number.clone());
                self.ita_last_error = None;
                self.ita_submitted_at = Some(now);
            }
            Ok(ItaOutcome::Submitted) => {
                self.ita_submission_status = ItaSubmissionStatus::Submitted;
                self.ita_last_error = None;
                self.ita_submitted_at = Some(now);
            }
            Ok(ItaOutcome::Rejected { reason }) => {
                self.ita_submission_status = ItaSubmissionStatus::Rejected;
                self.ita_last_error = Some(reason.clone());
                self.ita_submitted_at = Some(now);
            }
            Err(err) => {
                self.ita_submission_status = ItaSubmissionStatus::Error;
                self.ita_last_error = Some(err.to_string());
            }
        }
    }

    /// The columns a submission attempt writes back.
    pub fn outcome(&self) -> SubmissionOutcome {
        SubmissionOutcome {
            ita_submission_status: self.ita_submission_status,
            ita_allocation_number: self.ita_allocation_number.clone(),
            ita_last_error: self.ita_last_error.clone(),
            ita_submitted_at: self.ita_submitted_at,
            updated_at: self.updated_at,
        }
    }
}

/// Outcome columns only; the attempt counter is bumped in SQL so a stale
/// copy of the row can never roll it back.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = electronic_invoices, treat_none_as_null = true)]
pub struct SubmissionOutcome {
    pub ita_submission_status: ItaSubmissionStatus,
    pub ita_allocation_number: Option<String>,
    pub ita_last_error: Option<String>,
    pub ita_submitted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub invoice_number: Option<String>,
    pub station_id: Option<Uuid>,
    pub franchisee_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_tax_id: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub amount_before_vat: BigDecimal,
    pub vat_rate: BigDecimal,
    pub currency: String,
}

impl Validate for CreateInvoiceRequest {
    const REQUIRED: &'static [&'static str] =
        &["customerName", "amountBeforeVat", "vatRate", "currency"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.invoice_number.as_deref(), |v, n| v.code(n, "invoiceNumber", 64))
            .text(&self.customer_name, "customerName", 200)
            .opt(self.customer_tax_id.as_deref(), |v, t| {
                v.length(t, "customerTaxId", Some(1), Some(40))
            })
            .money(&self.amount_before_vat, "amountBeforeVat")
            .percent(&self.vat_rate, "vatRate")
            .currency(&self.currency, "currency")
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    pub status: Option<ItaSubmissionStatus>,
    pub station_id: Option<Uuid>,
    pub franchisee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetrySummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request(amount: &str) -> CreateInvoiceRequest {
        serde_json::from_value(serde_json::json!({
            "customerName": "Paws Ltd",
            "customerTaxId": "514000000",
            "issueDate": "2024-07-01",
            "amountBeforeVat": amount,
            "vatRate": "17",
            "currency": "ILS"
        }))
        .unwrap()
    }

    #[test]
    fn test_allocation_threshold() {
        let now = Utc::now();
        let below = ElectronicInvoice::from_request(request("19999.99"), 20_000, now);
        assert!(!below.requires_allocation);
        assert_eq!(below.ita_submission_status, ItaSubmissionStatus::NotRequired);

        let at = ElectronicInvoice::from_request(request("20000"), 20_000, now);
        assert!(at.requires_allocation);
        assert_eq!(at.ita_submission_status, ItaSubmissionStatus::Pending);
        assert_eq!(at.vat_amount, BigDecimal::from_str("3400.00").unwrap());
        assert_eq!(at.total_amount, BigDecimal::from_str("23400.00").unwrap());
        assert!(at.invoice_number.starts_with("INV-"));
    }

    #[test]
    fn test_record_attempt() {
        let now = Utc::now();
        let mut invoice = ElectronicInvoice::from_request(request("25000"), 20_000, now);

        invoice.record_attempt(&Err(ItaError::CircuitOpen), now);
        assert_eq!(invoice.ita_submission_status, ItaSubmissionStatus::Error);
        assert_eq!(invoice.ita_submission_attempts, 1);
        assert!(invoice.ita_submitted_at.is_none());
        assert!(invoice.ita_submission_status.is_submittable());

        invoice.record_attempt(
            &Ok(ItaOutcome::Accepted {
                allocation_number: "ALLOC-1".into(),
            }),
            now,
        );
        assert_eq!(invoice.ita_submission_status, ItaSubmissionStatus::Accepted);
        assert_eq!(invoice.ita_allocation_number.as_deref(), Some("ALLOC-1"));
        assert!(invoice.ita_last_error.is_none());
        assert_eq!(invoice.ita_submission_attempts, 2);
        assert!(!invoice.ita_submission_status.is_submittable());
    }

    #[test]
    fn test_outcome_carries_only_attempt_columns() {
        let now = Utc::now();
        let mut invoice = ElectronicInvoice::from_request(request("25000"), 20_000, now);
        invoice.record_attempt(
            &Ok(ItaOutcome::Rejected {
                reason: "customer tax id unknown".into(),
            }),
            now,
        );
        let outcome = invoice.outcome();
        assert_eq!(outcome.ita_submission_status, ItaSubmissionStatus::Rejected);
        assert_eq!(outcome.ita_last_error.as_deref(), Some("customer tax id unknown"));
        assert_eq!(outcome.ita_submitted_at, Some(now));

        let later = now + chrono::Duration::minutes(5);
        invoice.record_attempt(&Err(ItaError::CircuitOpen), later);
        let outcome = invoice.outcome();
        assert_eq!(outcome.ita_submission_status, ItaSubmissionStatus::Error);
        assert_eq!(outcome.ita_submitted_at, Some(now));
        assert_eq!(outcome.updated_at, later);
    }

    #[test]
    fn test_vat_rate_must_be_percent() {
        let mut req = request("100");
        req.vat_rate = BigDecimal::from(117);
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.errors()[0].field(), "vatRate");
    }
}
