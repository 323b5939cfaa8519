use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::db_enum;
use crate::core::shared::error::ApiError;
use crate::core::shared::schema::franchisees;
use crate::security::validation::{Validate, ValidationResult, Validator};

db_enum! {
    pub enum AgreementType {
        SingleUnit => "single_unit",
        MultiUnit => "multi_unit",
        AreaDeveloper => "area_developer",
        Master => "master",
    }
}

db_enum! {
    pub enum FranchiseeStatus {
        Active => "active",
        Suspended => "suspended",
        Terminated => "terminated",
        Pending => "pending",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = franchisees, treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct Franchisee {
    pub id: Uuid,
    pub country_id: Uuid,
    pub territory_id: Option<Uuid>,
    pub business_name: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub agreement_type: AgreementType,
    pub agreement_start_date: Option<NaiveDate>,
    pub agreement_end_date: Option<NaiveDate>,
    pub royalty_percent: BigDecimal,
    pub marketing_fee_percent: BigDecimal,
    pub franchise_fee: BigDecimal,
    pub currency: String,
    pub status: FranchiseeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Franchisee {
    pub fn check_agreement_dates(&self) -> Result<(), ApiError> {
        match (self.agreement_start_date, self.agreement_end_date) {
            (Some(start), Some(end)) if end < start => Err(ApiError::BadRequest(
                "agreementEndDate must not be before agreementStartDate".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFranchiseeRequest {
    pub country_id: Uuid,
    pub territory_id: Option<Uuid>,
    pub business_name: String,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub agreement_type: Option<AgreementType>,
    pub agreement_start_date: Option<NaiveDate>,
    pub agreement_end_date: Option<NaiveDate>,
    pub royalty_percent: Option<BigDecimal>,
    pub marketing_fee_percent: Option<BigDecimal>,
    pub franchise_fee: Option<BigDecimal>,
    pub currency: String,
    pub status: Option<FranchiseeStatus>,
}

impl Validate for CreateFranchiseeRequest {
    const REQUIRED: &'static [&'static str] = &[
        "countryId",
        "businessName",
        "contactName",
        "contactEmail",
        "currency",
    ];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .text(&self.business_name, "businessName", 200)
            .opt(self.legal_name.as_deref(), |v, n| v.length(n, "legalName", None, Some(200)))
            .opt(self.tax_id.as_deref(), |v, t| v.length(t, "taxId", None, Some(40)))
            .text(&self.contact_name, "contactName", 160)
            .email(&self.contact_email, "contactEmail")
            .opt(self.contact_phone.as_deref(), |v, p| v.phone(p, "contactPhone"))
            .opt(self.royalty_percent.as_ref(), |v, p| v.percent(p, "royaltyPercent"))
            .opt(self.marketing_fee_percent.as_ref(), |v, p| {
                v.percent(p, "marketingFeePercent")
            })
            .opt(self.franchise_fee.as_ref(), |v, f| v.money(f, "franchiseFee"))
            .currency(&self.currency, "currency")
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFranchiseeRequest {
    pub territory_id: Option<Uuid>,
    pub business_name: Option<String>,
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub agreement_type: Option<AgreementType>,
    pub agreement_start_date: Option<NaiveDate>,
    pub agreement_end_date: Option<NaiveDate>,
    pub royalty_percent: Option<BigDecimal>,
    pub marketing_fee_percent: Option<BigDecimal>,
    pub franchise_fee: Option<BigDecimal>,
    pub currency: Option<String>,
    pub status: Option<FranchiseeStatus>,
}

impl Validate for UpdateFranchiseeRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.business_name.as_deref(), |v, n| v.text(n, "businessName", 200))
            .opt(self.legal_name.as_deref(), |v, n| v.length(n, "legalName", None, Some(200)))
            .opt(self.tax_id.as_deref(), |v, t| v.length(t, "taxId", None, Some(40)))
            .opt(self.contact_name.as_deref(), |v, n| v.text(n, "contactName", 160))
            .opt(self.contact_email.as_deref(), |v, e| v.email(e, "contactEmail"))
            .opt(self.contact_phone.as_deref(), |v, p| v.phone(p, "contactPhone"))
            .opt(self.royalty_percent.as_ref(), |v, p| v.percent(p, "royaltyPercent"))
            .opt(self.marketing_fee_percent.as_ref(), |v, p| {
                v.percent(p, "marketingFeePercent")
            })
            .opt(self.franchise_fee.as_ref(), |v, f| v.money(f, "franchiseFee"))
            .opt(self.currency.as_deref(), |v, c| v.currency(c, "currency"))
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFranchiseesQuery {
    pub country_id: Option<Uuid>,
    pub territory_id: Option<Uuid>,
    pub status: Option<FranchiseeStatus>,
    pub agreement_type: Option<AgreementType>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::Zero;

    fn sample() -> Franchisee {
        let now = Utc::now();
        Franchisee {
            id: Uuid::new_v4(),
            country_id: Uuid::new_v4(),
            territory_id: None,
            business_name: "Clean Paws Ltd".into(),
            legal_name: None,
            tax_id: None,
            contact_name: "Dana Levi".into(),
            contact_email: "dana@cleanpaws.co.il".into(),
            contact_phone: None,
            agreement_type: AgreementType::SingleUnit,
            agreement_start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            agreement_end_date: NaiveDate::from_ymd_opt(2029, 1, 1),
            royalty_percent: BigDecimal::zero(),
            marketing_fee_percent: BigDecimal::zero(),
            franchise_fee: BigDecimal::zero(),
            currency: "ILS".into(),
            status: FranchiseeStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_agreement_dates() {
        let mut franchisee = sample();
        assert!(franchisee.check_agreement_dates().is_ok());
        franchisee.agreement_end_date = NaiveDate::from_ymd_opt(2023, 12, 31);
        assert!(matches!(
            franchisee.check_agreement_dates(),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateFranchiseeRequest = serde_json::from_value(serde_json::json!({
            "countryId": Uuid::nil(),
            "businessName": "Clean Paws",
            "contactName": "Dana",
            "contactEmail": "not-an-email",
            "currency": "ILS",
            "royaltyPercent": "6.5",
            "agreementType": "area_developer"
        }))
        .unwrap();
        assert_eq!(req.agreement_type, Some(AgreementType::AreaDeveloper));
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert_eq!(errors.errors()[0].field(), "contactEmail");
    }
}
