//! Payment recording shared by station bills and accounts payable.
//!
//! Both tables carry `total_amount`, `paid_amount` and a [`PaymentStatus`];
//! a payment is applied under a row lock and posted to the ledger in the
//! same transaction.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::core::shared::enums::db_enum;
use crate::core::shared::error::ApiError;
use crate::core::shared::money::{is_positive, round_money};
use crate::security::validation::{Validate, ValidationResult, Validator};

db_enum! {
    pub enum PaymentStatus {
        Unpaid => "unpaid",
        Paid => "paid",
        Overdue => "overdue",
        PartiallyPaid => "partially_paid",
        Disputed => "disputed",
    }
}

impl PaymentStatus {
    /// Statuses that only a recorded payment may produce.
    pub fn is_payment_result(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::PartiallyPaid)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Option<BigDecimal>,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
}

impl Validate for PaymentRequest {
    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.amount.as_ref(), |v, a| v.positive_money(a, "amount"))
            .opt(self.payment_method.as_deref(), |v, m| {
                v.length(m, "paymentMethod", Some(1), Some(40))
            })
            .opt(self.payment_reference.as_deref(), |v, r| {
                v.length(r, "paymentReference", Some(1), Some(120))
            })
            .validate()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPayment {
    pub amount: BigDecimal,
    pub paid_amount: BigDecimal,
    pub status: PaymentStatus,
}

/// Applies a payment of `requested` (default: the remaining balance) to a
/// payable with `total` and `already_paid`.
pub fn apply_payment(
    total: &BigDecimal,
    already_paid: &BigDecimal,
    status: PaymentStatus,
    requested: Option<&BigDecimal>,
) -> Result<AppliedPayment, ApiError> {
    match status {
        PaymentStatus::Paid => {
            return Err(ApiError::Conflict("Already paid in full".to_string()));
        }
        PaymentStatus::Disputed => {
            return Err(ApiError::Conflict(
                "Disputed items cannot be paid until the dispute is settled".to_string(),
            ));
        }
        _ => {}
    }

    let remaining = round_money(&(total - already_paid));
    let amount = round_money(requested.unwrap_or(&remaining));
    if !is_positive(&amount) {
        return Err(ApiError::Conflict(
            "Payment amount must be greater than zero".to_string(),
        ));
    }
    if amount > remaining {
        return Err(ApiError::Conflict(format!(
            "Payment of {amount} exceeds the outstanding balance of {remaining}"
        )));
    }

    let paid_amount = round_money(&(already_paid + &amount));
    let status = if paid_amount >= *total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::PartiallyPaid
    };
    Ok(AppliedPayment {
        amount,
        paid_amount,
        status,
    })
}

/// Status after an edit that may change the total. A new total must still
/// cover what was already paid. Once money has been recorded the status
/// follows `paid` against `total` and cannot be set by hand.
pub fn settle_status(
    total: &BigDecimal,
    paid: &BigDecimal,
    current: PaymentStatus,
    requested: Option<PaymentStatus>,
) -> Result<PaymentStatus, ApiError> {
    if paid > total {
        return Err(ApiError::Conflict(format!(
            "Total {total} would be below the {paid} already paid"
        )));
    }
    if !is_positive(paid) {
        return Ok(requested.unwrap_or(current));
    }
    if requested.is_some_and(|s| s != current) {
        return Err(ApiError::Conflict(
            "Status of an item with recorded payments follows its payments".to_string(),
        ));
    }
    Ok(if paid >= total {
        PaymentStatus::Paid
    } else {
        PaymentStatus::PartiallyPaid
    })
}

pub fn zero() -> BigDecimal {
    round_money(&BigDecimal::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_default_amount_is_remaining_balance() {
        let applied =
            apply_payment(&dec("1462.50"), &dec("400.00"), PaymentStatus::PartiallyPaid, None)
                .unwrap();
        assert_eq!(applied.amount, dec("1062.50"));
        assert_eq!(applied.paid_amount, dec("1462.50"));
        assert_eq!(applied.status, PaymentStatus::Paid);
    }

    #[test]
    fn test_partial_payment() {
        let applied = apply_payment(
            &dec("1462.50"),
            &dec("0"),
            PaymentStatus::Overdue,
            Some(&dec("500")),
        )
        .unwrap();
        assert_eq!(applied.paid_amount, dec("500.00"));
        assert_eq!(applied.status, PaymentStatus::PartiallyPaid);
    }

    #[test]
    fn test_rejections_are_conflicts() {
        let paid = apply_payment(&dec("10"), &dec("10"), PaymentStatus::Paid, None);
        assert!(matches!(paid, Err(ApiError::Conflict(_))));

        let disputed = apply_payment(&dec("10"), &dec("0"), PaymentStatus::Disputed, None);
        assert!(matches!(disputed, Err(ApiError::Conflict(_))));

        let over = apply_payment(&dec("10"), &dec("4"), PaymentStatus::PartiallyPaid, Some(&dec("6.01")));
        assert!(matches!(over, Err(ApiError::Conflict(_))));

        let nothing_due = apply_payment(&dec("0"), &dec("0"), PaymentStatus::Unpaid, None);
        assert!(matches!(nothing_due, Err(ApiError::Conflict(_))));
    }

    #[test]
    fn test_total_must_cover_paid() {
        let ok = settle_status(&dec("100"), &dec("100"), PaymentStatus::Paid, None);
        assert_eq!(ok.unwrap(), PaymentStatus::Paid);
        let below = settle_status(&dec("99.99"), &dec("100"), PaymentStatus::Paid, None);
        assert!(matches!(below, Err(ApiError::Conflict(_))));
    }

    #[test]
    fn test_raising_total_of_paid_item_reopens_it() {
        let status =
            settle_status(&dec("2212.50"), &dec("1462.50"), PaymentStatus::Paid, None).unwrap();
        assert_eq!(status, PaymentStatus::PartiallyPaid);

        let applied = apply_payment(&dec("2212.50"), &dec("1462.50"), status, None).unwrap();
        assert_eq!(applied.amount, dec("750.00"));
        assert_eq!(applied.status, PaymentStatus::Paid);
    }

    #[test]
    fn test_status_is_locked_once_paid() {
        let reset = settle_status(
            &dec("1462.50"),
            &dec("1462.50"),
            PaymentStatus::Paid,
            Some(PaymentStatus::Unpaid),
        );
        assert!(matches!(reset, Err(ApiError::Conflict(_))));

        let same = settle_status(
            &dec("1462.50"),
            &dec("1462.50"),
            PaymentStatus::Paid,
            Some(PaymentStatus::Paid),
        );
        assert_eq!(same.unwrap(), PaymentStatus::Paid);
    }

    #[test]
    fn test_unpaid_item_status_is_editable() {
        let status = settle_status(
            &dec("100"),
            &dec("0.00"),
            PaymentStatus::Unpaid,
            Some(PaymentStatus::Disputed),
        )
        .unwrap();
        assert_eq!(status, PaymentStatus::Disputed);
        let kept = settle_status(&dec("100"), &dec("0.00"), PaymentStatus::Overdue, None).unwrap();
        assert_eq!(kept, PaymentStatus::Overdue);
    }
}
