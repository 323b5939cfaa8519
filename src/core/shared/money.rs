//! Decimal helpers for monetary columns. Every stored amount is `NUMERIC(12,2)`,
//! so values are normalised to two fractional digits with half-up rounding
//! before they reach the database.

use bigdecimal::{BigDecimal, RoundingMode, Zero};

pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

pub fn total_with_vat(amount: &BigDecimal, vat: &BigDecimal) -> BigDecimal {
    round_money(&(amount + vat))
}

/// VAT owed on `amount` at `rate_percent` (e.g. `17` for 17%).
pub fn vat_for(amount: &BigDecimal, rate_percent: &BigDecimal) -> BigDecimal {
    round_money(&(amount * rate_percent / BigDecimal::from(100)))
}

pub fn is_negative(value: &BigDecimal) -> bool {
    value < &BigDecimal::zero()
}

pub fn is_positive(value: &BigDecimal) -> bool {
    value > &BigDecimal::zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_total_with_vat() {
        assert_eq!(total_with_vat(&dec("1250.00"), &dec("212.50")), dec("1462.50"));
        assert_eq!(total_with_vat(&dec("1250.00"), &dec("212.50")).to_string(), "1462.50");
    }

    #[test]
    fn test_vat_for_rounds_half_up() {
        assert_eq!(vat_for(&dec("100.00"), &dec("17")), dec("17.00"));
        assert_eq!(vat_for(&dec("0.25"), &dec("18")), dec("0.05"));
        assert_eq!(vat_for(&dec("10.05"), &dec("10")), dec("1.01"));
    }

    #[test]
    fn test_sign_helpers() {
        assert!(is_negative(&dec("-0.01")));
        assert!(!is_negative(&dec("0")));
        assert!(is_positive(&dec("0.01")));
        assert!(!is_positive(&dec("0.00")));
    }
}
