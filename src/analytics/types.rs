use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::shared::money::round_money;
use crate::franchise::types::Franchisee;
use crate::stations::OperationalStatus;

/// A row count split by one string column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub total: i64,
    pub by_key: BTreeMap<String, i64>,
}

pub fn tally(rows: Vec<(String, i64)>) -> Breakdown {
    let mut breakdown = Breakdown::default();
    for (key, count) in rows {
        breakdown.total += count;
        *breakdown.by_key.entry(key).or_insert(0) += count;
    }
    breakdown
}

/// Open balance of payables: `sum(total) - sum(paid)` per currency, from
/// `(currency, sum(total), sum(paid), count)` rows. Amounts in different
/// currencies are never added together.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outstanding {
    pub count: i64,
    pub by_currency: BTreeMap<String, BigDecimal>,
}

pub fn outstanding(rows: Vec<(String, Option<BigDecimal>, Option<BigDecimal>, i64)>) -> Outstanding {
    let mut result = Outstanding::default();
    for (currency, total, paid, count) in rows {
        result.count += count;
        let balance = total.unwrap_or_else(BigDecimal::zero) - paid.unwrap_or_else(BigDecimal::zero);
        let entry = result
            .by_currency
            .entry(currency)
            .or_insert_with(BigDecimal::zero);
        *entry = round_money(&(entry.clone() + balance));
    }
    result
}

pub fn money_by_currency(rows: Vec<(String, Option<BigDecimal>)>) -> BTreeMap<String, BigDecimal> {
    let mut result = BTreeMap::new();
    for (currency, amount) in rows {
        let entry = result.entry(currency).or_insert_with(BigDecimal::zero);
        *entry = round_money(&(entry.clone() + amount.unwrap_or_else(BigDecimal::zero)));
    }
    result
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationStats {
    pub total: i64,
    pub active_stations: i64,
    pub by_operational_status: BTreeMap<String, i64>,
    pub by_health_status: BTreeMap<String, i64>,
}

impl StationStats {
    pub fn new(operational: Breakdown, health: Breakdown) -> Self {
        let active_stations = operational
            .by_key
            .get(OperationalStatus::Active.as_str())
            .copied()
            .unwrap_or(0);
        Self {
            total: operational.total,
            active_stations,
            by_operational_status: operational.by_key,
            by_health_status: health.by_key,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseeStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStats {
    pub outstanding_bills: Outstanding,
    pub overdue_bills: i64,
    pub outstanding_payables: Outstanding,
    /// Revenue over the trailing 30 days of performance metrics.
    pub revenue_last_30_days: BTreeMap<String, BigDecimal>,
    pub washes_last_30_days: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStats {
    pub work_orders_by_status: BTreeMap<String, i64>,
    pub open_work_orders: i64,
    pub completed_cost: BTreeMap<String, BigDecimal>,
    pub assets_by_status: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertStats {
    pub active: i64,
    pub active_by_severity: BTreeMap<String, i64>,
    pub by_status: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_parts: i64,
    pub low_stock_parts: i64,
    pub below_minimum_parts: i64,
    pub low_stock_station_parts: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAnalytics {
    pub station_stats: StationStats,
    pub franchisee_stats: FranchiseeStats,
    pub financial_stats: FinancialStats,
    pub maintenance_stats: MaintenanceStats,
    pub alert_stats: AlertStats,
    pub inventory_stats: InventoryStats,
    pub generated_at: DateTime<Utc>,
}

/// Warehouse stock is shared, so a franchisee's inventory view only covers
/// the parts held at its own stations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseeAnalytics {
    pub franchisee: Franchisee,
    pub station_stats: StationStats,
    pub financial_stats: FinancialStats,
    pub maintenance_stats: MaintenanceStats,
    pub alert_stats: AlertStats,
    pub inventory_stats: InventoryStats,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_tally() {
        let breakdown = tally(vec![
            ("active".into(), 4),
            ("maintenance".into(), 1),
            ("offline".into(), 2),
        ]);
        assert_eq!(breakdown.total, 7);
        assert_eq!(breakdown.by_key["maintenance"], 1);
        assert_eq!(tally(Vec::new()), Breakdown::default());
    }

    #[test]
    fn test_station_stats_counts_active_stations() {
        let operational = tally(vec![
            ("active".into(), 2),
            ("maintenance".into(), 1),
            ("offline".into(), 2),
        ]);
        let health = tally(vec![("healthy".into(), 4), ("critical".into(), 1)]);
        let stats = StationStats::new(operational, health);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.active_stations, 2);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["activeStations"], 2);
        assert_eq!(json["byOperationalStatus"]["maintenance"], 1);
        assert_eq!(json["byHealthStatus"]["critical"], 1);

        let none_active = StationStats::new(tally(vec![("decommissioned".into(), 3)]), Breakdown::default());
        assert_eq!(none_active.active_stations, 0);
    }

    #[test]
    fn test_outstanding_keeps_currencies_apart() {
        let result = outstanding(vec![
            ("ILS".into(), Some(dec("1462.50")), Some(dec("462.50")), 2),
            ("USD".into(), Some(dec("300")), None, 1),
        ]);
        assert_eq!(result.count, 3);
        assert_eq!(result.by_currency["ILS"], dec("1000.00"));
        assert_eq!(result.by_currency["USD"], dec("300.00"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["byCurrency"]["ILS"], "1000.00");
    }

    #[test]
    fn test_money_by_currency_treats_null_sum_as_zero() {
        let result = money_by_currency(vec![("ILS".into(), None), ("EUR".into(), Some(dec("9.999")))]);
        assert_eq!(result["ILS"], dec("0.00"));
        assert_eq!(result["EUR"], dec("10.00"));
    }
}
