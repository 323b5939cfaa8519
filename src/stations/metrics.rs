use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::error::ApiError;
use crate::core::shared::money::round_money;
use crate::core::shared::schema::station_performance_metrics;
use crate::security::validation::{Validate, ValidationResult, Validator};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = station_performance_metrics)]
#[serde(rename_all = "camelCase")]
pub struct StationPerformanceMetrics {
    pub id: Uuid,
    pub station_id: Uuid,
    pub metric_date: NaiveDate,
    pub total_washes: i32,
    pub revenue: BigDecimal,
    pub currency: String,
    pub average_wash_duration_sec: Option<i32>,
    pub uptime_percent: Option<BigDecimal>,
    pub water_usage_liters: Option<BigDecimal>,
    pub energy_usage_kwh: Option<BigDecimal>,
    pub customer_rating: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetricsRequest {
    pub station_id: Uuid,
    pub metric_date: NaiveDate,
    pub total_washes: i32,
    pub revenue: BigDecimal,
    pub currency: String,
    pub average_wash_duration_sec: Option<i32>,
    pub uptime_percent: Option<BigDecimal>,
    pub water_usage_liters: Option<BigDecimal>,
    pub energy_usage_kwh: Option<BigDecimal>,
    pub customer_rating: Option<BigDecimal>,
}

impl Validate for RecordMetricsRequest {
    const REQUIRED: &'static [&'static str] =
        &["stationId", "metricDate", "totalWashes", "revenue", "currency"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .non_negative_int(self.total_washes, "totalWashes")
            .money(&self.revenue, "revenue")
            .currency(&self.currency, "currency")
            .opt(self.average_wash_duration_sec, |v, d| {
                v.non_negative_int(d, "averageWashDurationSec")
            })
            .opt(self.uptime_percent.as_ref(), |v, p| v.percent(p, "uptimePercent"))
            .opt(self.water_usage_liters.as_ref(), |v, w| v.money(w, "waterUsageLiters"))
            .opt(self.energy_usage_kwh.as_ref(), |v, e| v.money(e, "energyUsageKwh"))
            .opt(self.customer_rating.as_ref(), |v, r| {
                v.range(r.clone(), "customerRating", Some(BigDecimal::from(0)), Some(BigDecimal::from(5)))
            })
            .validate()
    }
}

impl RecordMetricsRequest {
    pub fn into_row(self, now: DateTime<Utc>) -> StationPerformanceMetrics {
        StationPerformanceMetrics {
            id: Uuid::new_v4(),
            station_id: self.station_id,
            metric_date: self.metric_date,
            total_washes: self.total_washes,
            revenue: round_money(&self.revenue),
            currency: self.currency,
            average_wash_duration_sec: self.average_wash_duration_sec,
            uptime_percent: self.uptime_percent.as_ref().map(round_money),
            water_usage_liters: self.water_usage_liters.as_ref().map(round_money),
            energy_usage_kwh: self.energy_usage_kwh.as_ref().map(round_money),
            customer_rating: self.customer_rating.as_ref().map(round_money),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMetricsQuery {
    pub station_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ListMetricsQuery {
    pub fn check_range(&self) -> Result<(), ApiError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if to < from => {
                Err(ApiError::BadRequest("'to' must not be before 'from'".to_string()))
            }
            _ => Ok(()),
        }
    }
}
