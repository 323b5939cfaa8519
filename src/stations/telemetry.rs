use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::TelemetryThresholds;
use crate::core::shared::schema::station_telemetry;
use crate::security::validation::{Validate, ValidationResult, Validator};

use super::alerts::{AlertSeverity, AlertType};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = station_telemetry)]
#[serde(rename_all = "camelCase")]
pub struct StationTelemetry {
    pub id: Uuid,
    pub station_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub water_pressure_psi: Option<f64>,
    pub water_temperature_c: Option<f64>,
    pub power_consumption_kw: Option<f64>,
    pub water_flow_lpm: Option<f64>,
    pub shampoo_level_percent: Option<f64>,
    pub conditioner_level_percent: Option<f64>,
    pub is_online: bool,
    pub error_codes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTelemetryRequest {
    pub station_id: Uuid,
    pub recorded_at: Option<DateTime<Utc>>,
    pub water_pressure_psi: Option<f64>,
    pub water_temperature_c: Option<f64>,
    pub power_consumption_kw: Option<f64>,
    pub water_flow_lpm: Option<f64>,
    pub shampoo_level_percent: Option<f64>,
    pub conditioner_level_percent: Option<f64>,
    pub is_online: Option<bool>,
    #[serde(default)]
    pub error_codes: Vec<String>,
}

impl Validate for CreateTelemetryRequest {
    const REQUIRED: &'static [&'static str] = &["stationId"];

    fn validate(&self) -> Result<(), ValidationResult> {
        Validator::new()
            .opt(self.water_pressure_psi, |v, p| v.range(p, "waterPressurePsi", Some(0.0), None))
            .opt(self.water_temperature_c, |v, t| {
                v.range(t, "waterTemperatureC", Some(-50.0), Some(150.0))
            })
            .opt(self.power_consumption_kw, |v, p| {
                v.range(p, "powerConsumptionKw", Some(0.0), None)
            })
            .opt(self.water_flow_lpm, |v, f| v.range(f, "waterFlowLpm", Some(0.0), None))
            .opt(self.shampoo_level_percent, |v, p| {
                v.range(p, "shampooLevelPercent", Some(0.0), Some(100.0))
            })
            .opt(self.conditioner_level_percent, |v, p| {
                v.range(p, "conditionerLevelPercent", Some(0.0), Some(100.0))
            })
            .custom(|| {
                self.error_codes.iter().find(|c| c.trim().is_empty() || c.len() > 32).map(|_| {
                    crate::security::validation::ValidationError::InvalidValue {
                        field: "errorCodes".to_string(),
                        message: "codes must be 1-32 characters".to_string(),
                    }
                })
            })
            .validate()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTelemetryQuery {
    pub station_id: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// One threshold crossed by a reading; becomes one alert.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdBreach {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
}

impl ThresholdBreach {
    fn new(alert_type: AlertType, severity: AlertSeverity, title: &str, message: String) -> Self {
        Self {
            alert_type,
            severity,
            title: title.to_string(),
            message,
        }
    }
}

pub fn evaluate_thresholds(
    reading: &StationTelemetry,
    limits: &TelemetryThresholds,
) -> Vec<ThresholdBreach> {
    let mut breaches = Vec::new();

    if !reading.is_online {
        breaches.push(ThresholdBreach::new(
            AlertType::Offline,
            AlertSeverity::Critical,
            "Station offline",
            format!("Station reported offline at {}", reading.recorded_at.to_rfc3339()),
        ));
    }

    if let Some(psi) = reading.water_pressure_psi {
        if psi < limits.min_water_pressure_psi {
            breaches.push(ThresholdBreach::new(
                AlertType::TelemetryThreshold,
                AlertSeverity::Warning,
                "Low water pressure",
                format!("Water pressure {psi:.1} psi below {:.1} psi", limits.min_water_pressure_psi),
            ));
        } else if psi > limits.max_water_pressure_psi {
            breaches.push(ThresholdBreach::new(
                AlertType::TelemetryThreshold,
                AlertSeverity::Critical,
                "High water pressure",
                format!("Water pressure {psi:.1} psi above {:.1} psi", limits.max_water_pressure_psi),
            ));
        }
    }

    if let Some(temp) = reading.water_temperature_c {
        if temp > limits.max_water_temperature_c {
            breaches.push(ThresholdBreach::new(
                AlertType::TelemetryThreshold,
                AlertSeverity::Critical,
                "Water temperature too high",
                format!("Water temperature {temp:.1}°C above {:.1}°C", limits.max_water_temperature_c),
            ));
        }
    }

    if let Some(kw) = reading.power_consumption_kw {
        if kw > limits.max_power_consumption_kw {
            breaches.push(ThresholdBreach::new(
                AlertType::TelemetryThreshold,
                AlertSeverity::Warning,
                "High power draw",
                format!("Power draw {kw:.2} kW above {:.2} kW", limits.max_power_consumption_kw),
            ));
        }
    }

    for (label, level) in [
        ("Shampoo", reading.shampoo_level_percent),
        ("Conditioner", reading.conditioner_level_percent),
    ] {
        if let Some(level) = level {
            if level < limits.min_supply_level_percent {
                breaches.push(ThresholdBreach::new(
                    AlertType::LowSupplies,
                    AlertSeverity::Warning,
                    &format!("{label} running low"),
                    format!("{label} at {level:.0}% (minimum {:.0}%)", limits.min_supply_level_percent),
                ));
            }
        }
    }

    if !reading.error_codes.is_empty() {
        breaches.push(ThresholdBreach::new(
            AlertType::HardwareFault,
            AlertSeverity::Warning,
            "Hardware fault reported",
            format!("Error codes: {}", reading.error_codes.join(", ")),
        ));
    }

    breaches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> StationTelemetry {
        let now = Utc::now();
        StationTelemetry {
            id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            recorded_at: now,
            water_pressure_psi: Some(45.0),
            water_temperature_c: Some(36.0),
            power_consumption_kw: Some(6.5),
            water_flow_lpm: Some(12.0),
            shampoo_level_percent: Some(80.0),
            conditioner_level_percent: Some(75.0),
            is_online: true,
            error_codes: vec![],
            created_at: now,
        }
    }

    #[test]
    fn test_nominal_reading_has_no_breaches() {
        assert!(evaluate_thresholds(&reading(), &TelemetryThresholds::default()).is_empty());
    }

    #[test]
    fn test_offline_reading_is_critical() {
        let mut r = reading();
        r.is_online = false;
        let breaches = evaluate_thresholds(&r, &TelemetryThresholds::default());
        assert_eq!(breaches.len(), 1);
        assert_eq!(breaches[0].alert_type, AlertType::Offline);
        assert_eq!(breaches[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_each_breach_is_reported_once() {
        let mut r = reading();
        r.water_pressure_psi = Some(95.0);
        r.shampoo_level_percent = Some(5.0);
        r.conditioner_level_percent = Some(4.0);
        r.error_codes = vec!["E12".into(), "E40".into()];
        let breaches = evaluate_thresholds(&r, &TelemetryThresholds::default());
        let titles: Vec<_> = breaches.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "High water pressure",
                "Shampoo running low",
                "Conditioner running low",
                "Hardware fault reported"
            ]
        );
        assert_eq!(breaches[0].severity, AlertSeverity::Critical);
        assert!(breaches[3].message.contains("E12, E40"));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let mut r = reading();
        r.power_consumption_kw = Some(6.5);
        let limits = TelemetryThresholds {
            max_power_consumption_kw: 5.0,
            ..TelemetryThresholds::default()
        };
        let breaches = evaluate_thresholds(&r, &limits);
        assert_eq!(breaches.len(), 1);
        assert_eq!(breaches[0].title, "High power draw");
    }
}
