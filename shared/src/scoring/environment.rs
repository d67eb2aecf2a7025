//! Environmental health, risk and alerting
//!
//! `assess_environment` is the one entry point for scoring a reading. Manual
//! entries, IoT readings, smart alerts and the action plan all go through it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::error::{ScoringError, ScoringResult};
use crate::models::{EnvironmentalReading, Factor, FactorStatus, FieldRisks, SensorAverages};
use crate::scoring::stress::StressTable;
use crate::types::{round_dp, RiskLevel};

/// Health and risk view of one reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthAssessment {
    pub health_score: u8,
    pub risk_score: u8,
    pub stress_breakdown: BTreeMap<Factor, f64>,
    pub score_explanation: BTreeMap<Factor, FactorStatus>,
    pub stressed_factors: Vec<Factor>,
}

/// Score a reading against the ideal bands
pub fn assess_environment(
    reading: &EnvironmentalReading,
    config: &ScoringConfig,
) -> ScoringResult<HealthAssessment> {
    let table = StressTable::compute(reading, &config.bands)?;

    let score_explanation = config
        .bands
        .iter()
        .map(|(factor, band)| {
            let status = if band.contains(reading.value(factor)) {
                FactorStatus::Optimal
            } else {
                FactorStatus::Suboptimal
            };
            (factor, status)
        })
        .collect();

    Ok(HealthAssessment {
        health_score: table.health_score(),
        risk_score: table.risk_score(),
        stress_breakdown: table.breakdown(),
        score_explanation,
        stressed_factors: table.stressed_factors(),
    })
}

/// Smart-alert payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmartAlert {
    pub alert: bool,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_score: Option<u8>,
    pub risk_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_breakdown: Option<BTreeMap<Factor, f64>>,
}

impl SmartAlert {
    /// Quiet result used when there is no usable reading
    pub fn no_data() -> Self {
        Self {
            alert: false,
            mode: "AI".to_string(),
            health_score: None,
            risk_score: 0,
            reason: None,
            stress_breakdown: None,
        }
    }
}

/// Raise an alert when the health score is at or below the configured threshold
pub fn evaluate_alert(assessment: &HealthAssessment, config: &ScoringConfig) -> SmartAlert {
    let alert = assessment.health_score <= config.alert_health_threshold;
    let reason = alert.then(|| {
        let names: Vec<String> = assessment
            .stressed_factors
            .iter()
            .map(Factor::label)
            .collect();
        format!("Stress detected in: {}", names.join(", "))
    });

    SmartAlert {
        alert,
        mode: "AI".to_string(),
        health_score: Some(assessment.health_score),
        risk_score: assessment.risk_score,
        reason,
        stress_breakdown: Some(assessment.stress_breakdown.clone()),
    }
}

/// Average a batch of readings, rounded to 2 decimals
pub fn average_readings(readings: &[EnvironmentalReading]) -> ScoringResult<SensorAverages> {
    if readings.is_empty() {
        return Err(ScoringError::invalid("readings", "no sensor data provided"));
    }

    let n = readings.len() as f64;
    let mean = |f: fn(&EnvironmentalReading) -> f64| {
        round_dp(readings.iter().map(f).sum::<f64>() / n, 2)
    };

    Ok(SensorAverages {
        soil_moisture: mean(|r| r.soil_moisture),
        temperature: mean(|r| r.temperature),
        humidity: mean(|r| r.humidity),
        rainfall_7d: mean(|r| r.rainfall_7d),
        soil_ph: mean(|r| r.soil_ph),
        sample_count: readings.len(),
        latest_at: readings.iter().filter_map(|r| r.recorded_at).max(),
    })
}

fn level_from_stress(mean_stress: f64) -> RiskLevel {
    if mean_stress >= 0.5 {
        RiskLevel::High
    } else if mean_stress > 0.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Pest and drought risk derived from stress when no risk model answers.
///
/// Drought follows soil moisture and rainfall, pest pressure follows humidity
/// and temperature.
pub fn fallback_field_risks(
    reading: &EnvironmentalReading,
    config: &ScoringConfig,
) -> ScoringResult<FieldRisks> {
    let table = StressTable::compute(reading, &config.bands)?;
    let drought = (table.get(Factor::SoilMoisture) + table.get(Factor::Rainfall7d)) / 2.0;
    let pest = (table.get(Factor::Humidity) + table.get(Factor::Temperature)) / 2.0;

    Ok(FieldRisks {
        pest_risk: level_from_stress(pest),
        drought_risk: level_from_stress(drought),
    })
}

/// Field action text for a pair of risks
pub fn cultivation_action(risks: &FieldRisks) -> &'static str {
    if risks.pest_risk == RiskLevel::High || risks.drought_risk == RiskLevel::High {
        "Immediate irrigation and pest inspection"
    } else {
        "Monitor and maintain current practices"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn test_assessment_labels_factors() {
        let reading = EnvironmentalReading::new(50.0, 22.0, 70.0, 90.0);
        let result = assess_environment(&reading, &config()).unwrap();
        assert_eq!(
            result.score_explanation[&Factor::SoilMoisture],
            FactorStatus::Suboptimal
        );
        assert_eq!(
            result.score_explanation[&Factor::Temperature],
            FactorStatus::Optimal
        );
        assert_eq!(
            result.score_explanation[&Factor::Rainfall7d],
            FactorStatus::Suboptimal
        );
    }

    #[test]
    fn test_no_alert_above_threshold() {
        let reading = EnvironmentalReading::new(60.0, 22.0, 70.0, 60.0);
        let assessment = assess_environment(&reading, &config()).unwrap();
        let alert = evaluate_alert(&assessment, &config());
        assert!(!alert.alert);
        assert_eq!(alert.health_score, Some(100));
        assert!(alert.reason.is_none());
    }

    #[test]
    fn test_alert_lists_stressed_factors() {
        let reading = EnvironmentalReading::new(20.0, 40.0, 70.0, 60.0);
        let assessment = assess_environment(&reading, &config()).unwrap();
        assert!(assessment.health_score <= 60);

        let alert = evaluate_alert(&assessment, &config());
        assert!(alert.alert);
        assert_eq!(
            alert.reason.as_deref(),
            Some("Stress detected in: soil moisture, temperature")
        );
    }

    #[test]
    fn test_alert_fires_at_threshold() {
        let assessment = HealthAssessment {
            health_score: 60,
            risk_score: 40,
            stress_breakdown: BTreeMap::new(),
            score_explanation: BTreeMap::new(),
            stressed_factors: vec![],
        };
        assert!(evaluate_alert(&assessment, &config()).alert);
    }

    #[test]
    fn test_average_readings() {
        let readings = vec![
            EnvironmentalReading::new(50.0, 20.0, 60.0, 40.0),
            EnvironmentalReading::new(61.0, 25.0, 70.0, 80.0),
        ];
        let avg = average_readings(&readings).unwrap();
        assert_eq!(avg.soil_moisture, 55.5);
        assert_eq!(avg.temperature, 22.5);
        assert_eq!(avg.rainfall_7d, 60.0);
        assert_eq!(avg.sample_count, 2);
    }

    #[test]
    fn test_average_of_nothing_is_rejected() {
        assert!(matches!(
            average_readings(&[]),
            Err(ScoringError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_fallback_risks() {
        let optimal = EnvironmentalReading::new(60.0, 22.0, 70.0, 60.0);
        let risks = fallback_field_risks(&optimal, &config()).unwrap();
        assert_eq!(risks.pest_risk, RiskLevel::Low);
        assert_eq!(risks.drought_risk, RiskLevel::Low);
        assert_eq!(cultivation_action(&risks), "Monitor and maintain current practices");

        let parched = EnvironmentalReading::new(10.0, 22.0, 70.0, 0.0);
        let risks = fallback_field_risks(&parched, &config()).unwrap();
        assert_eq!(risks.drought_risk, RiskLevel::High);
        assert_eq!(risks.pest_risk, RiskLevel::Low);
        assert_eq!(
            cultivation_action(&risks),
            "Immediate irrigation and pest inspection"
        );
    }
}
