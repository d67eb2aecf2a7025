//! Stress function and the per-call stress table

use std::collections::BTreeMap;

use crate::config::{IdealBand, IdealBands};
use crate::error::{ScoringError, ScoringResult};
use crate::models::{EnvironmentalReading, Factor};
use crate::types::{clamp_score, round_dp};

/// Normalized deviation of `value` from the closed band `[low, high]`.
///
/// Zero inside the band, otherwise the distance to the nearest bound divided
/// by the band width, capped at 1.
pub fn stress(value: f64, low: f64, high: f64) -> ScoringResult<f64> {
    if !value.is_finite() {
        return Err(ScoringError::invalid("value", "must be a finite number"));
    }
    if !(high > low) {
        return Err(ScoringError::DegenerateBand {
            factor: format!("[{}, {}]", low, high),
        });
    }

    if (low..=high).contains(&value) {
        return Ok(0.0);
    }

    let nearest = if value < low { low } else { high };
    Ok(((value - nearest).abs() / (high - low)).min(1.0))
}

fn band_stress(factor: Factor, value: f64, band: &IdealBand) -> ScoringResult<f64> {
    stress(value, band.low, band.high).map_err(|err| match err {
        ScoringError::DegenerateBand { .. } => ScoringError::DegenerateBand {
            factor: factor.to_string(),
        },
        ScoringError::InvalidInput { message, .. } => ScoringError::InvalidInput {
            field: factor.to_string(),
            message,
        },
        other => other,
    })
}

/// Stress of every tracked factor for one reading.
///
/// Health, risk and the alert breakdown are all views of the same table so
/// they can never disagree with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct StressTable {
    entries: BTreeMap<Factor, f64>,
    total: f64,
}

impl StressTable {
    pub fn compute(reading: &EnvironmentalReading, bands: &IdealBands) -> ScoringResult<Self> {
        let mut entries = BTreeMap::new();
        let mut total = 0.0;

        for (factor, band) in bands.iter() {
            let s = band_stress(factor, reading.value(factor), band)?;
            total += band.weight * s;
            entries.insert(factor, s);
        }

        Ok(Self { entries, total })
    }

    /// Weighted sum of factor stresses, in [0, 1]
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn get(&self, factor: Factor) -> f64 {
        self.entries.get(&factor).copied().unwrap_or(0.0)
    }

    pub fn health_score(&self) -> u8 {
        clamp_score((100.0 * (1.0 - self.total)).round()) as u8
    }

    pub fn risk_score(&self) -> u8 {
        clamp_score((100.0 * self.total).round()) as u8
    }

    /// Per-factor stress rounded to 3 decimals
    pub fn breakdown(&self) -> BTreeMap<Factor, f64> {
        self.entries
            .iter()
            .map(|(factor, s)| (*factor, round_dp(*s, 3)))
            .collect()
    }

    /// Factors with a non-zero rounded stress, in table order
    pub fn stressed_factors(&self) -> Vec<Factor> {
        self.breakdown()
            .into_iter()
            .filter(|(_, s)| *s > 0.0)
            .map(|(factor, _)| factor)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stress_inside_band_is_zero() {
        assert_eq!(stress(55.0, 55.0, 65.0), Ok(0.0));
        assert_eq!(stress(60.0, 55.0, 65.0), Ok(0.0));
        assert_eq!(stress(65.0, 55.0, 65.0), Ok(0.0));
    }

    #[test]
    fn test_stress_linear_outside_band() {
        assert_eq!(stress(50.0, 55.0, 65.0), Ok(0.5));
        assert_eq!(stress(67.0, 55.0, 65.0), Ok(0.2));
    }

    #[test]
    fn test_stress_capped_at_one() {
        assert_eq!(stress(0.0, 55.0, 65.0), Ok(1.0));
        assert_eq!(stress(500.0, 55.0, 65.0), Ok(1.0));
    }

    #[test]
    fn test_degenerate_band_is_an_error() {
        assert!(matches!(
            stress(10.0, 20.0, 20.0),
            Err(ScoringError::DegenerateBand { .. })
        ));
        assert!(stress(10.0, 30.0, 20.0).is_err());
    }

    #[test]
    fn test_non_finite_value_rejected() {
        assert!(stress(f64::NAN, 55.0, 65.0).is_err());
        assert!(stress(f64::INFINITY, 55.0, 65.0).is_err());
    }

    #[test]
    fn test_table_optimal_reading() {
        let reading = EnvironmentalReading::new(60.0, 22.0, 70.0, 60.0);
        let table = StressTable::compute(&reading, &IdealBands::default()).unwrap();
        assert_eq!(table.total(), 0.0);
        assert_eq!(table.health_score(), 100);
        assert_eq!(table.risk_score(), 0);
        assert!(table.stressed_factors().is_empty());
    }

    #[test]
    fn test_table_dry_soil() {
        // soil moisture 50 -> stress 0.5, weighted 0.175
        let reading = EnvironmentalReading::new(50.0, 22.0, 70.0, 60.0);
        let table = StressTable::compute(&reading, &IdealBands::default()).unwrap();
        assert_eq!(table.health_score(), 83);
        assert_eq!(table.risk_score(), 18);
        assert_eq!(table.breakdown()[&Factor::SoilMoisture], 0.5);
        assert_eq!(table.stressed_factors(), vec![Factor::SoilMoisture]);
    }

    #[test]
    fn test_table_worst_case() {
        let reading = EnvironmentalReading::new(0.0, 60.0, 0.0, 500.0);
        let table = StressTable::compute(&reading, &IdealBands::default()).unwrap();
        assert_eq!(table.health_score(), 0);
        assert_eq!(table.risk_score(), 100);
        assert_eq!(table.stressed_factors().len(), 4);
    }

    #[test]
    fn test_breakdown_rounded() {
        // temperature 27 -> 1/8 = 0.125; humidity 76 -> 0.1
        let reading = EnvironmentalReading::new(60.0, 27.0, 76.0, 60.0);
        let table = StressTable::compute(&reading, &IdealBands::default()).unwrap();
        let breakdown = table.breakdown();
        assert_eq!(breakdown[&Factor::Temperature], 0.125);
        assert_eq!(breakdown[&Factor::Humidity], 0.1);
        assert_eq!(breakdown[&Factor::Rainfall7d], 0.0);
    }
}
