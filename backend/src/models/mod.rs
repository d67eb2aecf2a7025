//! Request and response models for the Tea Farm Advisor
//!
//! Re-exports models from the shared crate and adds backend-specific models

use serde::{Deserialize, Serialize};
use shared::round_dp;

pub use shared::models::*;

/// Price history submitted for a one-off forecast
#[derive(Debug, Deserialize)]
pub struct PriceForecastInput {
    pub price_history: Vec<f64>,
}

/// Four-factor averages of the latest readings of a farm
#[derive(Debug, Serialize)]
pub struct FarmAverages {
    pub status: &'static str,
    pub averages: FactorAverages,
    pub sample_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactorAverages {
    pub soil_moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall_7d: f64,
}

impl From<&SensorAverages> for FactorAverages {
    fn from(a: &SensorAverages) -> Self {
        Self {
            soil_moisture: round_dp(a.soil_moisture, 2),
            temperature: round_dp(a.temperature, 2),
            humidity: round_dp(a.humidity, 2),
            rainfall_7d: round_dp(a.rainfall_7d, 2),
        }
    }
}

impl From<&SensorAverages> for FarmAverages {
    fn from(a: &SensorAverages) -> Self {
        Self {
            status: "success",
            averages: FactorAverages::from(a),
            sample_count: a.sample_count,
        }
    }
}
