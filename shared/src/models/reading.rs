//! Environmental sensor reading models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ScoringError, ScoringResult};

/// Soil pH assumed when a sensor does not report one
pub const DEFAULT_SOIL_PH: f64 = 5.2;

/// Environmental factors tracked by the health and risk scorers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Factor {
    #[serde(rename = "soil_moisture")]
    SoilMoisture,
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "rainfall_7d")]
    Rainfall7d,
}

impl Factor {
    pub const ALL: [Factor; 4] = [
        Factor::SoilMoisture,
        Factor::Temperature,
        Factor::Humidity,
        Factor::Rainfall7d,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::SoilMoisture => "soil_moisture",
            Factor::Temperature => "temperature",
            Factor::Humidity => "humidity",
            Factor::Rainfall7d => "rainfall_7d",
        }
    }

    /// Human label used in alert reasons ("soil moisture")
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single environmental reading, either from IoT sensors or entered manually
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentalReading {
    /// Volumetric soil moisture (%)
    pub soil_moisture: f64,
    /// Air temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Rainfall accumulated over the last 7 days (mm)
    pub rainfall_7d: f64,
    pub soil_ph: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall_last_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl EnvironmentalReading {
    pub fn new(soil_moisture: f64, temperature: f64, humidity: f64, rainfall_7d: f64) -> Self {
        Self {
            soil_moisture,
            temperature,
            humidity,
            rainfall_7d,
            soil_ph: DEFAULT_SOIL_PH,
            rainfall_last_24h: None,
            recorded_at: None,
        }
    }

    /// Value of one tracked factor
    pub fn value(&self, factor: Factor) -> f64 {
        match factor {
            Factor::SoilMoisture => self.soil_moisture,
            Factor::Temperature => self.temperature,
            Factor::Humidity => self.humidity,
            Factor::Rainfall7d => self.rainfall_7d,
        }
    }

    /// Daily rainfall, estimated from the weekly total when not reported
    pub fn daily_rainfall(&self) -> f64 {
        self.rainfall_last_24h.unwrap_or(self.rainfall_7d / 7.0)
    }
}

/// Raw reading as submitted by a client or loaded from storage.
///
/// Every field is optional so that a missing value surfaces as a
/// `ScoringError::MissingField` instead of a generic decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadingInput {
    pub soil_moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall_7d: Option<f64>,
    pub soil_ph: Option<f64>,
    pub rainfall_last_24h: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReadingInput> for EnvironmentalReading {
    type Error = ScoringError;

    fn try_from(input: ReadingInput) -> ScoringResult<Self> {
        fn required(value: Option<f64>, field: &str) -> ScoringResult<f64> {
            value.ok_or_else(|| ScoringError::MissingField(field.to_string()))
        }

        let reading = EnvironmentalReading {
            soil_moisture: required(input.soil_moisture, "soil_moisture")?,
            temperature: required(input.temperature, "temperature")?,
            humidity: required(input.humidity, "humidity")?,
            rainfall_7d: required(input.rainfall_7d, "rainfall_7d")?,
            soil_ph: input.soil_ph.unwrap_or(DEFAULT_SOIL_PH),
            rainfall_last_24h: input.rainfall_last_24h,
            recorded_at: input.recorded_at,
        };
        crate::validation::validate_reading(&reading)?;
        Ok(reading)
    }
}

/// Optimal / suboptimal label for one factor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FactorStatus {
    Optimal,
    Suboptimal,
}

/// Averages over a set of readings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorAverages {
    pub soil_moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall_7d: f64,
    pub soil_ph: f64,
    pub sample_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_at: Option<DateTime<Utc>>,
}

impl SensorAverages {
    /// View the averages as a reading so they can be scored with the same engine
    pub fn as_reading(&self) -> EnvironmentalReading {
        EnvironmentalReading {
            soil_moisture: self.soil_moisture,
            temperature: self.temperature,
            humidity: self.humidity,
            rainfall_7d: self.rainfall_7d,
            soil_ph: self.soil_ph,
            rainfall_last_24h: None,
            recorded_at: self.latest_at,
        }
    }
}

/// Pest and drought risk for a field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldRisks {
    pub pest_risk: crate::types::RiskLevel,
    pub drought_risk: crate::types::RiskLevel,
}
