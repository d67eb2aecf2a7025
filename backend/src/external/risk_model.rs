//! Pest and drought risk model client

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{EnvironmentalReading, FieldRisks, RiskLevel};

use super::{error_body, http_client};
use crate::config::ServiceEndpoint;
use crate::error::{AppError, AppResult};

/// Feature vector the risk models were trained on
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RiskFeatures {
    pub soil_moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall_last_24h: f64,
    pub rainfall_7d: f64,
    pub soil_ph: f64,
}

impl From<&EnvironmentalReading> for RiskFeatures {
    fn from(r: &EnvironmentalReading) -> Self {
        Self {
            soil_moisture: r.soil_moisture,
            temperature: r.temperature,
            humidity: r.humidity,
            rainfall_last_24h: r.daily_rainfall(),
            rainfall_7d: r.rainfall_7d,
            soil_ph: r.soil_ph,
        }
    }
}

#[axum::async_trait]
pub trait RiskModel: Send + Sync {
    async fn predict(&self, features: &RiskFeatures) -> AppResult<FieldRisks>;
}

#[derive(Clone)]
pub struct RiskModelClient {
    api_endpoint: String,
    api_key: Option<String>,
    http_client: Client,
}

/// Labels may come back as strings ("High") or class indices (2)
#[derive(Debug, Deserialize)]
struct PredictResponse {
    pest_risk: serde_json::Value,
    drought_risk: serde_json::Value,
}

fn parse_level(field: &str, value: &serde_json::Value) -> AppResult<RiskLevel> {
    let label = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    RiskLevel::parse(&label).ok_or_else(|| {
        AppError::RiskModelError(format!("Unrecognised {} label: {}", field, label))
    })
}

impl RiskModelClient {
    pub fn from_config(config: &ServiceEndpoint) -> AppResult<Option<Self>> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };

        Ok(Some(Self {
            api_endpoint: endpoint,
            api_key: config.api_key.clone(),
            http_client: http_client(config.timeout_secs)?,
        }))
    }
}

#[axum::async_trait]
impl RiskModel for RiskModelClient {
    async fn predict(&self, features: &RiskFeatures) -> AppResult<FieldRisks> {
        let mut request = self.http_client.post(&self.api_endpoint).json(features);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::RiskModelError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::RiskModelError(error_body(response).await));
        }

        let result: PredictResponse = response
            .json()
            .await
            .map_err(|e| AppError::RiskModelError(format!("Failed to parse response: {}", e)))?;

        Ok(FieldRisks {
            pest_risk: parse_level("pest_risk", &result.pest_risk)?,
            drought_risk: parse_level("drought_risk", &result.drought_risk)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_level_accepts_labels_and_indices() {
        assert_eq!(parse_level("pest_risk", &json!("High")).unwrap(), RiskLevel::High);
        assert_eq!(parse_level("pest_risk", &json!(0)).unwrap(), RiskLevel::Low);
        assert_eq!(parse_level("pest_risk", &json!("medium")).unwrap(), RiskLevel::Medium);
        assert!(parse_level("pest_risk", &json!("severe")).is_err());
    }

    #[test]
    fn test_features_estimate_daily_rain() {
        let reading = EnvironmentalReading::new(60.0, 22.0, 70.0, 70.0);
        let features = RiskFeatures::from(&reading);
        assert_eq!(features.rainfall_last_24h, 10.0);
        assert_eq!(features.soil_ph, 5.2);
    }
}
