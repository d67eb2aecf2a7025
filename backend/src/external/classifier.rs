//! Leaf classifier client
//!
//! Client for the hosted pretrained leaf classifier. The model receives the
//! cropped 224×224 leaf and answers with its top class and probability.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::ClassifierOutput;

use super::{encode_image, error_body, http_client};
use crate::config::ServiceEndpoint;
use crate::error::{AppError, AppResult};

/// Anything that can label a prepared leaf image
#[axum::async_trait]
pub trait LeafClassifier: Send + Sync {
    /// Classify a PNG-encoded 224×224 RGB image
    async fn classify(&self, png: &[u8]) -> AppResult<ClassifierOutput>;
}

/// HTTP client for the classifier service
#[derive(Clone)]
pub struct ClassifierClient {
    api_endpoint: String,
    api_key: Option<String>,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest {
    image_base64: String,
}

/// Response from the classifier service
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    label: String,
    /// Top-class probability in [0, 1]
    probability: f64,
}

impl From<ClassifyResponse> for ClassifierOutput {
    fn from(r: ClassifyResponse) -> Self {
        ClassifierOutput::from_probability(r.label, r.probability)
    }
}

impl ClassifierClient {
    pub fn new(api_endpoint: String, api_key: Option<String>, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            api_endpoint,
            api_key,
            http_client: http_client(timeout_secs)?,
        })
    }

    /// Build a client when an endpoint is configured
    pub fn from_config(config: &ServiceEndpoint) -> AppResult<Option<Self>> {
        config
            .endpoint
            .clone()
            .map(|endpoint| Self::new(endpoint, config.api_key.clone(), config.timeout_secs))
            .transpose()
    }
}

#[axum::async_trait]
impl LeafClassifier for ClassifierClient {
    async fn classify(&self, png: &[u8]) -> AppResult<ClassifierOutput> {
        let mut request = self.http_client.post(&self.api_endpoint).json(&ClassifyRequest {
            image_base64: encode_image(png),
        });
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ClassifierError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ClassifierError(error_body(response).await));
        }

        let result: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| AppError::ClassifierError(format!("Failed to parse response: {}", e)))?;

        if result.label.trim().is_empty() {
            return Err(AppError::ClassifierError("Empty class label".to_string()));
        }

        Ok(result.into())
    }
}
