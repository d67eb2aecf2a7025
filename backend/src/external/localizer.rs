//! Disease localizer client
//!
//! Object-detection service that boxes diseased regions on the original,
//! uncropped leaf photo. Its output is advisory and never changes the grade.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{round_dp, BoundingBox, DiseaseDetection};

use super::{encode_image, error_body, http_client};
use crate::config::LocalizerConfig;
use crate::error::{AppError, AppResult};

#[axum::async_trait]
pub trait DiseaseLocalizer: Send + Sync {
    /// Detect disease regions on an encoded image
    async fn detect(&self, image: &[u8]) -> AppResult<Vec<DiseaseDetection>>;
}

#[derive(Clone)]
pub struct LocalizerClient {
    api_endpoint: String,
    api_key: Option<String>,
    confidence_threshold: f64,
    iou_threshold: f64,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct DetectRequest {
    image_base64: String,
    confidence_threshold: f64,
    iou_threshold: f64,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<RawDetection>,
}

/// One box as reported by the detector, corners in pixels
#[derive(Debug, Deserialize)]
struct RawDetection {
    name: String,
    confidence: f64,
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl From<RawDetection> for DiseaseDetection {
    fn from(r: RawDetection) -> Self {
        DiseaseDetection {
            disease_name: r.name,
            confidence: round_dp(r.confidence, 3),
            bbox: BoundingBox {
                xmin: r.xmin as i32,
                ymin: r.ymin as i32,
                xmax: r.xmax as i32,
                ymax: r.ymax as i32,
            },
        }
    }
}

impl LocalizerClient {
    /// Build a client when an endpoint is configured
    pub fn from_config(config: &LocalizerConfig) -> AppResult<Option<Self>> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };

        Ok(Some(Self {
            api_endpoint: endpoint,
            api_key: config.api_key.clone(),
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
            http_client: http_client(config.timeout_secs)?,
        }))
    }
}

#[axum::async_trait]
impl DiseaseLocalizer for LocalizerClient {
    async fn detect(&self, image: &[u8]) -> AppResult<Vec<DiseaseDetection>> {
        let mut request = self.http_client.post(&self.api_endpoint).json(&DetectRequest {
            image_base64: encode_image(image),
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
        });
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::LocalizerError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::LocalizerError(error_body(response).await));
        }

        let result: DetectResponse = response
            .json()
            .await
            .map_err(|e| AppError::LocalizerError(format!("Failed to parse response: {}", e)))?;

        let detections: Vec<DiseaseDetection> =
            result.detections.into_iter().map(Into::into).collect();

        tracing::debug!("Localizer found {} disease regions", detections.len());
        Ok(detections)
    }
}
