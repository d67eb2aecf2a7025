//! External model and text-generation integrations
//!
//! Every collaborator sits behind a trait so the services can fall back to
//! rule-based results when it is missing or failing.

pub mod classifier;
pub mod generative;
pub mod localizer;
pub mod risk_model;

pub use classifier::{ClassifierClient, LeafClassifier};
pub use generative::{
    extract_actions, BulletStyle, CannedText, EnrichmentRequest, Enricher, GeminiClient,
    Recommender,
};
pub use localizer::{DiseaseLocalizer, LocalizerClient};
pub use risk_model::{RiskFeatures, RiskModel, RiskModelClient};

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;

use crate::error::{AppError, AppResult};

/// HTTP client with a per-request timeout
pub(crate) fn http_client(timeout_secs: u64) -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Read an error body without failing on it
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    format!("API returned {}: {}", status, body)
}
