//! Error handling for the Tea Farm Advisor
//!
//! Provides consistent error responses in English and Assamese

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::ScoringError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_as: String,
    },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_as: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Insufficient data: {required} required, {available} available")]
    InsufficientData { required: usize, available: usize },

    #[error("Unreadable image: {0}")]
    InvalidImage(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // External service errors
    #[error("Leaf classifier error: {0}")]
    ClassifierError(String),

    #[error("Disease localizer error: {0}")]
    LocalizerError(String),

    #[error("Risk model error: {0}")]
    RiskModelError(String),

    #[error("Text generation error: {0}")]
    GenerativeError(String),

    #[error("Market data unavailable")]
    MarketDataUnavailable,

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::InvalidInput { field, message } => AppError::Validation {
                message_as: format!("অবৈধ তথ্য ({}): {}", field, message),
                field,
                message,
            },
            ScoringError::MissingField(field) => AppError::MissingField(field),
            ScoringError::InsufficientData {
                required,
                available,
            } => AppError::InsufficientData {
                required,
                available,
            },
            ScoringError::ZeroMeanWindow => {
                AppError::ValidationError("price window has zero mean".to_string())
            }
            err @ (ScoringError::DegenerateBand { .. } | ScoringError::InvalidConfig(_)) => {
                AppError::Configuration(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: errors.to_string(),
            message_as: format!("অবৈধ তথ্য: {}", field),
            field,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_as: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: impl Into<String>, message_as: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_as: message_as.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", "টোকেনটো অবৈধ"),
            ),
            AppError::Unauthorized {
                message,
                message_as,
            } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone(), message_as.clone()),
            ),
            AppError::Validation {
                field,
                message,
                message_as,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_as.clone())
                    .with_field(field),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "VALIDATION_ERROR",
                    msg.clone(),
                    format!("অবৈধ তথ্য: {}", msg),
                ),
            ),
            AppError::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "MISSING_FIELD",
                    format!("Missing field: {}", field),
                    format!("প্ৰয়োজনীয় তথ্য নাই: {}", field),
                )
                .with_field(field),
            ),
            AppError::InsufficientData {
                required,
                available,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "INSUFFICIENT_DATA",
                    format!(
                        "Insufficient data: {} points required, {} available",
                        required, available
                    ),
                    format!(
                        "পৰ্যাপ্ত তথ্য নাই: {}টা প্ৰয়োজন, {}টা উপলব্ধ",
                        required, available
                    ),
                ),
            ),
            AppError::InvalidImage(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "INVALID_IMAGE",
                    format!("Could not read the uploaded image: {}", msg),
                    "আপলোড কৰা ছবিখন পঢ়িব পৰা নগ'ল",
                )
                .with_field("file"),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("{} পোৱা নগ'ল", resource),
                ),
            ),
            AppError::ClassifierError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "CLASSIFIER_ERROR",
                    format!("Leaf classifier error: {}", msg),
                    "পাত শ্ৰেণীকৰণ সেৱাত ত্ৰুটি হৈছে",
                ),
            ),
            AppError::LocalizerError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "LOCALIZER_ERROR",
                    format!("Disease localizer error: {}", msg),
                    "ৰোগ চিনাক্তকৰণ সেৱাত ত্ৰুটি হৈছে",
                ),
            ),
            AppError::RiskModelError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "RISK_MODEL_ERROR",
                    format!("Risk model error: {}", msg),
                    "বিপদাশংকা মডেলত ত্ৰুটি হৈছে",
                ),
            ),
            AppError::GenerativeError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new(
                    "GENERATIVE_ERROR",
                    format!("Text generation error: {}", msg),
                    "পৰামৰ্শ সেৱাত ত্ৰুটি হৈছে",
                ),
            ),
            AppError::MarketDataUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new(
                    "MARKET_DATA_UNAVAILABLE",
                    "Insufficient market data",
                    "বজাৰৰ তথ্য উপলব্ধ নহয়",
                ),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "CONFIGURATION_ERROR",
                    format!("Configuration error: {}", msg),
                    "ছেটিংছত ত্ৰুটি হৈছে",
                ),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred",
                    "ডাটাবেছত ত্ৰুটি হৈছে",
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    msg.clone(),
                    "চাৰ্ভাৰত আভ্যন্তৰীণ ত্ৰুটি হৈছে",
                ),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred",
                    "চাৰ্ভাৰত আভ্যন্তৰীণ ত্ৰুটি হৈছে",
                ),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_input_errors_are_bad_requests() {
        let err: AppError = ScoringError::invalid("yield_kg", "yield must be greater than 0").into();
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.code, "VALIDATION_ERROR");
        assert_eq!(detail.field.as_deref(), Some("yield_kg"));

        let err: AppError = ScoringError::MissingField("humidity".to_string()).into();
        assert_eq!(err.status_and_detail().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_insufficient_data_is_unprocessable() {
        let err: AppError = ScoringError::InsufficientData {
            required: 3,
            available: 1,
        }
        .into();
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail.code, "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_broken_tables_are_server_errors() {
        let err: AppError = ScoringError::DegenerateBand {
            factor: "humidity".to_string(),
        }
        .into();
        assert_eq!(err.status_and_detail().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
