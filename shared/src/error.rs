//! Error taxonomy for the scoring core

use thiserror::Error;

/// Errors raised by the scoring core.
///
/// Validation-class errors come from caller input; `DegenerateBand` and
/// `InvalidConfig` indicate a broken constant table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Insufficient data: {required} points required, {available} available")]
    InsufficientData { required: usize, available: usize },

    #[error("Degenerate ideal band for {factor}: high must be greater than low")]
    DegenerateBand { factor: String },

    #[error("Price window has zero mean")]
    ZeroMeanWindow,

    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),
}

impl ScoringError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ScoringError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True when the error was caused by caller-supplied data rather than configuration
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ScoringError::InvalidInput { .. }
                | ScoringError::MissingField(_)
                | ScoringError::InsufficientData { .. }
                | ScoringError::ZeroMeanWindow
        )
    }
}

pub type ScoringResult<T> = Result<T, ScoringError>;
