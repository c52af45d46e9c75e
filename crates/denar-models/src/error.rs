//! Validation errors for model types.

use thiserror::Error;

/// Result type for model construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when a model value fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Confidence must be a finite value in [0, 1], got {0}")]
    InvalidConfidence(f32),

    #[error("Invalid bounding box ({x1}, {y1}, {x2}, {y2}): corners must be finite and ordered")]
    InvalidBoundingBox { x1: f32, y1: f32, x2: f32, y2: f32 },

    #[error("Unknown currency type: {0}")]
    UnknownCurrencyType(String),

    #[error("Unknown model key: {0}")]
    UnknownModelKey(String),
}
