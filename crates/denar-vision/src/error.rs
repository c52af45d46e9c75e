//! Error types for vision operations.

use std::path::PathBuf;
use thiserror::Error;

use denar_models::ModelKey;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while loading models or running inference.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load {key} model from {path}: {message}")]
    ModelLoad {
        key: ModelKey,
        path: PathBuf,
        message: String,
    },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl VisionError {
    /// Create a model load failure error.
    pub fn model_load(key: ModelKey, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            key,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an inference failure error.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Create an invalid image error.
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage(message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error happened while loading a model (fatal at startup).
    pub fn is_model_load_failure(&self) -> bool {
        matches!(self, Self::ModelNotFound(_) | Self::ModelLoad { .. })
    }
}
