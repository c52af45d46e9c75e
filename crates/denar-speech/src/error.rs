//! Error types for speech synthesis.

use thiserror::Error;

/// Result type for speech operations.
pub type SpeechResult<T> = Result<T, SpeechError>;

/// Errors returned by the speech provider client.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech synthesis not configured: {0}")]
    NotConfigured(String),

    #[error("Speech provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Speech request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Empty audio response")]
    EmptyAudio,
}

impl SpeechError {
    /// Create a not-configured error.
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured(message.into())
    }

    /// Create a provider error from an HTTP status and body.
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }
}
