//! Per-request detection results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::currency::CurrencyType;
use crate::detection::ReconciledDetection;

/// Why a detection request did not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionFailure {
    /// The binary stage found nothing.
    NoCurrencyDetected,
    /// The routed denomination model found nothing.
    NoSpecificClassDetected,
    /// The best detection fell below the final acceptance threshold.
    LowConfidenceDetection,
}

impl DetectionFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionFailure::NoCurrencyDetected => "no_currency_detected",
            DetectionFailure::NoSpecificClassDetected => "no_specific_class_detected",
            DetectionFailure::LowConfidenceDetection => "low_confidence_detection",
        }
    }

    /// Human-readable status message for this failure.
    pub fn message(&self, currency_type: Option<CurrencyType>) -> String {
        match self {
            DetectionFailure::NoCurrencyDetected => "no currency detected".to_string(),
            DetectionFailure::NoSpecificClassDetected => match currency_type {
                Some(ty) => format!("no specific class detected for {}", ty.family_name()),
                None => "no specific class detected".to_string(),
            },
            DetectionFailure::LowConfidenceDetection => "low-confidence detection".to_string(),
        }
    }
}

impl fmt::Display for DetectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one detection request.
///
/// Failures are ordinary values: `success` is false, `detections` is empty
/// and `failure` names the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub success: bool,
    #[serde(rename = "type")]
    pub currency_type: Option<CurrencyType>,
    pub detections: Vec<ReconciledDetection>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<DetectionFailure>,
}

impl DetectionResult {
    /// A successful result carrying exactly one detection.
    pub fn detected(currency_type: CurrencyType, detection: ReconciledDetection) -> Self {
        let message = format!("detected {}", detection.class_name());
        Self {
            success: true,
            currency_type: Some(currency_type),
            detections: vec![detection],
            message,
            failure: None,
        }
    }

    /// A failed result; the currency type is kept when routing already happened.
    pub fn failed(failure: DetectionFailure, currency_type: Option<CurrencyType>) -> Self {
        Self {
            success: false,
            currency_type,
            detections: Vec::new(),
            message: failure.message(currency_type),
            failure: Some(failure),
        }
    }

    /// The announced detection, if any.
    pub fn best(&self) -> Option<&ReconciledDetection> {
        self.detections.first()
    }
}
