//! Detection metrics.

use metrics::{counter, histogram};

use denar_models::{DetectionResult, ModelKey};

/// Metric names as constants for consistency.
pub mod names {
    pub const INFERENCE_DURATION_SECONDS: &str = "denar_inference_duration_seconds";
    pub const INFERENCE_FAILURES_TOTAL: &str = "denar_inference_failures_total";
    pub const DETECTIONS_TOTAL: &str = "denar_detections_total";
}

/// Record the duration of one model inference call.
pub fn record_inference(model: ModelKey, duration_secs: f64) {
    let labels = [("model", model.as_str().to_string())];
    histogram!(names::INFERENCE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an inference call that returned an error.
pub fn record_inference_failure(model: ModelKey) {
    let labels = [("model", model.as_str().to_string())];
    counter!(names::INFERENCE_FAILURES_TOTAL, &labels).increment(1);
}

/// Record the outcome of one detection request.
pub fn record_detection(result: &DetectionResult) {
    let outcome = match result.failure {
        Some(failure) => failure.as_str(),
        None => "success",
    };
    let currency_type = result
        .currency_type
        .map(|t| t.as_str())
        .unwrap_or("none");
    let labels = [
        ("outcome", outcome.to_string()),
        ("type", currency_type.to_string()),
    ];
    counter!(names::DETECTIONS_TOTAL, &labels).increment(1);
}
