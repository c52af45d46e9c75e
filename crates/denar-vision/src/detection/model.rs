//! Detector abstraction used by the registry.

use image::DynamicImage;

use denar_models::RawDetection;

use crate::error::VisionResult;

/// A pre-trained object detector.
///
/// Implementations must be safe for concurrent inference; sessions that need
/// exclusive access serialize internally.
pub trait CurrencyModel: Send + Sync {
    /// Run inference and return detections with boxes in `image` pixel
    /// coordinates, filtered by `confidence_threshold` and suppressed at
    /// `iou_threshold`.
    fn infer(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> VisionResult<Vec<RawDetection>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
