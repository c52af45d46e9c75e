//! Two-stage currency detection.
//!
//! ```text
//! binary detect -> type route -> specific detect -> reconcile -> finalize
//! ```
//!
//! The binary model decides between banknote and coin; its best detection
//! routes the image to the matching denomination model. Both stages are
//! optionally reconciled by overlap before a single best detection is kept.
//! Every failure is an ordinary [`DetectionResult`].

use std::borrow::Cow;
use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, info};

use denar_models::{
    CurrencyType, DetectionFailure, DetectionResult, ModelKey, RawDetection, ReconciledDetection,
};

use super::ensemble::reconcile;
use super::registry::ModelRegistry;
use crate::config::{Device, DetectorConfig, ModelPaths, Thresholds, MIN_FINAL_CONFIDENCE};
use crate::error::VisionResult;
use crate::metrics;
use crate::preprocess::{Preprocess, StandardPreprocessor};

/// Per-request switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    /// Run the preprocessor before the binary stage
    pub use_preprocessing: bool,
    /// Reconcile specific detections against the binary stage
    pub use_ensemble: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            use_preprocessing: true,
            use_ensemble: true,
        }
    }
}

/// Image fed to a stage, with the factor it was resized by.
struct StageImage<'a> {
    image: Cow<'a, DynamicImage>,
    scale: f32,
}

impl<'a> StageImage<'a> {
    fn raw(image: &'a DynamicImage) -> Self {
        Self {
            image: Cow::Borrowed(image),
            scale: 1.0,
        }
    }
}

/// Detector handle: the loaded registry plus thresholds and preprocessing.
///
/// Cheap to share behind an `Arc`; `detect` takes `&self` and holds no
/// per-request state.
#[derive(Clone)]
pub struct CurrencyDetector {
    registry: ModelRegistry,
    thresholds: Thresholds,
    preprocessor: Arc<dyn Preprocess>,
}

impl std::fmt::Debug for CurrencyDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyDetector")
            .field("registry", &self.registry)
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl CurrencyDetector {
    /// Load the three models with default thresholds and preprocessing.
    pub fn init(paths: &ModelPaths, device: Device) -> VisionResult<Self> {
        Self::from_config(&DetectorConfig {
            model_paths: paths.clone(),
            device,
            ..DetectorConfig::default()
        })
    }

    /// Load the three models described by `config`.
    pub fn from_config(config: &DetectorConfig) -> VisionResult<Self> {
        let registry = ModelRegistry::load(&config.model_paths, config.device, config.input_size)?;
        Ok(Self::new(
            registry,
            config.thresholds,
            Arc::new(StandardPreprocessor::new(config.preprocess_max_side)),
        ))
    }

    pub fn new(
        registry: ModelRegistry,
        thresholds: Thresholds,
        preprocessor: Arc<dyn Preprocess>,
    ) -> Self {
        Self {
            registry,
            thresholds,
            preprocessor,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Detect a single banknote or coin in `image`.
    pub fn detect(&self, image: &DynamicImage, options: DetectOptions) -> DetectionResult {
        let result = self.run_pipeline(image, options);
        metrics::record_detection(&result);

        match result.best() {
            Some(best) => info!(
                class_name = best.class_name(),
                confidence = best.effective_confidence(),
                "Currency detected"
            ),
            None => info!(message = %result.message, "No currency announced"),
        }
        result
    }

    fn run_pipeline(&self, image: &DynamicImage, options: DetectOptions) -> DetectionResult {
        let binary_image = if options.use_preprocessing {
            let processed = self.preprocessor.preprocess(image);
            StageImage {
                image: Cow::Owned(processed.image),
                scale: processed.scale,
            }
        } else {
            StageImage::raw(image)
        };

        let binary = self.run_stage(&binary_image, ModelKey::Binary, self.thresholds.binary);
        debug!(count = binary.len(), scale = binary_image.scale, "Binary stage done");

        let Some(routed) = highest_confidence(&binary) else {
            return DetectionResult::failed(DetectionFailure::NoCurrencyDetected, None);
        };
        let currency_type = CurrencyType::from_class_name(routed.class_name());
        debug!(
            class_name = routed.class_name(),
            confidence = routed.confidence(),
            currency_type = %currency_type,
            "Routed by binary stage"
        );

        // Notes reuse the binary-stage image; coins run on the raw image.
        let specific_image = match currency_type {
            CurrencyType::Note => StageImage {
                image: Cow::Borrowed(binary_image.image.as_ref()),
                scale: binary_image.scale,
            },
            CurrencyType::Coin => StageImage::raw(image),
        };

        let specific = self.run_stage(
            &specific_image,
            currency_type.specific_model(),
            self.thresholds.specific(currency_type),
        );
        debug!(count = specific.len(), currency_type = %currency_type, "Specific stage done");

        if specific.is_empty() {
            return DetectionResult::failed(
                DetectionFailure::NoSpecificClassDetected,
                Some(currency_type),
            );
        }

        let candidates = if options.use_ensemble {
            let binary_in_specific: Vec<RawDetection> = binary
                .iter()
                .map(|d| d.unscaled(binary_image.scale).rescaled(specific_image.scale))
                .collect();
            reconcile(&binary_in_specific, &specific)
        } else {
            specific.into_iter().map(ReconciledDetection::from).collect()
        };

        let Some(best) = select_best(candidates) else {
            return DetectionResult::failed(
                DetectionFailure::NoSpecificClassDetected,
                Some(currency_type),
            );
        };
        if best.effective_confidence() < MIN_FINAL_CONFIDENCE {
            debug!(
                confidence = best.effective_confidence(),
                "Best detection below final threshold"
            );
            return DetectionResult::failed(
                DetectionFailure::LowConfidenceDetection,
                Some(currency_type),
            );
        }

        DetectionResult::detected(currency_type, best.unscaled(specific_image.scale))
    }

    /// Run one stage; inference errors count as no detections.
    fn run_stage(&self, stage: &StageImage<'_>, key: ModelKey, threshold: f32) -> Vec<RawDetection> {
        self.registry
            .detect_filtered(&stage.image, key, threshold)
            .unwrap_or_default()
    }
}

/// First detection with the highest confidence.
fn highest_confidence(detections: &[RawDetection]) -> Option<&RawDetection> {
    detections.iter().fold(None, |best, det| match best {
        Some(b) if b.confidence() >= det.confidence() => Some(b),
        _ => Some(det),
    })
}

/// First detection with the highest effective confidence.
fn select_best(candidates: Vec<ReconciledDetection>) -> Option<ReconciledDetection> {
    candidates.into_iter().fold(None, |best, det| match best {
        Some(b) if b.effective_confidence() >= det.effective_confidence() => Some(b),
        _ => Some(det),
    })
}
