//! Two-stage banknote and coin detection on ONNX Runtime.
//!
//! This crate provides:
//! - IoU and non-maximum suppression
//! - YOLOv8 detector adapter and the model registry
//! - Binary/specific ensemble reconciliation
//! - The detection orchestrator
//! - Preprocessing and extraction of detected currency

pub mod config;
pub mod detection;
pub mod error;
pub mod extraction;
pub mod geometry;
pub mod metrics;
pub mod preprocess;

pub use config::{
    Device, DetectorConfig, ModelPaths, Thresholds, ENSEMBLE_MATCH_IOU, MIN_FINAL_CONFIDENCE,
    NMS_IOU_THRESHOLD,
};
pub use detection::{
    reconcile, CurrencyDetector, CurrencyModel, DetectOptions, ModelRegistry, OnnxDetector,
};
pub use error::{VisionError, VisionResult};
pub use extraction::{
    encode_png_data_url, extract_currency, extract_detections, save_extracted, ExtractedCurrency,
};
pub use geometry::{iou, non_max_suppression};
pub use preprocess::{IdentityPreprocessor, Preprocess, Preprocessed, StandardPreprocessor};
