//! Shared data models for the denar currency detector.
//!
//! This crate provides Serde-serializable types for:
//! - Bounding boxes in pixel coordinates
//! - Raw and reconciled detections
//! - Currency types and model registry keys
//! - The denomination table used for announcements
//! - Per-request detection results and failure reasons

pub mod bbox;
pub mod currency;
pub mod denomination;
pub mod detection;
pub mod error;
pub mod result;

// Re-export common types
pub use bbox::BoundingBox;
pub use currency::{CurrencyType, ModelKey};
pub use denomination::{Denomination, DENOMINATIONS};
pub use detection::{RawDetection, ReconciledDetection};
pub use error::{ModelError, ModelResult};
pub use result::{DetectionFailure, DetectionResult};
