//! Detection records produced by the detector adapter and the ensemble stage.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{ModelError, ModelResult};

/// A single detection as produced by one model inference call.
///
/// Values are validated on construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDetectionRepr")]
pub struct RawDetection {
    bbox: BoundingBox,
    confidence: f32,
    class_id: usize,
    class_name: String,
}

#[derive(Deserialize)]
struct RawDetectionRepr {
    bbox: BoundingBox,
    confidence: f32,
    class_id: usize,
    class_name: String,
}

impl TryFrom<RawDetectionRepr> for RawDetection {
    type Error = ModelError;

    fn try_from(repr: RawDetectionRepr) -> Result<Self, Self::Error> {
        Self::new(repr.bbox, repr.confidence, repr.class_id, repr.class_name)
    }
}

impl RawDetection {
    /// Create a detection. The confidence must be finite and within `[0, 1]`.
    pub fn new(
        bbox: BoundingBox,
        confidence: f32,
        class_id: usize,
        class_name: impl Into<String>,
    ) -> ModelResult<Self> {
        validate_confidence(confidence)?;
        Ok(Self {
            bbox,
            confidence,
            class_id,
            class_name: class_name.into(),
        })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn class_id(&self) -> usize {
        self.class_id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Copy of this detection with the box mapped back through `scale`.
    pub fn unscaled(&self, scale: f32) -> Self {
        Self {
            bbox: self.bbox.unscale(scale),
            ..self.clone()
        }
    }

    /// Copy of this detection with the box mapped into an image resized by `scale`.
    pub fn rescaled(&self, scale: f32) -> Self {
        Self {
            bbox: self.bbox.rescale(scale),
            ..self.clone()
        }
    }
}

/// A specific-stage detection, optionally confirmed by a binary-stage match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledDetection {
    #[serde(flatten)]
    detection: RawDetection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    binary_confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ensemble_confidence: Option<f32>,
}

impl ReconciledDetection {
    /// Attach the confidence of the binary-stage detection that matched.
    ///
    /// The ensemble confidence is the higher of the two stage confidences,
    /// so it never falls below the specific confidence.
    pub fn confirmed(detection: RawDetection, binary: &RawDetection) -> Self {
        let binary_confidence = binary.confidence();
        let ensemble_confidence = binary_confidence.max(detection.confidence());
        Self {
            detection,
            binary_confidence: Some(binary_confidence),
            ensemble_confidence: Some(ensemble_confidence),
        }
    }

    pub fn detection(&self) -> &RawDetection {
        &self.detection
    }

    pub fn bbox(&self) -> &BoundingBox {
        self.detection.bbox()
    }

    pub fn class_name(&self) -> &str {
        self.detection.class_name()
    }

    pub fn confidence(&self) -> f32 {
        self.detection.confidence()
    }

    pub fn binary_confidence(&self) -> Option<f32> {
        self.binary_confidence
    }

    pub fn ensemble_confidence(&self) -> Option<f32> {
        self.ensemble_confidence
    }

    /// Ensemble confidence when present, otherwise the raw confidence.
    pub fn effective_confidence(&self) -> f32 {
        self.ensemble_confidence
            .unwrap_or_else(|| self.detection.confidence())
    }

    /// Copy of this detection with the box mapped back through `scale`.
    pub fn unscaled(&self, scale: f32) -> Self {
        Self {
            detection: self.detection.unscaled(scale),
            ..self.clone()
        }
    }
}

impl From<RawDetection> for ReconciledDetection {
    fn from(detection: RawDetection) -> Self {
        Self {
            detection,
            binary_confidence: None,
            ensemble_confidence: None,
        }
    }
}

fn validate_confidence(confidence: f32) -> ModelResult<()> {
    if confidence.is_finite() && (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(ModelError::InvalidConfidence(confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 100.0, 50.0).unwrap()
    }

    #[test]
    fn test_confidence_validation() {
        assert!(RawDetection::new(bbox(), 1.2, 0, "note").is_err());
        assert!(RawDetection::new(bbox(), -0.1, 0, "note").is_err());
        assert!(RawDetection::new(bbox(), f32::NAN, 0, "note").is_err());
        assert!(RawDetection::new(bbox(), 0.0, 0, "note").is_ok());
        assert!(RawDetection::new(bbox(), 1.0, 0, "note").is_ok());
    }

    #[test]
    fn test_confirmed_takes_higher_confidence() {
        let det = RawDetection::new(bbox(), 0.6, 3, "100_note").unwrap();
        let strong = RawDetection::new(bbox(), 0.9, 0, "note").unwrap();
        let weak = RawDetection::new(bbox(), 0.4, 0, "note").unwrap();
        let boosted = ReconciledDetection::confirmed(det.clone(), &strong);
        assert_eq!(boosted.ensemble_confidence(), Some(0.9));
        assert_eq!(boosted.binary_confidence(), Some(0.9));
        assert_eq!(boosted.confidence(), 0.6);

        let kept = ReconciledDetection::confirmed(det, &weak);
        assert_eq!(kept.ensemble_confidence(), Some(0.6));
        assert!(kept.effective_confidence() >= kept.confidence());
    }

    #[test]
    fn test_effective_confidence_without_match() {
        let det = RawDetection::new(bbox(), 0.7, 1, "5_coin").unwrap();
        let plain = ReconciledDetection::from(det);
        assert_eq!(plain.ensemble_confidence(), None);
        assert_eq!(plain.effective_confidence(), 0.7);
    }

    #[test]
    fn test_json_shape() {
        let det = RawDetection::new(bbox(), 0.6, 3, "100_note").unwrap();
        let binary = RawDetection::new(bbox(), 0.9, 0, "note").unwrap();
        let boosted = ReconciledDetection::confirmed(det, &binary);
        let value = serde_json::to_value(&boosted).unwrap();

        assert_eq!(value["class_name"], "100_note");
        assert_eq!(value["class_id"], 3);
        assert_eq!(value["bbox"][2], 100.0);
        assert!(value.get("binary_confidence").is_some());

        let parsed: ReconciledDetection = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, boosted);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_confidence() {
        let json = r#"{"bbox":[0,0,1,1],"confidence":1.5,"class_id":0,"class_name":"coin"}"#;
        assert!(serde_json::from_str::<RawDetection>(json).is_err());
    }
}
