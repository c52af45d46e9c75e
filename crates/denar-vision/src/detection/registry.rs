//! Model registry and the filtered detection entry point.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use tracing::{error, info};

use denar_models::{ModelKey, RawDetection};

use super::model::CurrencyModel;
use super::object_detector::OnnxDetector;
use crate::config::{Device, ModelPaths, NMS_IOU_THRESHOLD};
use crate::error::{VisionError, VisionResult};
use crate::metrics;

/// The three loaded detectors, keyed by [`ModelKey`].
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone)]
pub struct ModelRegistry {
    models: HashMap<ModelKey, Arc<dyn CurrencyModel>>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.models.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        f.debug_struct("ModelRegistry").field("models", &keys).finish()
    }
}

impl ModelRegistry {
    /// Build a registry from already constructed models.
    ///
    /// Every key in [`ModelKey::ALL`] must be present.
    pub fn new(models: HashMap<ModelKey, Arc<dyn CurrencyModel>>) -> VisionResult<Self> {
        if let Some(missing) = ModelKey::ALL.iter().find(|k| !models.contains_key(k)) {
            return Err(VisionError::invalid_config(format!(
                "no model registered for key {}",
                missing
            )));
        }
        Ok(Self { models })
    }

    /// Load all three ONNX models. Any missing or unloadable file is an error.
    pub fn load(paths: &ModelPaths, device: Device, input_size: u32) -> VisionResult<Self> {
        let mut models: HashMap<ModelKey, Arc<dyn CurrencyModel>> = HashMap::new();
        for key in ModelKey::ALL.iter().copied() {
            let detector = OnnxDetector::load(key, paths.get(key), device, input_size)?;
            models.insert(key, Arc::new(detector));
        }
        info!(device = %device, "All currency models loaded");
        Self::new(models)
    }

    pub fn get(&self, key: ModelKey) -> Option<&Arc<dyn CurrencyModel>> {
        self.models.get(&key)
    }

    /// Run the model under `key` at `confidence_threshold` with the fixed NMS
    /// threshold. Failures are logged and returned to the caller.
    pub fn detect_filtered(
        &self,
        image: &DynamicImage,
        key: ModelKey,
        confidence_threshold: f32,
    ) -> VisionResult<Vec<RawDetection>> {
        let model = self
            .get(key)
            .ok_or_else(|| VisionError::invalid_config(format!("no model for key {}", key)))?;

        let start = Instant::now();
        let result = model.infer(image, confidence_threshold, NMS_IOU_THRESHOLD);
        metrics::record_inference(key, start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            metrics::record_inference_failure(key);
            error!(model = %key, error = %e, "Inference failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denar_models::BoundingBox;

    struct Fixed(Vec<RawDetection>);

    impl CurrencyModel for Fixed {
        fn infer(&self, _: &DynamicImage, conf: f32, iou: f32) -> VisionResult<Vec<RawDetection>> {
            assert_eq!(iou, NMS_IOU_THRESHOLD);
            Ok(self.0.iter().filter(|d| d.confidence() >= conf).cloned().collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn registry(binary: Vec<RawDetection>) -> ModelRegistry {
        let mut models: HashMap<ModelKey, Arc<dyn CurrencyModel>> = HashMap::new();
        models.insert(ModelKey::Binary, Arc::new(Fixed(binary)));
        models.insert(ModelKey::Banknote, Arc::new(Fixed(Vec::new())));
        models.insert(ModelKey::Coin, Arc::new(Fixed(Vec::new())));
        ModelRegistry::new(models).unwrap()
    }

    #[test]
    fn test_new_requires_all_keys() {
        let mut models: HashMap<ModelKey, Arc<dyn CurrencyModel>> = HashMap::new();
        models.insert(ModelKey::Binary, Arc::new(Fixed(Vec::new())));
        assert!(ModelRegistry::new(models).is_err());
    }

    #[test]
    fn test_detect_filtered_passes_threshold() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let reg = registry(vec![
            RawDetection::new(bbox, 0.9, 0, "note").unwrap(),
            RawDetection::new(bbox, 0.2, 1, "coin").unwrap(),
        ]);
        let image = DynamicImage::new_rgb8(16, 16);
        let dets = reg.detect_filtered(&image, ModelKey::Binary, 0.35).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_name(), "note");
    }

    #[test]
    fn test_load_fails_on_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelRegistry::load(&ModelPaths::in_dir(dir.path()), Device::Cpu, 640).unwrap_err();
        assert!(err.is_model_load_failure());
    }
}
