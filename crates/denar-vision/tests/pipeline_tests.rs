//! End-to-end tests of the two-stage pipeline with scripted models.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GenericImageView};

use denar_models::{BoundingBox, CurrencyType, DetectionFailure, ModelKey, RawDetection};
use denar_vision::{
    CurrencyDetector, CurrencyModel, DetectOptions, IdentityPreprocessor, ModelPaths,
    ModelRegistry, Preprocess, Preprocessed, Thresholds, VisionError, VisionResult,
};

/// Returns the same detections on every call and records the image sizes it saw.
struct ScriptedModel {
    detections: Vec<RawDetection>,
    seen: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedModel {
    fn new(detections: Vec<RawDetection>) -> Arc<Self> {
        Arc::new(Self {
            detections,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<(u32, u32)> {
        self.seen.lock().unwrap().clone()
    }
}

impl CurrencyModel for ScriptedModel {
    fn infer(&self, image: &DynamicImage, _: f32, _: f32) -> VisionResult<Vec<RawDetection>> {
        self.seen.lock().unwrap().push(image.dimensions());
        Ok(self.detections.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct FailingModel;

impl CurrencyModel for FailingModel {
    fn infer(&self, _: &DynamicImage, _: f32, _: f32) -> VisionResult<Vec<RawDetection>> {
        Err(VisionError::inference("session crashed"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Halves the image, like a downscaling preprocessor.
struct HalvingPreprocessor;

impl Preprocess for HalvingPreprocessor {
    fn preprocess(&self, image: &DynamicImage) -> Preprocessed {
        let (w, h) = image.dimensions();
        Preprocessed {
            image: image.resize_exact(w / 2, h / 2, image::imageops::FilterType::Nearest),
            scale: 0.5,
        }
    }
}

fn det(class_name: &str, confidence: f32, bbox: [f32; 4]) -> RawDetection {
    let bbox = BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]).unwrap();
    RawDetection::new(bbox, confidence, 0, class_name).unwrap()
}

fn detector_with(
    binary: Arc<dyn CurrencyModel>,
    banknote: Arc<dyn CurrencyModel>,
    coin: Arc<dyn CurrencyModel>,
    preprocessor: Arc<dyn Preprocess>,
) -> CurrencyDetector {
    let mut models: HashMap<ModelKey, Arc<dyn CurrencyModel>> = HashMap::new();
    models.insert(ModelKey::Binary, binary);
    models.insert(ModelKey::Banknote, banknote);
    models.insert(ModelKey::Coin, coin);
    let registry = ModelRegistry::new(models).unwrap();
    CurrencyDetector::new(registry, Thresholds::default(), preprocessor)
}

fn detector(
    binary: Vec<RawDetection>,
    banknote: Vec<RawDetection>,
    coin: Vec<RawDetection>,
) -> CurrencyDetector {
    detector_with(
        ScriptedModel::new(binary),
        ScriptedModel::new(banknote),
        ScriptedModel::new(coin),
        Arc::new(IdentityPreprocessor),
    )
}

fn image() -> DynamicImage {
    DynamicImage::new_rgb8(400, 200)
}

#[test]
fn test_note_confirmed_by_binary_stage() {
    let detector = detector(
        vec![det("note", 0.9, [0.0, 0.0, 100.0, 50.0])],
        vec![det("100_note", 0.6, [2.0, 2.0, 98.0, 48.0])],
        vec![],
    );

    let result = detector.detect(&image(), DetectOptions::default());

    assert!(result.success);
    assert_eq!(result.currency_type, Some(CurrencyType::Note));
    assert_eq!(result.detections.len(), 1);
    let best = &result.detections[0];
    assert_eq!(best.class_name(), "100_note");
    assert_eq!(best.ensemble_confidence(), Some(0.9));
    assert_eq!(best.binary_confidence(), Some(0.9));
    assert_eq!(result.message, "detected 100_note");
}

#[test]
fn test_no_binary_detection() {
    let detector = detector(vec![], vec![det("100_note", 0.9, [0.0, 0.0, 10.0, 10.0])], vec![]);

    let result = detector.detect(&image(), DetectOptions::default());

    assert!(!result.success);
    assert_eq!(result.currency_type, None);
    assert_eq!(result.message, "no currency detected");
    assert_eq!(result.failure, Some(DetectionFailure::NoCurrencyDetected));
    assert!(result.detections.is_empty());
}

#[test]
fn test_low_confidence_coin() {
    let detector = detector(
        vec![det("coin", 0.5, [0.0, 0.0, 20.0, 20.0])],
        vec![],
        vec![det("5_coin", 0.3, [200.0, 100.0, 220.0, 120.0])],
    );

    let result = detector.detect(&image(), DetectOptions::default());

    assert!(!result.success);
    assert_eq!(result.currency_type, Some(CurrencyType::Coin));
    assert_eq!(result.message, "low-confidence detection");
    assert_eq!(result.failure, Some(DetectionFailure::LowConfidenceDetection));
}

#[test]
fn test_highest_specific_confidence_wins() {
    let detector = detector(
        vec![det("coin", 0.6, [0.0, 0.0, 10.0, 10.0])],
        vec![],
        vec![
            det("10_coin", 0.7, [100.0, 100.0, 140.0, 140.0]),
            det("50_coin", 0.9, [200.0, 50.0, 240.0, 90.0]),
        ],
    );

    let result = detector.detect(&image(), DetectOptions::default());

    assert!(result.success);
    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.detections[0].class_name(), "50_coin");
    assert_eq!(result.detections[0].ensemble_confidence(), None);
}

#[test]
fn test_no_specific_detection_names_family() {
    let detector = detector(vec![det("note", 0.8, [0.0, 0.0, 10.0, 10.0])], vec![], vec![]);

    let result = detector.detect(&image(), DetectOptions::default());

    assert!(!result.success);
    assert_eq!(result.currency_type, Some(CurrencyType::Note));
    assert_eq!(result.message, "no specific class detected for banknote");
}

#[test]
fn test_routing_uses_highest_binary_confidence() {
    let detector = detector(
        vec![
            det("note", 0.4, [0.0, 0.0, 10.0, 10.0]),
            det("coin", 0.8, [50.0, 50.0, 80.0, 80.0]),
        ],
        vec![det("100_note", 0.9, [0.0, 0.0, 10.0, 10.0])],
        vec![det("2_coin", 0.7, [50.0, 50.0, 80.0, 80.0])],
    );

    let result = detector.detect(&image(), DetectOptions::default());

    assert_eq!(result.currency_type, Some(CurrencyType::Coin));
    assert_eq!(result.detections[0].class_name(), "2_coin");
    assert_eq!(result.detections[0].ensemble_confidence(), Some(0.8));
}

#[test]
fn test_inference_failure_counts_as_empty() {
    let failing = detector_with(
        Arc::new(FailingModel),
        ScriptedModel::new(vec![]),
        ScriptedModel::new(vec![]),
        Arc::new(IdentityPreprocessor),
    );
    let result = failing.detect(&image(), DetectOptions::default());
    assert_eq!(result.failure, Some(DetectionFailure::NoCurrencyDetected));

    let specific_fails = detector_with(
        ScriptedModel::new(vec![det("coin", 0.9, [0.0, 0.0, 10.0, 10.0])]),
        ScriptedModel::new(vec![]),
        Arc::new(FailingModel),
        Arc::new(IdentityPreprocessor),
    );
    let result = specific_fails.detect(&image(), DetectOptions::default());
    assert_eq!(result.failure, Some(DetectionFailure::NoSpecificClassDetected));
    assert_eq!(result.currency_type, Some(CurrencyType::Coin));
}

#[test]
fn test_ensemble_disabled_uses_specific_confidence() {
    let detector = detector(
        vec![det("note", 0.95, [0.0, 0.0, 100.0, 50.0])],
        vec![det("50_note", 0.35, [0.0, 0.0, 100.0, 50.0])],
        vec![],
    );
    let options = DetectOptions {
        use_ensemble: false,
        ..DetectOptions::default()
    };

    let result = detector.detect(&image(), options);
    assert_eq!(result.failure, Some(DetectionFailure::LowConfidenceDetection));

    // The same input passes once the binary stage confirms it
    let result = detector.detect(&image(), DetectOptions::default());
    assert!(result.success);
    assert_eq!(result.detections[0].effective_confidence(), 0.95);
}

#[test]
fn test_note_box_mapped_back_to_original_image() {
    let binary = ScriptedModel::new(vec![det("note", 0.9, [10.0, 10.0, 60.0, 35.0])]);
    let banknote = ScriptedModel::new(vec![det("200_note", 0.8, [10.0, 10.0, 60.0, 35.0])]);
    let coin = ScriptedModel::new(vec![]);
    let detector = detector_with(
        binary.clone(),
        banknote.clone(),
        coin,
        Arc::new(HalvingPreprocessor),
    );

    let result = detector.detect(&image(), DetectOptions::default());

    assert!(result.success);
    assert_eq!(binary.seen(), vec![(200, 100)]);
    assert_eq!(banknote.seen(), vec![(200, 100)]);
    assert_eq!(result.detections[0].bbox().to_array(), [20.0, 20.0, 120.0, 70.0]);
    assert_eq!(result.detections[0].ensemble_confidence(), Some(0.9));
}

#[test]
fn test_coin_runs_on_raw_image() {
    // Binary boxes come from the halved image; the coin model sees full size
    let binary = ScriptedModel::new(vec![det("coin", 0.7, [50.0, 25.0, 75.0, 50.0])]);
    let coin = ScriptedModel::new(vec![det("10_coin", 0.5, [100.0, 50.0, 150.0, 100.0])]);
    let detector = detector_with(
        binary.clone(),
        ScriptedModel::new(vec![]),
        coin.clone(),
        Arc::new(HalvingPreprocessor),
    );

    let result = detector.detect(&image(), DetectOptions::default());

    assert!(result.success);
    assert_eq!(binary.seen(), vec![(200, 100)]);
    assert_eq!(coin.seen(), vec![(400, 200)]);
    let best = &result.detections[0];
    assert_eq!(best.bbox().to_array(), [100.0, 50.0, 150.0, 100.0]);
    assert_eq!(best.ensemble_confidence(), Some(0.7));
}

#[test]
fn test_preprocessing_disabled_uses_raw_image() {
    let binary = ScriptedModel::new(vec![det("note", 0.9, [0.0, 0.0, 100.0, 50.0])]);
    let banknote = ScriptedModel::new(vec![det("1000_note", 0.9, [0.0, 0.0, 100.0, 50.0])]);
    let detector = detector_with(
        binary.clone(),
        banknote.clone(),
        ScriptedModel::new(vec![]),
        Arc::new(HalvingPreprocessor),
    );
    let options = DetectOptions {
        use_preprocessing: false,
        ..DetectOptions::default()
    };

    let result = detector.detect(&image(), options);

    assert!(result.success);
    assert_eq!(binary.seen(), vec![(400, 200)]);
    assert_eq!(banknote.seen(), vec![(400, 200)]);
    assert_eq!(result.detections[0].bbox().to_array(), [0.0, 0.0, 100.0, 50.0]);
}

#[test]
fn test_success_always_single_detection_above_floor() {
    let cases = [
        (0.41, 0.2),
        (0.9, 0.1),
        (0.5, 0.95),
        (0.45, 0.45),
    ];
    for (specific, binary) in cases {
        let detector = detector(
            vec![det("coin", binary, [0.0, 0.0, 30.0, 30.0])],
            vec![],
            vec![
                det("1_coin", specific, [0.0, 0.0, 30.0, 30.0]),
                det("2_coin", specific / 2.0, [100.0, 100.0, 130.0, 130.0]),
            ],
        );
        let result = detector.detect(&image(), DetectOptions::default());
        assert!(result.success);
        assert_eq!(result.detections.len(), 1);
        assert!(result.detections[0].effective_confidence() >= 0.4);
    }
}

#[test]
fn test_init_fails_on_missing_models() {
    let dir = tempfile::tempdir().unwrap();
    let err = CurrencyDetector::init(&ModelPaths::in_dir(dir.path()), denar_vision::Device::Cpu)
        .unwrap_err();
    assert!(err.is_model_load_failure());
    assert!(matches!(err, VisionError::ModelNotFound(_)));
}
