//! YOLOv8 currency detector on ONNX Runtime.
//!
//! Execution providers are chosen per [`Device`]:
//! - CUDA on Linux with NVIDIA GPU (when the `cuda` feature is enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::Mutex;

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array2;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info, warn};

use denar_models::{BoundingBox, ModelKey, RawDetection};

use super::model::CurrencyModel;
use crate::config::Device;
use crate::error::{VisionError, VisionResult};
use crate::geometry::non_max_suppression;

/// Upper bound on detections returned per inference call.
pub const MAX_DETECTIONS: usize = 300;

/// Name of the YOLOv8 output tensor.
const OUTPUT_NAME: &str = "output0";

/// Detector backed by an exported YOLOv8 ONNX model.
pub struct OnnxDetector {
    key: ModelKey,
    session: Mutex<Session>,
    class_names: Vec<String>,
    input_size: u32,
}

impl OnnxDetector {
    /// Load a model from disk.
    ///
    /// Class names are read from the model's `names` metadata entry; missing
    /// entries fall back to `class_{id}`.
    pub fn load(key: ModelKey, path: &Path, device: Device, input_size: u32) -> VisionResult<Self> {
        if !path.exists() {
            return Err(VisionError::ModelNotFound(path.to_path_buf()));
        }

        let session = create_session(key, path, device)?;
        let class_names = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten())
            .map(|raw| parse_class_names(&raw))
            .unwrap_or_default();

        info!(
            model = %key,
            path = %path.display(),
            classes = class_names.len(),
            input_size,
            "Currency model loaded"
        );

        Ok(Self {
            key,
            session: Mutex::new(session),
            class_names,
            input_size,
        })
    }

    pub fn key(&self) -> ModelKey {
        self.key
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn class_name(&self, class_id: usize) -> String {
        self.class_names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    /// Resize to the square model input, scale to [0, 1] and lay out as NCHW.
    fn to_input(&self, image: &DynamicImage) -> VisionResult<Value> {
        let size = self.input_size;
        let rgb = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();
        let (w, h) = (size as usize, size as usize);

        let mut chw: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for pixel in rgb.pixels() {
                chw.push(pixel[c] as f32 / 255.0);
            }
        }

        Tensor::from_array((vec![1usize, 3, h, w], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::inference(format!("Failed to create input tensor: {}", e)))
    }

    /// Run the session and copy the output tensor out of the lock.
    fn run(&self, input: Value) -> VisionResult<(Vec<i64>, Vec<f32>)> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::inference("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get(OUTPUT_NAME)
            .ok_or_else(|| VisionError::inference("Missing output0 tensor"))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("Failed to extract tensor: {}", e)))?;

        Ok((shape.to_vec(), data.to_vec()))
    }
}

impl CurrencyModel for OnnxDetector {
    fn infer(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> VisionResult<Vec<RawDetection>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::invalid_image("Image has zero size"));
        }

        let input = self.to_input(image)?;
        let (shape, data) = self.run(input)?;
        let candidates = decode_output(
            &shape,
            data,
            (width, height),
            self.input_size,
            confidence_threshold,
            |id| self.class_name(id),
        )?;

        let mut detections = non_max_suppression(candidates, iou_threshold);
        detections.truncate(MAX_DETECTIONS);

        debug!(model = %self.key, count = detections.len(), "Inference completed");
        Ok(detections)
    }

    fn name(&self) -> &str {
        self.key.as_str()
    }
}

/// Decode a YOLOv8 `[1, 4 + classes, candidates]` output into detections.
///
/// Boxes come out as `cx, cy, w, h` in model-input pixels and are mapped back
/// to the source image size and clamped to its bounds.
fn decode_output(
    shape: &[i64],
    data: Vec<f32>,
    image_size: (u32, u32),
    input_size: u32,
    confidence_threshold: f32,
    class_name: impl Fn(usize) -> String,
) -> VisionResult<Vec<RawDetection>> {
    let (features, boxes) = match shape {
        [1, features, boxes] if *features > 4 && *boxes >= 0 => (*features as usize, *boxes as usize),
        _ => {
            return Err(VisionError::inference(format!(
                "Unexpected output shape: {:?}",
                shape
            )))
        }
    };
    let num_classes = features - 4;

    let output = Array2::from_shape_vec((features, boxes), data)
        .map_err(|e| VisionError::inference(format!("Failed to reshape output: {}", e)))?;
    let rows = output.t();

    let (width, height) = (image_size.0 as f32, image_size.1 as f32);
    let scale_w = width / input_size as f32;
    let scale_h = height / input_size as f32;

    let mut candidates = Vec::new();
    for row in rows.outer_iter() {
        let (class_id, score) = (0..num_classes)
            .map(|c| (c, row[4 + c]))
            .fold((0usize, f32::MIN), |best, (c, s)| if s > best.1 { (c, s) } else { best });

        if score.is_nan() || score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let x1 = ((cx - w / 2.0) * scale_w).clamp(0.0, width);
        let y1 = ((cy - h / 2.0) * scale_h).clamp(0.0, height);
        let x2 = ((cx + w / 2.0) * scale_w).clamp(0.0, width);
        let y2 = ((cy + h / 2.0) * scale_h).clamp(0.0, height);

        let Ok(bbox) = BoundingBox::new(x1, y1, x2, y2) else {
            continue;
        };
        if let Ok(det) = RawDetection::new(bbox, score.clamp(0.0, 1.0), class_id, class_name(class_id)) {
            candidates.push(det);
        }
    }

    Ok(candidates)
}

/// Parse the `names` metadata written by the YOLO exporter,
/// e.g. `{0: 'note', 1: 'coin'}`.
fn parse_class_names(raw: &str) -> Vec<String> {
    let body = raw.trim().trim_start_matches('{').trim_end_matches('}');
    let mut entries: Vec<(usize, String)> = body
        .split(',')
        .filter_map(|entry| {
            let (id, name) = entry.split_once(':')?;
            let id = id.trim().parse::<usize>().ok()?;
            let name = name.trim().trim_matches(|c| c == '\'' || c == '"');
            Some((id, name.to_string()))
        })
        .collect();
    entries.sort_by_key(|(id, _)| *id);

    let len = entries.last().map(|(id, _)| id + 1).unwrap_or(0);
    let mut names: Vec<String> = (0..len).map(|id| format!("class_{}", id)).collect();
    for (id, name) in entries {
        names[id] = name;
    }
    names
}

/// Create an ONNX Runtime session, trying the providers allowed by `device`.
fn create_session(key: ModelKey, path: &Path, device: Device) -> VisionResult<Session> {
    let load_err = |e: &dyn std::fmt::Display| VisionError::model_load(key, path, e.to_string());

    let model_bytes = std::fs::read(path).map_err(|e| load_err(&e))?;
    let builder = Session::builder()
        .map_err(|e| load_err(&e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| load_err(&e))?;

    if matches!(device, Device::Auto | Device::Cuda) {
        if let Some(session) = try_cuda(&builder, &model_bytes) {
            info!(model = %key, "Using CUDA execution provider");
            return Ok(session);
        }
        if device == Device::Cuda {
            warn!(model = %key, "CUDA execution provider not available, falling back to CPU");
        }
    }

    if matches!(device, Device::Auto | Device::CoreMl) {
        if let Some(session) = try_coreml(&builder, &model_bytes) {
            info!(model = %key, "Using CoreML execution provider");
            return Ok(session);
        }
        if device == Device::CoreMl {
            warn!(model = %key, "CoreML execution provider not available, falling back to CPU");
        }
    }

    info!(model = %key, "Using CPU execution provider");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| load_err(&e))
}

#[cfg(all(target_os = "linux", feature = "cuda"))]
fn try_cuda(builder: &SessionBuilder, model_bytes: &[u8]) -> Option<Session> {
    use ort::execution_providers::CUDAExecutionProvider;
    builder
        .clone()
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .ok()?
        .commit_from_memory(model_bytes)
        .ok()
}

#[cfg(not(all(target_os = "linux", feature = "cuda")))]
fn try_cuda(_builder: &SessionBuilder, _model_bytes: &[u8]) -> Option<Session> {
    None
}

#[cfg(target_os = "macos")]
fn try_coreml(builder: &SessionBuilder, model_bytes: &[u8]) -> Option<Session> {
    use ort::execution_providers::CoreMLExecutionProvider;
    builder
        .clone()
        .with_execution_providers([CoreMLExecutionProvider::default().build()])
        .ok()?
        .commit_from_memory(model_bytes)
        .ok()
}

#[cfg(not(target_os = "macos"))]
fn try_coreml(_builder: &SessionBuilder, _model_bytes: &[u8]) -> Option<Session> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a `[1, 4 + classes, n]` output from per-candidate rows.
    fn output(rows: &[[f32; 6]]) -> (Vec<i64>, Vec<f32>) {
        let features = 6;
        let mut data = vec![0.0; features * rows.len()];
        for (i, row) in rows.iter().enumerate() {
            for (f, value) in row.iter().enumerate() {
                data[f * rows.len() + i] = *value;
            }
        }
        (vec![1, features as i64, rows.len() as i64], data)
    }

    fn names(id: usize) -> String {
        ["note", "coin"].get(id).map(|s| s.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_decode_maps_to_image_coordinates() {
        // Center box of 320x320 on a 640 input, image is 1280x640
        let (shape, data) = output(&[[320.0, 320.0, 320.0, 320.0, 0.1, 0.8]]);
        let dets = decode_output(&shape, data, (1280, 640), 640, 0.35, names).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_name(), "coin");
        assert_eq!(dets[0].class_id(), 1);
        assert_eq!(dets[0].bbox().to_array(), [320.0, 160.0, 960.0, 480.0]);
    }

    #[test]
    fn test_decode_filters_and_clamps() {
        let (shape, data) = output(&[
            [10.0, 10.0, 40.0, 40.0, 0.9, 0.0],
            [300.0, 300.0, 20.0, 20.0, 0.2, 0.1],
        ]);
        let dets = decode_output(&shape, data, (640, 640), 640, 0.35, names).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_name(), "note");
        assert_eq!(dets[0].bbox().x1(), 0.0);
        assert_eq!(dets[0].bbox().y1(), 0.0);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        assert!(decode_output(&[1, 3, 2], vec![0.0; 6], (640, 640), 640, 0.3, names).is_err());
        assert!(decode_output(&[1, 6, 2], vec![0.0; 5], (640, 640), 640, 0.3, names).is_err());
    }

    #[test]
    fn test_parse_class_names() {
        assert_eq!(parse_class_names("{0: 'note', 1: 'coin'}"), vec!["note", "coin"]);
        assert_eq!(
            parse_class_names("{1: '5_coin', 0: \"1_coin\", 3: '50_coin'}"),
            vec!["1_coin", "5_coin", "class_2", "50_coin"]
        );
        assert!(parse_class_names("").is_empty());
    }

    #[test]
    fn test_load_missing_model() {
        let result = OnnxDetector::load(
            ModelKey::Binary,
            Path::new("/nonexistent/binary_model.onnx"),
            Device::Cpu,
            640,
        );
        assert!(matches!(result, Err(VisionError::ModelNotFound(_))));
    }
}
