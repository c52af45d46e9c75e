//! Detector configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use denar_models::{CurrencyType, ModelKey};

use crate::error::VisionError;

/// IoU threshold used for non-maximum suppression inside every detector.
pub const NMS_IOU_THRESHOLD: f32 = 0.5;

/// Minimum IoU for a binary detection to confirm a specific detection.
pub const ENSEMBLE_MATCH_IOU: f32 = 0.3;

/// Detections below this confidence are never announced.
pub const MIN_FINAL_CONFIDENCE: f32 = 0.4;

/// Execution device for ONNX Runtime sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// CUDA when built with the `cuda` feature, CoreML on macOS, else CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
    CoreMl,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::CoreMl => "coreml",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Device {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            "coreml" | "mps" => Ok(Device::CoreMl),
            _ => Err(VisionError::invalid_config(format!("unknown device: {}", s))),
        }
    }
}

/// Paths of the three models in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub binary: PathBuf,
    pub banknote: PathBuf,
    pub coin: PathBuf,
}

impl ModelPaths {
    /// Default file names inside a model directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            binary: dir.join("binary_model.onnx"),
            banknote: dir.join("banknote_model.onnx"),
            coin: dir.join("coin_model.onnx"),
        }
    }

    pub fn get(&self, key: ModelKey) -> &Path {
        match key {
            ModelKey::Binary => &self.binary,
            ModelKey::Banknote => &self.banknote,
            ModelKey::Coin => &self.coin,
        }
    }

    /// Keys whose model file does not exist.
    pub fn missing(&self) -> Vec<ModelKey> {
        ModelKey::ALL
            .iter()
            .copied()
            .filter(|key| !self.get(*key).exists())
            .collect()
    }
}

/// Per-model confidence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub binary: f32,
    pub banknote: f32,
    pub coin: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            binary: 0.35,
            banknote: 0.45,
            coin: 0.45,
        }
    }
}

impl Thresholds {
    pub fn get(&self, key: ModelKey) -> f32 {
        match key {
            ModelKey::Binary => self.binary,
            ModelKey::Banknote => self.banknote,
            ModelKey::Coin => self.coin,
        }
    }

    /// Threshold of the specific model that handles `currency_type`.
    pub fn specific(&self, currency_type: CurrencyType) -> f32 {
        self.get(currency_type.specific_model())
    }
}

/// Full detector configuration.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Model file locations
    pub model_paths: ModelPaths,
    /// Execution device
    pub device: Device,
    /// Confidence thresholds per model
    pub thresholds: Thresholds,
    /// Square input size expected by the models
    pub input_size: u32,
    /// Longest image side after preprocessing
    pub preprocess_max_side: u32,
    /// Default for the per-request preprocessing flag
    pub use_preprocessing: bool,
    /// Default for the per-request ensemble flag
    pub use_ensemble: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_paths: ModelPaths::in_dir("models"),
            device: Device::Auto,
            thresholds: Thresholds::default(),
            input_size: 640,
            preprocess_max_side: 1280,
            use_preprocessing: true,
            use_ensemble: true,
        }
    }
}

impl DetectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let model_dir = std::env::var("MODEL_DIR").unwrap_or_else(|_| "models".to_string());
        let dir_paths = ModelPaths::in_dir(&model_dir);

        let model_paths = ModelPaths {
            binary: env_path("BINARY_MODEL").unwrap_or(dir_paths.binary),
            banknote: env_path("BANKNOTE_MODEL").unwrap_or(dir_paths.banknote),
            coin: env_path("COIN_MODEL").unwrap_or(dir_paths.coin),
        };

        Self {
            model_paths,
            device: std::env::var("DEVICE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.device),
            thresholds: Thresholds {
                binary: env_parse("BINARY_CONFIDENCE").unwrap_or(defaults.thresholds.binary),
                banknote: env_parse("BANKNOTE_CONFIDENCE").unwrap_or(defaults.thresholds.banknote),
                coin: env_parse("COIN_CONFIDENCE").unwrap_or(defaults.thresholds.coin),
            },
            input_size: env_parse("IMAGE_SIZE").unwrap_or(defaults.input_size),
            preprocess_max_side: env_parse("PREPROCESS_MAX_SIDE")
                .unwrap_or(defaults.preprocess_max_side),
            use_preprocessing: env_flag("USE_PREPROCESSING").unwrap_or(defaults.use_preprocessing),
            use_ensemble: env_flag("USE_ENSEMBLE").unwrap_or(defaults.use_ensemble),
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_default() {
        let t = Thresholds::default();
        assert!((t.binary - 0.35).abs() < 1e-6);
        assert!((t.specific(CurrencyType::Note) - 0.45).abs() < 1e-6);
        assert!((t.specific(CurrencyType::Coin) - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_device_parse() {
        assert_eq!("CPU".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("gpu".parse::<Device>().unwrap(), Device::Cuda);
        assert!("tpu".parse::<Device>().is_err());
    }

    #[test]
    fn test_model_paths_in_dir() {
        let paths = ModelPaths::in_dir("/opt/models");
        assert_eq!(paths.get(ModelKey::Coin), Path::new("/opt/models/coin_model.onnx"));
        assert_eq!(paths.missing().len(), 3);
    }

    #[test]
    fn test_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.input_size, 640);
        assert!(config.use_preprocessing);
        assert!(config.use_ensemble);
    }
}
