//! Application state.

use std::sync::Arc;

use tracing::info;

use denar_speech::{Announcer, SpeechConfig};
use denar_vision::{CurrencyDetector, DetectOptions, DetectorConfig, Device};

use crate::config::ApiConfig;
use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: ApiConfig,
    pub detector: Arc<CurrencyDetector>,
    /// Defaults for the per-request detection switches
    pub options: DetectOptions,
    pub announcer: Announcer,
    /// Requested execution device, reported by `/health`
    pub device: Device,
}

impl AppState {
    /// Load the detector models and build the announcer.
    pub fn new(
        config: ApiConfig,
        detector_config: &DetectorConfig,
        speech_config: &SpeechConfig,
    ) -> ApiResult<Self> {
        let detector = CurrencyDetector::from_config(detector_config)?;
        info!(device = %detector_config.device, "Detector models loaded");
        let announcer = Announcer::from_config(speech_config)?;

        Ok(Self::from_parts(
            config,
            detector,
            DetectOptions {
                use_preprocessing: detector_config.use_preprocessing,
                use_ensemble: detector_config.use_ensemble,
            },
            announcer,
            detector_config.device,
        ))
    }

    /// Assemble state from already-built components.
    pub fn from_parts(
        config: ApiConfig,
        detector: CurrencyDetector,
        options: DetectOptions,
        announcer: Announcer,
        device: Device,
    ) -> Self {
        Self {
            config,
            detector: Arc::new(detector),
            options,
            announcer,
            device,
        }
    }
}
