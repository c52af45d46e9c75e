//! Speech configuration.

use serde::Serialize;

use crate::announcement::Language;

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2";

/// ElevenLabs voice settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.4,
            similarity_boost: 0.7,
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// ElevenLabs API key; synthesis is disabled without one
    pub api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub base_url: String,
    pub language: Language,
    pub enabled: bool,
    pub voice_settings: VoiceSettings,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language: Language::Macedonian,
            enabled: true,
            voice_settings: VoiceSettings::default(),
        }
    }
}

impl SpeechConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            voice_id: std::env::var("ELEVENLABS_VOICE_ID").unwrap_or(defaults.voice_id),
            model_id: std::env::var("ELEVENLABS_MODEL").unwrap_or(defaults.model_id),
            base_url: std::env::var("ELEVENLABS_BASE_URL").unwrap_or(defaults.base_url),
            language: std::env::var("TTS_LANGUAGE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.language),
            enabled: std::env::var("TTS_ENABLED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            voice_settings: defaults.voice_settings,
        }
    }

    /// Whether audio can be synthesized.
    pub fn synthesis_available(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}
