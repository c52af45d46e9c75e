//! Announcement text plus optional audio.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use denar_models::DetectionResult;

use crate::announcement::{compose_announcement, Language};
use crate::client::{ElevenLabsClient, SpeechSynthesizer};
use crate::config::SpeechConfig;
use crate::error::{SpeechError, SpeechResult};

/// Spoken text and, when synthesized, its MP3 audio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub text: String,
    #[serde(skip)]
    pub audio: Option<Vec<u8>>,
}

/// Composes announcements and synthesizes them when a provider is configured.
#[derive(Clone)]
pub struct Announcer {
    language: Language,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl std::fmt::Debug for Announcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Announcer")
            .field("language", &self.language)
            .field("synthesis", &self.synthesizer.is_some())
            .finish()
    }
}

impl Announcer {
    pub fn new(language: Language, synthesizer: Option<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self {
            language,
            synthesizer,
        }
    }

    /// Text-only announcer.
    pub fn text_only(language: Language) -> Self {
        Self::new(language, None)
    }

    /// Build from config; synthesis is enabled only with an API key and `TTS_ENABLED`.
    pub fn from_config(config: &SpeechConfig) -> SpeechResult<Self> {
        if !config.synthesis_available() {
            info!(language = %config.language, "Speech synthesis disabled");
            return Ok(Self::text_only(config.language));
        }
        let client = ElevenLabsClient::new(config)?;
        info!(language = %config.language, voice_id = %config.voice_id, "Speech synthesis enabled");
        Ok(Self::new(config.language, Some(Arc::new(client))))
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn can_synthesize(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Announcement text for `result`.
    pub fn text(&self, result: &DetectionResult) -> String {
        compose_announcement(result, self.language)
    }

    /// Synthesize the announcement for `result`.
    pub async fn speak(&self, result: &DetectionResult) -> SpeechResult<Vec<u8>> {
        let synthesizer = self
            .synthesizer
            .as_ref()
            .ok_or_else(|| SpeechError::not_configured("speech synthesis disabled"))?;
        synthesizer.synthesize(&self.text(result)).await
    }

    /// Compose the text and attach audio when synthesis is available.
    ///
    /// Synthesis failures are logged and leave `audio` empty.
    pub async fn announce(&self, result: &DetectionResult) -> Announcement {
        let text = self.text(result);
        let audio = match &self.synthesizer {
            Some(synthesizer) => match synthesizer.synthesize(&text).await {
                Ok(audio) => Some(audio),
                Err(e) => {
                    warn!(error = %e, "Speech synthesis failed");
                    None
                }
            },
            None => None,
        };
        Announcement { text, audio }
    }
}
