//! ElevenLabs text-to-speech client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{SpeechConfig, VoiceSettings};
use crate::error::{SpeechError, SpeechResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Turns announcement text into audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into MP3 bytes.
    async fn synthesize(&self, text: &str) -> SpeechResult<Vec<u8>>;
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// Client for the ElevenLabs text-to-speech endpoint.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    base_url: String,
    voice_id: String,
    model_id: String,
    voice_settings: VoiceSettings,
}

impl ElevenLabsClient {
    /// Create a client from config. Fails when no API key is configured.
    pub fn new(config: &SpeechConfig) -> SpeechResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SpeechError::not_configured("ELEVENLABS_API_KEY not set"))?;

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            voice_settings: config.voice_settings,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> SpeechResult<Vec<u8>> {
        let request = SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: self.voice_settings,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .header(ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "ElevenLabs request failed");
            return Err(SpeechError::provider(status.as_u16(), body));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }

        debug!(bytes = audio.len(), voice_id = %self.voice_id, "Synthesized announcement");
        Ok(audio.to_vec())
    }
}
