//! Currency detection from an uploaded image.

use std::path::Path;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use denar_models::{BoundingBox, CurrencyType, DetectionResult};
use denar_speech::Announcement;
use denar_vision::{
    encode_png_data_url, extract_detections, CurrencyDetector, DetectOptions, VisionError,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Accepted upload extensions.
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

fn default_true() -> bool {
    true
}

/// Query parameters for `POST /detect`.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectQuery {
    /// Attach a cropped PNG of each detection
    #[serde(default = "default_true")]
    pub extract_images: bool,
    /// Synthesize the announcement audio
    #[serde(default)]
    pub speak: bool,
    /// Override the server's preprocessing default
    pub preprocess: Option<bool>,
    /// Override the server's ensemble default
    pub ensemble: Option<bool>,
}

impl Default for DetectQuery {
    fn default() -> Self {
        Self {
            extract_images: true,
            speak: false,
            preprocess: None,
            ensemble: None,
        }
    }
}

impl DetectQuery {
    fn options(&self, defaults: DetectOptions) -> DetectOptions {
        DetectOptions {
            use_preprocessing: self.preprocess.unwrap_or(defaults.use_preprocessing),
            use_ensemble: self.ensemble.unwrap_or(defaults.use_ensemble),
        }
    }
}

/// One detection in the response.
#[derive(Debug, Serialize)]
pub struct DetectionBody {
    pub id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Response of `POST /detect`.
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub currency_type: Option<CurrencyType>,
    pub message: String,
    pub detections: Vec<DetectionBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub announcement: String,
    /// `data:audio/mpeg;base64,...` when speech was requested and synthesized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl DetectResponse {
    fn new(
        result: DetectionResult,
        mut images: Vec<Option<String>>,
        announcement: Announcement,
    ) -> Self {
        images.resize(result.detections.len(), None);
        let detections: Vec<DetectionBody> = result
            .detections
            .iter()
            .zip(images)
            .enumerate()
            .map(|(id, (det, image))| DetectionBody {
                id,
                class_name: det.class_name().to_string(),
                confidence: det.effective_confidence(),
                bbox: *det.bbox(),
                image,
            })
            .collect();

        Self {
            success: result.success,
            currency_type: result.currency_type,
            message: result.message,
            count: result.success.then_some(detections.len()),
            detections,
            announcement: announcement.text,
            audio: announcement
                .audio
                .map(|audio| format!("data:audio/mpeg;base64,{}", STANDARD.encode(audio))),
        }
    }
}

/// The `file` part of the upload.
struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Upload {
    fn validate(&self) -> ApiResult<()> {
        if let Some(name) = &self.file_name {
            let extension = Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
                return Err(ApiError::bad_request(format!(
                    "Invalid file type. Allowed: {}",
                    ALLOWED_EXTENSIONS.join(", ")
                )));
            }
        }

        if let Some(content_type) = &self.content_type {
            if !content_type.starts_with("image/") {
                return Err(ApiError::bad_request("File must be an image"));
            }
        }

        if self.data.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        Ok(())
    }
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(ApiError::from_multipart)?;
        return Ok(Upload {
            file_name,
            content_type,
            data,
        });
    }
    Err(ApiError::bad_request("Missing 'file' field"))
}

/// Decode, detect and optionally extract, off the async runtime.
fn run_detection(
    detector: &CurrencyDetector,
    data: Bytes,
    options: DetectOptions,
    extract_images: bool,
) -> ApiResult<(DetectionResult, Vec<Option<String>>)> {
    let image = image::load_from_memory(&data)
        .map_err(|e| VisionError::invalid_image(format!("could not decode image: {}", e)))?;
    debug!(width = image.width(), height = image.height(), "Decoded upload");

    let result = detector.detect(&image, options);

    let images = if extract_images && result.success {
        extract_detections(&image, &result)
            .iter()
            .map(|item| encode_png_data_url(&item.image).map(Some))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        Vec::new()
    };
    Ok((result, images))
}

/// Detect a Macedonian banknote or coin in the uploaded image.
pub async fn detect(
    State(state): State<AppState>,
    Query(query): Query<DetectQuery>,
    multipart: Multipart,
) -> ApiResult<Json<DetectResponse>> {
    let upload = read_upload(multipart).await?;
    upload.validate()?;

    let options = query.options(state.options);
    let timeout = state.config.detect_timeout;
    let extract_images = query.extract_images;
    let detector = Arc::clone(&state.detector);
    let task = tokio::task::spawn_blocking(move || {
        run_detection(&detector, upload.data, options, extract_images)
    });

    let (result, images) = match tokio::time::timeout(timeout, task).await {
        Ok(joined) => {
            joined.map_err(|e| ApiError::internal(format!("detection task failed: {}", e)))??
        }
        Err(_) => {
            metrics::record_detect_timeout();
            warn!(timeout_secs = timeout.as_secs(), "Detection timed out");
            return Err(ApiError::Timeout);
        }
    };

    let announcement = if query.speak {
        state.announcer.announce(&result).await
    } else {
        Announcement {
            text: state.announcer.text(&result),
            audio: None,
        }
    };

    Ok(Json(DetectResponse::new(result, images, announcement)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: Option<&str>, content_type: Option<&str>, data: &'static [u8]) -> Upload {
        Upload {
            file_name: name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn test_upload_validation() {
        assert!(upload(Some("note.JPG"), Some("image/jpeg"), b"x").validate().is_ok());
        assert!(upload(Some("coin.png"), None, b"x").validate().is_ok());
        assert!(upload(Some("notes.gif"), Some("image/gif"), b"x").validate().is_err());
        assert!(upload(Some("note.png"), Some("text/plain"), b"x").validate().is_err());
        assert!(upload(Some("note.png"), Some("image/png"), b"").validate().is_err());
    }

    #[test]
    fn test_query_overrides_defaults() {
        let defaults = DetectOptions::default();
        let query = DetectQuery {
            ensemble: Some(false),
            ..DetectQuery::default()
        };
        let options = query.options(defaults);
        assert!(options.use_preprocessing);
        assert!(!options.use_ensemble);
    }
}
