//! Speech synthesis for an existing detection result.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;

use denar_models::DetectionResult;

use crate::error::ApiResult;
use crate::state::AppState;

/// Synthesize the announcement for a posted result as `audio/mpeg`.
pub async fn announce(
    State(state): State<AppState>,
    Json(result): Json<DetectionResult>,
) -> ApiResult<impl IntoResponse> {
    let audio = state.announcer.speak(&result).await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}
