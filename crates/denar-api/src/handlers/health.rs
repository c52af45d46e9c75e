//! Health check and service banner handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use denar_vision::Device;

use crate::state::AppState;

/// Service banner.
#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub features: Vec<String>,
}

/// Root endpoint.
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Macedonian Currency Detection API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        features: [
            "two-stage banknote and coin detection",
            "ensemble reconciliation",
            "image preprocessing",
            "currency extraction",
            "spoken announcements",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    })
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub device: Device,
    pub preprocessing: bool,
    pub ensemble: bool,
    pub speech: bool,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        device: state.device,
        preprocessing: state.options.use_preprocessing,
        ensemble: state.options.use_ensemble,
        speech: state.announcer.can_synthesize(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
