//! API route handlers

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::application::prediction_service::PredictionService;
use crate::domain::error::InferenceError;
use crate::server::{error::ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status:  &'static str,
    pub model:   String,
    pub version: u32,
    pub stage:   String,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_final_grade: f64,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Student Performance API is up!" }))
}

/// The listener is only bound once the artifact has loaded, so a
/// reachable server is always ready.
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let version = state.service.version();
    Json(ReadyResponse {
        status:  "ready",
        model:   version.name.clone(),
        version: version.version,
        stage:   version.stage.to_string(),
    })
}

/// The body is taken as raw bytes so that a non-object or
/// unparsable body is reported as our own 400, whatever the
/// content type.
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let object = PredictionService::parse_body(&body)?;
    let record = state.service.validate(&object)?;

    let service = Arc::clone(&state.service);
    let task    = tokio::task::spawn_blocking(move || service.predict(&record));

    let prediction = match tokio::time::timeout(state.inference_timeout, task).await {
        Err(_elapsed)     => return Err(ApiError::Inference(InferenceError::Timeout(state.inference_timeout))),
        Ok(Err(join))     => return Err(ApiError::Inference(InferenceError::Worker(join.to_string()))),
        Ok(Ok(Err(err)))  => return Err(ApiError::Inference(err)),
        Ok(Ok(Ok(value))) => value,
    };

    tracing::debug!("Predicted final grade {:.2}", prediction.value());
    Ok(Json(PredictResponse { predicted_final_grade: prediction.rounded() }))
}
