// ============================================================
// Layer 1 — HTTP Error Mapping
// ============================================================
// Turns the domain error taxonomy into responses:
//
//   Malformed           → 400 {"error":"malformed_body","message":…}
//   ValidationError     → 422 {"error":"validation_failed" |
//                              "unknown_category","fields":[…]}
//   InferenceError      → 500 {"error":"internal_error","error_id":…}
//     ::Timeout         → 503 {"error":"inference_timeout","error_id":…}
//
// Server-side failures get a fresh error id. The id and the full
// error go to the log; the client only ever sees the id.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::application::prediction_service::PredictError;
use crate::domain::error::{InferenceError, ValidationError};

#[derive(Debug)]
pub enum ApiError {
    Malformed(String),
    Validation(ValidationError),
    Inference(InferenceError),
}

/// One entry of the 422 `fields` list.
#[derive(Debug, Serialize)]
pub struct FieldBody {
    pub field:  String,
    pub reason: &'static str,
    pub detail: String,
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::Malformed(msg) => ApiError::Malformed(msg),
            PredictError::Invalid(err)   => ApiError::Validation(err),
            PredictError::Inference(err) => ApiError::Inference(err),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Malformed(message) => {
                tracing::info!("Rejected malformed request body");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "malformed_body", "message": message })),
                )
                    .into_response()
            }

            ApiError::Validation(err) => {
                let code = if err.is_unknown_category() { "unknown_category" } else { "validation_failed" };
                tracing::info!("Rejected record ({}): {}", code, err.field_names().join(", "));
                let fields: Vec<FieldBody> = err
                    .fields
                    .iter()
                    .map(|f| FieldBody {
                        field:  f.field.clone(),
                        reason: f.kind.code(),
                        detail: f.kind.to_string(),
                    })
                    .collect();
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": code, "fields": fields })),
                )
                    .into_response()
            }

            ApiError::Inference(InferenceError::Timeout(limit)) => {
                let error_id = Uuid::new_v4();
                tracing::error!("Inference timed out after {:?} [{}]", limit, error_id);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "inference_timeout", "error_id": error_id })),
                )
                    .into_response()
            }

            ApiError::Inference(err) => {
                let error_id = Uuid::new_v4();
                tracing::error!("Inference failed [{}]: {}", error_id, err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal_error", "error_id": error_id })),
                )
                    .into_response()
            }
        }
    }
}
