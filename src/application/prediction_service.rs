// ============================================================
// Layer 2 — Prediction Service
// ============================================================
// The serving core, shared by the HTTP endpoint and the
// `predict` CLI command.
//
//   raw JSON body
//       │  parse_body        → must be a JSON object
//       ▼
//   Map<String, Value>
//       │  validate          → schema check (all fields, no extras,
//       │                      types, ranges, static vocabularies)
//       │                    → artifact check (categories the fitted
//       │                      encoder actually saw)
//       ▼
//   FeatureRecord
//       │  predict           → encode + regress, finite output only
//       ▼
//   Prediction
//
// The service owns one immutable model, loaded once, behind the
// Predictor trait. It holds no other state, so a shared reference
// can serve any number of concurrent requests.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::error::{InferenceError, ModelUnavailableError, ValidationError};
use crate::domain::feature_record::FeatureRecord;
use crate::domain::model_version::{ModelSelector, ModelVersion};
use crate::domain::prediction::Prediction;
use crate::domain::traits::{ModelRegistry, Predictor};
use crate::ml::pipeline::ModelArtifact;

/// Everything that can go wrong between a raw body and a prediction.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("request body is not a JSON object: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

pub struct PredictionService {
    version:   ModelVersion,
    predictor: Box<dyn Predictor>,
}

impl PredictionService {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self::with_predictor(artifact.version, artifact.pipeline)
    }

    pub fn with_predictor(version: ModelVersion, predictor: impl Predictor + 'static) -> Self {
        Self { version, predictor: Box::new(predictor) }
    }

    /// Resolve and load the artifact. Any failure here means the
    /// service must not start.
    pub fn load(
        registry: &dyn ModelRegistry,
        name:     &str,
        selector: &ModelSelector,
    ) -> Result<Self, ModelUnavailableError> {
        let artifact = registry.load(name, selector)?;
        Ok(Self::new(artifact))
    }

    /// Registry metadata of the model being served.
    pub fn version(&self) -> &ModelVersion {
        &self.version
    }

    /// Parse a request body; anything but a JSON object is malformed.
    pub fn parse_body(body: &[u8]) -> Result<Map<String, Value>, PredictError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => Ok(object),
            Ok(other) => Err(PredictError::Malformed(format!(
                "expected an object, found {}",
                json_kind(&other)
            ))),
            Err(e) => Err(PredictError::Malformed(e.to_string())),
        }
    }

    /// Schema validation followed by the artifact vocabulary check.
    pub fn validate(&self, object: &Map<String, Value>) -> Result<FeatureRecord, ValidationError> {
        let record = FeatureRecord::from_json(object)?;
        self.predictor.check_vocabulary(&record)?;
        Ok(record)
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, InferenceError> {
        self.predictor.predict(record)
    }

    /// Parse, validate and predict in one call.
    pub fn predict_body(&self, body: &[u8]) -> Result<Prediction, PredictError> {
        let object = Self::parse_body(body)?;
        let record = self.validate(&object)?;
        Ok(self.predict(&record)?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}
