// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to its collaborators only through
// these traits:
//
//   DatasetSource     → CsvLoader reads student-mat.csv
//   ModelRegistry     → LocalRegistry stores versioned pipelines
//   ExperimentTracker → LocalTracker records params and metrics
//   Predictor         → Pipeline answers serving requests
//
// Tests swap in their own implementations (e.g. a tracker that
// always fails, a model that never answers in time) without
// touching the use cases.

use anyhow::Result;

use crate::data::dataset::Dataset;
use crate::domain::error::{InferenceError, ModelUnavailableError, ValidationError};
use crate::domain::feature_record::FeatureRecord;
use crate::domain::model_version::{ModelSelector, ModelVersion, RunRef, Stage};
use crate::domain::prediction::Prediction;
use crate::ml::pipeline::{ModelArtifact, Pipeline};

// ─── DatasetSource ────────────────────────────────────────────────────────────
/// Any component that can produce a labelled dataset.
pub trait DatasetSource {
    fn load(&self) -> Result<Dataset>;
}

// ─── ModelRegistry ────────────────────────────────────────────────────────────
/// Versioned store of fitted pipelines, addressed by name and selector.
pub trait ModelRegistry {
    /// Resolve `selector` and load that version's artifact.
    /// Called once at service startup.
    fn load(
        &self,
        name:     &str,
        selector: &ModelSelector,
    ) -> Result<ModelArtifact, ModelUnavailableError>;

    /// Store `pipeline` as the next version of `name`, in stage `None`.
    fn register_model(
        &self,
        name:     &str,
        pipeline: &Pipeline,
        run:      Option<&RunRef>,
    ) -> Result<ModelVersion>;

    /// Move a version to `stage`. Entering an exclusive stage archives
    /// whichever version held it before.
    fn transition_stage(&self, name: &str, version: u32, stage: Stage) -> Result<ModelVersion>;

    /// All versions of `name`, ascending. Empty if the model is unknown.
    fn versions(&self, name: &str) -> Result<Vec<ModelVersion>>;
}

// ─── ExperimentTracker ────────────────────────────────────────────────────────
/// Records what happened during training. Callers treat every method
/// as fire-and-forget: a failure is logged, never fatal.
pub trait ExperimentTracker {
    fn start_run(&mut self, run_name: &str) -> Result<RunRef>;

    fn log_param(&mut self, run: &RunRef, key: &str, value: &str) -> Result<()>;

    fn log_metric(&mut self, run: &RunRef, key: &str, value: f64) -> Result<()>;

    fn log_model(&mut self, run: &RunRef, pipeline: &Pipeline) -> Result<()>;

    fn end_run(&mut self, run: &RunRef) -> Result<()>;
}

// ─── Predictor ────────────────────────────────────────────────────────────────
/// A loaded model as the serving path sees it. One instance is shared
/// by every request handler.
pub trait Predictor: Send + Sync {
    /// Reject a record carrying categories the model was never fitted on.
    fn check_vocabulary(&self, record: &FeatureRecord) -> Result<(), ValidationError>;

    fn predict(&self, record: &FeatureRecord) -> Result<Prediction, InferenceError>;
}
