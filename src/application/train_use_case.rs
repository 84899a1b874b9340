// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one experiment end to end:
//
//   Step 1: Load student-mat.csv        (Layer 4 - data)
//   Step 2: Seeded train/test split     (Layer 4 - data)
//   Step 3: Fit + score every model     (Layer 5 - ml)
//   Step 4: Pick the lowest test RMSE   (Layer 5 - ml)
//   Step 5: Register it as a version    (Layer 6 - infra)
//   Step 6: Move it to the target stage (Layer 6 - infra)
//
// Everything the run depends on is in TrainConfig; nothing is
// read from globals or the environment below the CLI.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::loader::CsvLoader;
use crate::domain::model_version::{ModelVersion, Stage};
use crate::domain::traits::{DatasetSource, ExperimentTracker, ModelRegistry};
use crate::infra::{registry::LocalRegistry, tracking::LocalTracker};
use crate::ml::metrics::RegressionMetrics;
use crate::ml::model::{ModelSpec, TreeParams, DEFAULT_N_ESTIMATORS};
use crate::ml::trainer::{best_run, run_experiment};

pub const DEFAULT_EXPERIMENT: &str = "student-performance-regression";
pub const DEFAULT_MODEL_NAME: &str = "StudentPerformanceModel";

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:     PathBuf,
    pub tracking_uri:  String,
    pub experiment:    String,
    pub model_name:    String,
    /// Stage the winning version is moved to after registration.
    pub stage:         Stage,
    pub test_fraction: f64,
    pub seed:          u64,
    pub models:        Vec<ModelSpec>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:     PathBuf::from("data/student-mat.csv"),
            tracking_uri:  "./mlruns".to_string(),
            experiment:    DEFAULT_EXPERIMENT.to_string(),
            model_name:    DEFAULT_MODEL_NAME.to_string(),
            stage:         Stage::Staging,
            test_fraction: 0.2,
            seed:          42,
            models:        default_models(42),
        }
    }
}

/// Linear regression, an unbounded tree and a 100-tree forest.
pub fn default_models(seed: u64) -> Vec<ModelSpec> {
    let tree = TreeParams::default();
    vec![
        ModelSpec::LinearRegression,
        ModelSpec::DecisionTree { params: tree },
        ModelSpec::RandomForest { n_estimators: DEFAULT_N_ESTIMATORS, seed, params: tree },
    ]
}

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub model:   &'static str,
    pub run_id:  Option<String>,
    pub metrics: RegressionMetrics,
}

/// What a training invocation produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub runs:       Vec<RunSummary>,
    pub registered: ModelVersion,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run against the CSV file, tracker and registry named in the config.
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        let source       = CsvLoader::new(&cfg.data_path);
        let mut tracker  = LocalTracker::open(&cfg.tracking_uri, &cfg.experiment)?;
        let registry     = LocalRegistry::open(&cfg.tracking_uri)?;
        self.execute_with(&source, &mut tracker, &registry)
    }

    /// Run against explicit collaborators.
    pub fn execute_with(
        &self,
        source:   &dyn DatasetSource,
        tracker:  &mut dyn ExperimentTracker,
        registry: &dyn ModelRegistry,
    ) -> Result<TrainReport> {
        let cfg = &self.config;
        ensure!(
            cfg.test_fraction > 0.0 && cfg.test_fraction < 1.0,
            "Test fraction must be strictly between 0 and 1, got {}",
            cfg.test_fraction
        );

        // ── Step 1–2: Load and split ──────────────────────────────────────────
        let dataset = source.load()?;
        let split   = dataset.split(cfg.test_fraction, cfg.seed);

        // ── Step 3: Fit and score ─────────────────────────────────────────────
        let outcomes = run_experiment(&cfg.models, &split, tracker)?;

        // ── Step 4: Winner by RMSE ────────────────────────────────────────────
        let Some(best) = best_run(&outcomes) else {
            anyhow::bail!("No model was trained");
        };
        tracing::info!(
            "Best model: {} (RMSE {:.4})",
            best.spec.name(),
            best.metrics.rmse,
        );

        // ── Step 5–6: Register and stage ──────────────────────────────────────
        let version = registry.register_model(&cfg.model_name, &best.pipeline, best.run.as_ref())?;
        let registered = if cfg.stage == version.stage {
            version
        } else {
            registry.transition_stage(&cfg.model_name, version.version, cfg.stage)?
        };

        let runs = outcomes
            .iter()
            .map(|o| RunSummary {
                model:   o.spec.name(),
                run_id:  o.run.as_ref().map(|r| r.run_id.clone()),
                metrics: o.metrics,
            })
            .collect();

        Ok(TrainReport { runs, registered })
    }
}
