// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Four subcommands plus the registry options every one of them
// shares:
//
//   train    — fit the candidate models, register the best one
//   serve    — load the staged model and serve it over HTTP
//   predict  — score one JSON record from a file
//   promote  — move a registered version to another stage
//
// Registry options can also come from the environment
// (TRACKING_URI, MODEL_NAME, MODEL_STAGE) or a .env file.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::train_use_case::{TrainConfig, DEFAULT_EXPERIMENT, DEFAULT_MODEL_NAME};
use crate::domain::model_version::{ModelSelector, Stage};
use crate::ml::model::{ModelSpec, TreeParams, DEFAULT_N_ESTIMATORS};
use crate::server::ServerConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the candidate models and register the best one
    Train(TrainArgs),

    /// Serve the selected model version over HTTP
    Serve(ServeArgs),

    /// Predict the final grade for one record stored as JSON
    Predict(PredictArgs),

    /// Move a registered model version to a stage
    Promote(PromoteArgs),
}

/// Where the registry lives and which model it serves.
#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// Registry root: a local path or a file:// URI
    #[arg(long, global = true, env = "TRACKING_URI", default_value = "./mlruns")]
    pub tracking_uri: String,

    /// Registered model name
    #[arg(long, global = true, env = "MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    /// Version to load: `latest`, a stage name, or a version number
    #[arg(long, global = true, env = "MODEL_STAGE", default_value = "Staging")]
    pub model_stage: ModelSelector,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// `;`-separated student-performance CSV
    #[arg(long, default_value = "data/student-mat.csv")]
    pub data: PathBuf,

    /// Comma-separated models to train: linear, tree, forest
    #[arg(long, value_delimiter = ',', default_value = "linear,tree,forest")]
    pub models: Vec<String>,

    /// Experiment the runs are recorded under
    #[arg(long, default_value = DEFAULT_EXPERIMENT)]
    pub experiment: String,

    /// Share of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Seed for the split and the forest's bootstrap samples
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Trees in the random forest
    #[arg(long, default_value_t = DEFAULT_N_ESTIMATORS)]
    pub n_estimators: usize,

    /// Maximum tree depth (unbounded when omitted)
    #[arg(long)]
    pub max_depth: Option<usize>,

    #[arg(long, default_value_t = 2)]
    pub min_samples_split: usize,

    #[arg(long, default_value_t = 1)]
    pub min_samples_leaf: usize,

    /// Stage the winning version is moved to
    #[arg(long, default_value = "Staging")]
    pub stage: Stage,
}

impl TrainArgs {
    /// Combine with the shared registry options into a TrainConfig.
    pub fn into_config(self, registry: &RegistryArgs) -> Result<TrainConfig> {
        let tree = TreeParams {
            max_depth:         self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf:  self.min_samples_leaf,
        };
        let models = self
            .models
            .iter()
            .map(|name| {
                ModelSpec::from_short_name(name, tree, self.n_estimators, self.seed)
                    .ok_or_else(|| anyhow!("Unknown model '{name}' (expected linear, tree or forest)"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TrainConfig {
            data_path:     self.data,
            tracking_uri:  registry.tracking_uri.clone(),
            experiment:    self.experiment,
            model_name:    registry.model_name.clone(),
            stage:         self.stage,
            test_fraction: self.test_fraction,
            seed:          self.seed,
            models,
        })
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Per-request inference budget in milliseconds
    #[arg(long, env = "INFERENCE_TIMEOUT_MS", default_value_t = 2000)]
    pub inference_timeout_ms: u64,
}

impl From<ServeArgs> for ServerConfig {
    fn from(a: ServeArgs) -> Self {
        ServerConfig {
            host:              a.host,
            port:              a.port,
            inference_timeout: Duration::from_millis(a.inference_timeout_ms),
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON file holding one record object
    #[arg(long)]
    pub record: PathBuf,
}

#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// Version number to move
    #[arg(long)]
    pub version: u32,

    /// Target stage: None, Staging, Production or Archived
    #[arg(long)]
    pub stage: Stage,
}
