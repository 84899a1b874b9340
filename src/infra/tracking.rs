// ============================================================
// Layer 6 — Local Experiment Tracker
// ============================================================
// File-backed ExperimentTracker. Each run gets its own directory:
//
//   experiments/<experiment>/runs/<run_id>/run.json
//   experiments/<experiment>/runs/<run_id>/model.json
//
// run.json is rewritten after every log call, so an interrupted
// run is still inspectable (status stays "RUNNING").
//
// When a run ends, one row is appended to the experiment's
// metrics.csv so runs can be compared in a spreadsheet:
//
//   run_id,run_name,MAE,RMSE,R2,finished_at
//   4f1c…,LinearRegression,1.183402,1.934712,0.817466,2026-…
//   9ab0…,RandomForest,1.021544,1.701839,0.858744,2026-…

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use uuid::Uuid;

use crate::domain::model_version::RunRef;
use crate::domain::traits::ExperimentTracker;
use crate::infra::store::{check_component, resolve_tracking_uri, write_json};
use crate::ml::pipeline::Pipeline;

/// Metric columns of metrics.csv, in order.
const METRIC_COLUMNS: [&str; 3] = ["MAE", "RMSE", "R2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
}

/// Contents of run.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id:     String,
    pub run_name:   String,
    pub experiment: String,
    pub status:     RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time:   Option<DateTime<Utc>>,
    pub params:     BTreeMap<String, String>,
    pub metrics:    BTreeMap<String, f64>,
    pub artifacts:  Vec<String>,
}

pub struct LocalTracker {
    experiment_dir: PathBuf,
    experiment:     String,
    active:         HashMap<String, RunRecord>,
}

impl LocalTracker {
    /// Tracker for `experiment` under the directory named by `tracking_uri`.
    pub fn open(tracking_uri: &str, experiment: &str) -> Result<Self> {
        let root = resolve_tracking_uri(tracking_uri)?;
        check_component("experiment", experiment)?;
        Ok(Self {
            experiment_dir: root.join("experiments").join(experiment),
            experiment:     experiment.to_string(),
            active:         HashMap::new(),
        })
    }

    pub fn experiment_dir(&self) -> &Path {
        &self.experiment_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.experiment_dir.join("runs").join(run_id)
    }

    fn record_mut(&mut self, run: &RunRef) -> Result<&mut RunRecord> {
        self.active
            .get_mut(&run.run_id)
            .with_context(|| format!("Run '{}' is not active", run.run_id))
    }

    fn persist(&self, record: &RunRecord) -> Result<()> {
        write_json(&self.run_dir(&record.run_id).join("run.json"), record)
    }

    /// Append one row for a finished run, writing the header first
    /// if metrics.csv does not exist yet.
    fn append_metrics_row(&self, record: &RunRecord) -> Result<()> {
        fs::create_dir_all(&self.experiment_dir)?;
        let path   = self.experiment_dir.join("metrics.csv");
        let is_new = !path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if is_new {
            let mut header = vec!["run_id", "run_name"];
            header.extend(METRIC_COLUMNS);
            header.push("finished_at");
            writer.write_record(&header)?;
        }

        let mut row = vec![record.run_id.clone(), record.run_name.clone()];
        row.extend(METRIC_COLUMNS.iter().map(|m| {
            record.metrics.get(*m).map(|v| format!("{v:.6}")).unwrap_or_default()
        }));
        row.push(record.end_time.map(|t| t.to_rfc3339()).unwrap_or_default());
        writer.write_record(&row)?;
        writer.flush()?;
        Ok(())
    }
}

impl ExperimentTracker for LocalTracker {
    fn start_run(&mut self, run_name: &str) -> Result<RunRef> {
        let run_id = Uuid::new_v4().simple().to_string();
        let record = RunRecord {
            run_id:     run_id.clone(),
            run_name:   run_name.to_string(),
            experiment: self.experiment.clone(),
            status:     RunStatus::Running,
            start_time: Utc::now(),
            end_time:   None,
            params:     BTreeMap::new(),
            metrics:    BTreeMap::new(),
            artifacts:  Vec::new(),
        };
        self.persist(&record)?;
        self.active.insert(run_id.clone(), record);

        tracing::debug!("Started run {} ({})", run_id, run_name);
        Ok(RunRef { experiment: self.experiment.clone(), run_id })
    }

    fn log_param(&mut self, run: &RunRef, key: &str, value: &str) -> Result<()> {
        let record = self.record_mut(run)?;
        record.params.insert(key.to_string(), value.to_string());
        let snapshot = record.clone();
        self.persist(&snapshot)
    }

    fn log_metric(&mut self, run: &RunRef, key: &str, value: f64) -> Result<()> {
        let record = self.record_mut(run)?;
        record.metrics.insert(key.to_string(), value);
        let snapshot = record.clone();
        self.persist(&snapshot)
    }

    fn log_model(&mut self, run: &RunRef, pipeline: &Pipeline) -> Result<()> {
        self.record_mut(run)?;
        write_json(&self.run_dir(&run.run_id).join("model.json"), pipeline)?;
        let record = self.record_mut(run)?;
        if !record.artifacts.iter().any(|a| a == "model.json") {
            record.artifacts.push("model.json".to_string());
        }
        let snapshot = record.clone();
        self.persist(&snapshot)
    }

    fn end_run(&mut self, run: &RunRef) -> Result<()> {
        let mut record = self
            .active
            .remove(&run.run_id)
            .with_context(|| format!("Run '{}' is not active", run.run_id))?;
        record.status   = RunStatus::Finished;
        record.end_time = Some(Utc::now());

        self.persist(&record)?;
        self.append_metrics_row(&record)?;
        tracing::debug!("Finished run {} ({})", record.run_id, record.run_name);
        Ok(())
    }
}
