// ============================================================
// Layer 5 — Experiment Runner
// ============================================================
// Fits and scores every requested ModelSpec on the same split:
//
//   for each spec:
//     start run        → tracker
//     log params       → tracker
//     fit pipeline     on the training rows
//     predict          the held-out rows
//     MAE / RMSE / R²  → tracker
//     log model        → tracker
//     end run          → tracker
//
// The tracker is bookkeeping. Any tracker error is logged as a
// warning and the experiment carries on; only a fitting or scoring
// failure aborts it. Fitted pipelines come back as values so the
// caller decides what gets registered.

use anyhow::{ensure, Context, Result};

use crate::data::dataset::DatasetSplit;
use crate::domain::model_version::RunRef;
use crate::domain::traits::ExperimentTracker;
use crate::ml::metrics::RegressionMetrics;
use crate::ml::model::ModelSpec;
use crate::ml::pipeline::Pipeline;

/// Result of one fit/evaluate cycle.
#[derive(Debug)]
pub struct RunOutcome {
    /// None when the tracker could not open a run.
    pub run:      Option<RunRef>,
    pub spec:     ModelSpec,
    pub metrics:  RegressionMetrics,
    pub pipeline: Pipeline,
}

pub fn run_experiment(
    specs:   &[ModelSpec],
    split:   &DatasetSplit,
    tracker: &mut dyn ExperimentTracker,
) -> Result<Vec<RunOutcome>> {
    ensure!(!specs.is_empty(), "No models requested");
    ensure!(!split.train.is_empty(), "Training split is empty");
    ensure!(!split.test.is_empty(), "Test split is empty; raise the test fraction");

    tracing::info!(
        "Training {} model(s) on {} rows, evaluating on {}",
        specs.len(),
        split.train.len(),
        split.test.len(),
    );

    specs.iter().map(|spec| run_one(spec, split, tracker)).collect()
}

fn run_one(
    spec:    &ModelSpec,
    split:   &DatasetSplit,
    tracker: &mut dyn ExperimentTracker,
) -> Result<RunOutcome> {
    let name = spec.name();
    let run  = tolerate(tracker.start_run(name), "start a run");

    if let Some(run) = &run {
        for (key, value) in spec.params() {
            tolerate(tracker.log_param(run, key, &value), "log a parameter");
        }
    }

    let pipeline = Pipeline::fit(spec, split.train.records(), split.train.targets())
        .with_context(|| format!("Fitting {name} failed"))?;
    let predicted = pipeline
        .predict_batch(split.test.records())
        .with_context(|| format!("Scoring {name} on the test split failed"))?;
    let metrics = RegressionMetrics::evaluate(split.test.targets(), &predicted);

    tracing::info!(
        "{}: MAE={:.4} RMSE={:.4} R2={:.4}",
        name,
        metrics.mae,
        metrics.rmse,
        metrics.r2,
    );

    if let Some(run) = &run {
        for (key, value) in metrics.as_pairs() {
            tolerate(tracker.log_metric(run, key, value), "log a metric");
        }
        tolerate(tracker.log_model(run, &pipeline), "log the model");
        tolerate(tracker.end_run(run), "end the run");
    }

    Ok(RunOutcome { run, spec: spec.clone(), metrics, pipeline })
}

/// The outcome with the lowest test RMSE.
pub fn best_run(outcomes: &[RunOutcome]) -> Option<&RunOutcome> {
    outcomes
        .iter()
        .min_by(|a, b| a.metrics.rmse.total_cmp(&b.metrics.rmse))
}

fn tolerate<T>(result: Result<T>, action: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Tracker failed to {}: {:#}", action, e);
            None
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Dataset;
    use crate::ml::model::TreeParams;
    use crate::testing::synthetic_dataset;
    use anyhow::bail;

    fn split() -> DatasetSplit {
        let (records, targets) = synthetic_dataset(250, 8);
        Dataset::new(records, targets).unwrap().split(0.2, 42)
    }

    fn specs() -> Vec<ModelSpec> {
        let tree = TreeParams { max_depth: Some(6), ..TreeParams::default() };
        vec![
            ModelSpec::LinearRegression,
            ModelSpec::DecisionTree { params: tree },
            ModelSpec::RandomForest { n_estimators: 8, seed: 42, params: tree },
        ]
    }

    #[derive(Default)]
    struct RecordingTracker {
        runs:    Vec<String>,
        params:  Vec<(String, String)>,
        metrics: Vec<(String, f64)>,
        models:  usize,
        ended:   usize,
    }

    impl ExperimentTracker for RecordingTracker {
        fn start_run(&mut self, run_name: &str) -> Result<RunRef> {
            self.runs.push(run_name.to_string());
            Ok(RunRef { experiment: "test".into(), run_id: format!("run-{}", self.runs.len()) })
        }
        fn log_param(&mut self, _: &RunRef, key: &str, value: &str) -> Result<()> {
            self.params.push((key.to_string(), value.to_string()));
            Ok(())
        }
        fn log_metric(&mut self, _: &RunRef, key: &str, value: f64) -> Result<()> {
            self.metrics.push((key.to_string(), value));
            Ok(())
        }
        fn log_model(&mut self, _: &RunRef, _: &Pipeline) -> Result<()> {
            self.models += 1;
            Ok(())
        }
        fn end_run(&mut self, _: &RunRef) -> Result<()> {
            self.ended += 1;
            Ok(())
        }
    }

    /// Every call fails, the way an unreachable tracking backend would.
    struct FailingTracker;

    impl ExperimentTracker for FailingTracker {
        fn start_run(&mut self, _: &str) -> Result<RunRef> {
            bail!("tracking backend unreachable")
        }
        fn log_param(&mut self, _: &RunRef, _: &str, _: &str) -> Result<()> {
            bail!("tracking backend unreachable")
        }
        fn log_metric(&mut self, _: &RunRef, _: &str, _: f64) -> Result<()> {
            bail!("tracking backend unreachable")
        }
        fn log_model(&mut self, _: &RunRef, _: &Pipeline) -> Result<()> {
            bail!("tracking backend unreachable")
        }
        fn end_run(&mut self, _: &RunRef) -> Result<()> {
            bail!("tracking backend unreachable")
        }
    }

    #[test]
    fn test_every_spec_is_tracked() {
        let mut tracker = RecordingTracker::default();
        let outcomes = run_experiment(&specs(), &split(), &mut tracker).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(tracker.runs, vec!["LinearRegression", "DecisionTree", "RandomForest"]);
        assert_eq!(tracker.metrics.len(), 9);
        assert_eq!(tracker.models, 3);
        assert_eq!(tracker.ended, 3);
        assert_eq!(
            tracker.params.iter().filter(|(k, _)| k == "n_estimators").count(),
            1
        );
        assert!(outcomes.iter().all(|o| o.run.is_some()));
    }

    #[test]
    fn test_failing_tracker_does_not_abort_training() {
        let outcomes = run_experiment(&specs(), &split(), &mut FailingTracker).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.run.is_none()));
        assert!(outcomes.iter().all(|o| o.metrics.rmse.is_finite()));
    }

    #[test]
    fn test_linear_wins_on_linear_target() {
        let outcomes = run_experiment(&specs(), &split(), &mut RecordingTracker::default()).unwrap();
        let best = best_run(&outcomes).unwrap();
        assert_eq!(best.spec, ModelSpec::LinearRegression);
        assert!(best.metrics.rmse < 1e-4);
        assert!(best.metrics.r2 > 0.999);
    }

    #[test]
    fn test_empty_test_split_is_rejected() {
        let (records, targets) = synthetic_dataset(20, 1);
        let split = Dataset::new(records, targets).unwrap().split(0.0, 1);
        assert!(run_experiment(&specs(), &split, &mut FailingTracker).is_err());
    }

    #[test]
    fn test_best_run_of_nothing() {
        assert!(best_run(&[]).is_none());
    }
}
