// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands off to Layer 2; nothing here computes.
//
//   train    → TrainUseCase
//   serve    → PredictionService + HTTP server
//   predict  → PredictionService, one record
//   promote  → ModelRegistry::transition_stage

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, PredictArgs, PromoteArgs, RegistryArgs, ServeArgs, TrainArgs};

use crate::application::prediction_service::PredictionService;
use crate::domain::traits::ModelRegistry;
use crate::infra::registry::LocalRegistry;

#[derive(Parser, Debug)]
#[command(
    name = "student-grade-predictor",
    version,
    about = "Train regression models for student final grades and serve the registered one."
)]
pub struct Cli {
    #[command(flatten)]
    pub registry: RegistryArgs,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let Cli { registry, command } = self;
        match command {
            Commands::Train(args)   => run_train(&registry, args),
            Commands::Serve(args)   => run_serve(&registry, args),
            Commands::Predict(args) => run_predict(&registry, args),
            Commands::Promote(args) => run_promote(&registry, args),
        }
    }
}

fn run_train(registry: &RegistryArgs, args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = args.into_config(registry)?;
    tracing::info!("Starting training on '{}'", config.data_path.display());

    let report = TrainUseCase::new(config).execute()?;

    println!("{:<18} {:>8} {:>8} {:>8}  run", "model", "MAE", "RMSE", "R2");
    for run in &report.runs {
        println!(
            "{:<18} {:>8.4} {:>8.4} {:>8.4}  {}",
            run.model,
            run.metrics.mae,
            run.metrics.rmse,
            run.metrics.r2,
            run.run_id.as_deref().unwrap_or("-"),
        );
    }
    println!(
        "\nRegistered {} version {} ({}) in stage {}",
        report.registered.name,
        report.registered.version,
        report.registered.model_kind,
        report.registered.stage,
    );
    Ok(())
}

/// Load the model before starting the runtime's listener; a
/// missing or broken artifact ends the process here.
fn load_service(registry: &RegistryArgs) -> Result<PredictionService> {
    let store = LocalRegistry::open(&registry.tracking_uri)?;
    PredictionService::load(&store, &registry.model_name, &registry.model_stage).with_context(|| {
        format!(
            "Model '{}' ({}) is unavailable",
            registry.model_name, registry.model_stage
        )
    })
}

fn run_serve(registry: &RegistryArgs, args: ServeArgs) -> Result<()> {
    let service = load_service(registry)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot start the async runtime")?;
    runtime.block_on(crate::server::serve(args.into(), service))
}

fn run_predict(registry: &RegistryArgs, args: PredictArgs) -> Result<()> {
    let service = load_service(registry)?;
    let body = std::fs::read(&args.record)
        .with_context(|| format!("Cannot read record '{}'", args.record.display()))?;

    let prediction = service.predict_body(&body)?;
    println!(
        "{}",
        serde_json::json!({ "predicted_final_grade": prediction.rounded() })
    );
    Ok(())
}

fn run_promote(registry: &RegistryArgs, args: PromoteArgs) -> Result<()> {
    let store   = LocalRegistry::open(&registry.tracking_uri)?;
    let version = store.transition_stage(&registry.model_name, args.version, args.stage)?;
    println!(
        "{} version {} is now in stage {}",
        version.name, version.version, version.stage
    );
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model_version::{ModelSelector, Stage};
    use crate::ml::model::ModelSpec;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["student-grade-predictor", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let config = args.into_config(&cli.registry).unwrap();

        assert_eq!(config.models.len(), 3);
        assert_eq!(config.seed, 42);
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.stage, Stage::Staging);
        assert_eq!(config.model_name, "StudentPerformanceModel");
    }

    #[test]
    fn test_model_list_and_global_options() {
        let cli = Cli::try_parse_from([
            "student-grade-predictor",
            "train",
            "--models", "linear,forest",
            "--n-estimators", "10",
            "--tracking-uri", "file:///tmp/mlruns",
            "--model-stage", "production",
        ])
        .unwrap();
        assert_eq!(cli.registry.model_stage, ModelSelector::Stage(Stage::Production));

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let config = args.into_config(&cli.registry).unwrap();
        assert_eq!(config.tracking_uri, "file:///tmp/mlruns");
        assert_eq!(config.models[0], ModelSpec::LinearRegression);
        assert!(matches!(config.models[1], ModelSpec::RandomForest { n_estimators: 10, .. }));
    }

    #[test]
    fn test_unknown_model_name_is_rejected() {
        let cli = Cli::try_parse_from(["student-grade-predictor", "train", "--models", "svm"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert!(args.into_config(&cli.registry).is_err());
    }

    #[test]
    fn test_promote_parses_stage() {
        let cli = Cli::try_parse_from([
            "student-grade-predictor", "promote", "--version", "3", "--stage", "Production",
        ])
        .unwrap();
        let Commands::Promote(args) = cli.command else { panic!("expected promote") };
        assert_eq!((args.version, args.stage), (3, Stage::Production));
    }

    #[test]
    fn test_train_then_predict_and_promote_end_to_end() {
        use crate::testing::{example_json, synthetic_dataset, write_csv};

        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("student-mat.csv");
        let (records, targets) = synthetic_dataset(150, 5);
        write_csv(&data, &records, &targets);
        let record = dir.path().join("record.json");
        std::fs::write(&record, example_json().to_string()).unwrap();
        let uri = dir.path().join("mlruns").to_string_lossy().into_owned();

        let run = |args: &[&str]| {
            let mut argv = vec!["student-grade-predictor", "--tracking-uri", uri.as_str()];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap().run()
        };

        run(&["train", "--data", data.to_str().unwrap(), "--models", "linear", "--stage", "None"]).unwrap();
        // nothing is staged yet
        assert!(run(&["predict", "--record", record.to_str().unwrap()]).is_err());

        run(&["promote", "--version", "1", "--stage", "Staging"]).unwrap();
        run(&["predict", "--record", record.to_str().unwrap()]).unwrap();
    }
}
