// ============================================================
// Layer 5 — Fitted Pipeline
// ============================================================
// Preprocessor + regressor, fitted together and persisted together
// as one JSON document (`model.json`):
//
//   {
//     "format_version": 1,
//     "model": "RandomForest",
//     "preprocessor": { "scaler": {...}, "encoder": {...} },
//     "regressor": {
//       "n_features": 41,
//       "estimator": { "kind": "forest", "fitted": {...} }
//     }
//   }
//
// A pipeline is immutable once fitted. The serving side wraps it in
// a ModelArtifact next to its registry metadata and shares it
// read-only across request handlers.

use serde::{Deserialize, Serialize};

use crate::domain::error::{FitError, InferenceError, ValidationError};
use crate::domain::feature_record::FeatureRecord;
use crate::domain::model_version::ModelVersion;
use crate::domain::prediction::Prediction;
use crate::domain::traits::Predictor;
use crate::ml::model::{ModelSpec, Regressor};
use crate::ml::preprocessor::Preprocessor;

/// Bumped whenever the persisted layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Pipeline {
    pub format_version: u32,
    /// Estimator family, e.g. "LinearRegression".
    pub model:          String,
    pub preprocessor:   Preprocessor,
    pub regressor:      Regressor,
}

impl Pipeline {
    /// Fit the preprocessor on `records`, then the estimator on the encoded rows.
    pub fn fit(spec: &ModelSpec, records: &[FeatureRecord], targets: &[f64]) -> Result<Self, FitError> {
        if records.len() != targets.len() {
            return Err(FitError::LengthMismatch { rows: records.len(), targets: targets.len() });
        }
        let preprocessor = Preprocessor::fit(records)?;
        let x = records
            .iter()
            .map(|r| preprocessor.transform(r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FitError::Encoding(e.to_string()))?;
        let regressor = spec.fit(&x, targets)?;

        Ok(Self {
            format_version: FORMAT_VERSION,
            model:          spec.name().to_string(),
            preprocessor,
            regressor,
        })
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, InferenceError> {
        let features = self.preprocessor.transform(record)?;
        Prediction::new(self.regressor.predict(&features)?)
    }

    /// Raw predictions for a batch, used to score the test split.
    pub fn predict_batch(&self, records: &[FeatureRecord]) -> Result<Vec<f64>, InferenceError> {
        let rows = records
            .iter()
            .map(|r| self.preprocessor.transform(r))
            .collect::<Result<Vec<_>, _>>()?;
        let values = self.regressor.predict_rows(&rows)?;
        values.into_iter().map(|v| Prediction::new(v).map(Prediction::value)).collect()
    }

    /// Reject a record whose categories the fitted encoder never saw.
    pub fn check_vocabulary(&self, record: &FeatureRecord) -> Result<(), ValidationError> {
        let unseen = self.preprocessor.unseen_categories(record);
        if unseen.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(unseen))
        }
    }

    /// Consistency check for a pipeline read back from disk.
    pub fn verify(&self) -> Result<(), String> {
        if self.format_version != FORMAT_VERSION {
            return Err(format!(
                "format version {} is not supported (expected {FORMAT_VERSION})",
                self.format_version
            ));
        }
        self.preprocessor.verify_layout()?;

        let width = self.preprocessor.output_width();
        if width != self.regressor.n_features {
            return Err(format!(
                "preprocessor emits {width} features, regressor expects {}",
                self.regressor.n_features
            ));
        }
        self.regressor.verify()
    }
}

impl Predictor for Pipeline {
    fn check_vocabulary(&self, record: &FeatureRecord) -> Result<(), ValidationError> {
        Pipeline::check_vocabulary(self, record)
    }

    fn predict(&self, record: &FeatureRecord) -> Result<Prediction, InferenceError> {
        Pipeline::predict(self, record)
    }
}

/// A registered pipeline together with the version it was loaded as.
#[derive(Debug)]
pub struct ModelArtifact {
    pub version:  ModelVersion,
    pub pipeline: Pipeline,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::Job;
    use crate::ml::model::TreeParams;
    use crate::testing::{example_record, synthetic_dataset};

    fn linear() -> Pipeline {
        let (records, targets) = synthetic_dataset(300, 42);
        Pipeline::fit(&ModelSpec::LinearRegression, &records, &targets).unwrap()
    }

    #[test]
    fn test_linear_pipeline_predicts_example() {
        let pipeline   = linear();
        let prediction = pipeline.predict(&example_record()).unwrap();
        // true G3 for the example row is 6
        assert!((prediction.value() - 6.0).abs() < 2.0, "{}", prediction.value());
        assert!(pipeline.verify().is_ok());
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let pipeline = linear();
        let a = pipeline.predict(&example_record()).unwrap();
        let b = pipeline.predict(&example_record()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_survives_json() {
        let (records, targets) = synthetic_dataset(80, 5);
        let spec     = ModelSpec::DecisionTree { params: TreeParams { max_depth: Some(4), ..TreeParams::default() } };
        let pipeline = Pipeline::fit(&spec, &records, &targets).unwrap();

        let json = serde_json::to_vec(&pipeline).unwrap();
        let back: Pipeline = serde_json::from_slice(&json).unwrap();
        assert!(back.verify().is_ok());
        assert_eq!(
            back.predict(&example_record()).unwrap(),
            pipeline.predict(&example_record()).unwrap()
        );
    }

    #[test]
    fn test_every_model_predicts_finite_grades_for_valid_records() {
        let (records, targets) = synthetic_dataset(500, 17);
        let (unseen, _)        = synthetic_dataset(500, 18);
        let tree = TreeParams { max_depth: Some(8), ..TreeParams::default() };

        for spec in [
            ModelSpec::LinearRegression,
            ModelSpec::DecisionTree { params: tree },
            ModelSpec::RandomForest { n_estimators: 20, seed: 42, params: tree },
        ] {
            let pipeline = Pipeline::fit(&spec, &records, &targets).unwrap();
            let accepted: Vec<&FeatureRecord> = unseen
                .iter()
                .filter(|r| pipeline.check_vocabulary(r).is_ok())
                .collect();
            assert!(accepted.len() > 400, "{} accepted only {}", spec.name(), accepted.len());

            for record in accepted {
                let prediction = pipeline.predict(record).unwrap();
                assert!(prediction.value().is_finite(), "{}", spec.name());
            }
        }
    }

    #[test]
    fn test_batch_matches_single_predictions() {
        let pipeline = linear();
        let (records, _) = synthetic_dataset(20, 3);
        let batch = pipeline.predict_batch(&records).unwrap();
        for (record, value) in records.iter().zip(batch) {
            assert_eq!(pipeline.predict(record).unwrap().value(), value);
        }
    }

    #[test]
    fn test_vocabulary_check_reports_unseen_category() {
        let (mut records, targets) = synthetic_dataset(60, 9);
        for r in &mut records {
            r.mjob = Job::Other;
        }
        let pipeline = Pipeline::fit(&ModelSpec::LinearRegression, &records, &targets).unwrap();

        let mut record = example_record();
        record.mjob = Job::Health;
        let err = pipeline.check_vocabulary(&record).unwrap_err();
        assert!(err.is_unknown_category());
        assert_eq!(err.field_names(), vec!["Mjob"]);
        assert!(matches!(
            pipeline.predict(&record),
            Err(InferenceError::UnseenCategory { .. })
        ));
    }

    #[test]
    fn test_width_mismatch_fails_verification() {
        let mut pipeline = linear();
        pipeline.preprocessor.encoder.categories[0].push("ZZ".to_string());
        assert!(pipeline.verify().is_err());
    }

    #[test]
    fn test_unknown_format_version_is_rejected() {
        let mut pipeline = linear();
        pipeline.format_version = 99;
        assert!(pipeline.verify().unwrap_err().contains("format version"));
    }

    #[test]
    fn test_length_mismatch() {
        let (records, _) = synthetic_dataset(10, 1);
        assert!(matches!(
            Pipeline::fit(&ModelSpec::LinearRegression, &records, &[1.0]),
            Err(FitError::LengthMismatch { rows: 10, targets: 1 })
        ));
    }
}
