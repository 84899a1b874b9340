// ============================================================
// Layer 5 — Model Specifications
// ============================================================
// The closed set of estimators the trainer knows about, all of
// them backed by smartcore:
//
//   ModelSpec  — what to fit: estimator kind + hyperparameters.
//                Deserializable, and every variant lists the
//                params the tracker records for its run.
//   Regressor  — a fitted smartcore estimator plus the feature
//                width it was fitted on, stored inside the artifact
//                as a tagged JSON object.
//
//   LinearRegression → linear::linear_regression (SVD solver)
//   DecisionTree     → tree::decision_tree_regressor
//   RandomForest     → ensemble::random_forest_regressor
//
// Adding an estimator means adding a variant to both enums; the
// compiler then points at every match that needs a new arm.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

use crate::domain::error::{FitError, InferenceError};

pub const DEFAULT_N_ESTIMATORS: usize = 100;

type Matrix = DenseMatrix<f64>;
type LinearFit = LinearRegression<f64, f64, Matrix, Vec<f64>>;
type TreeFit = DecisionTreeRegressor<f64, f64, Matrix, Vec<f64>>;
type ForestFit = RandomForestRegressor<f64, f64, Matrix, Vec<f64>>;

// ─── Tree hyperparameters ─────────────────────────────────────────────────────

/// Settings shared by the single tree and every tree of the forest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Unbounded when None.
    pub max_depth:         Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf:  usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self { max_depth: None, min_samples_split: 2, min_samples_leaf: 1 }
    }
}

impl TreeParams {
    pub fn validate(&self) -> Result<(), FitError> {
        if let Some(depth) = self.max_depth {
            if depth == 0 || depth > u16::MAX as usize {
                return Err(FitError::InvalidParameter {
                    name:   "max_depth",
                    reason: format!("must be between 1 and {}", u16::MAX),
                });
            }
        }
        if self.min_samples_split < 2 {
            return Err(FitError::InvalidParameter {
                name:   "min_samples_split",
                reason: "must be at least 2".to_string(),
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(FitError::InvalidParameter {
                name:   "min_samples_leaf",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    // validate() has already bounded max_depth
    fn depth(&self) -> Option<u16> {
        self.max_depth.and_then(|d| u16::try_from(d).ok())
    }

    fn tree_parameters(&self) -> DecisionTreeRegressorParameters {
        let params = DecisionTreeRegressorParameters::default()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf);
        match self.depth() {
            Some(depth) => params.with_max_depth(depth),
            None        => params,
        }
    }

    fn forest_parameters(&self, n_trees: usize, seed: u64, m: usize) -> RandomForestRegressorParameters {
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(n_trees as _)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_m(m)
            .with_seed(seed);
        match self.depth() {
            Some(depth) => params.with_max_depth(depth),
            None        => params,
        }
    }
}

// ─── ModelSpec ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelSpec {
    LinearRegression,
    DecisionTree {
        #[serde(default)]
        params: TreeParams,
    },
    RandomForest {
        n_estimators: usize,
        seed:         u64,
        #[serde(default)]
        params:       TreeParams,
    },
}

impl ModelSpec {
    /// Parse a short CLI name (`linear`, `tree`, `forest`) into a spec
    /// using the shared tree settings.
    pub fn from_short_name(
        name:         &str,
        tree:         TreeParams,
        n_estimators: usize,
        seed:         u64,
    ) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" | "linear_regression" => Some(ModelSpec::LinearRegression),
            "tree" | "decision_tree"       => Some(ModelSpec::DecisionTree { params: tree }),
            "forest" | "random_forest"     => Some(ModelSpec::RandomForest {
                n_estimators,
                seed,
                params: tree,
            }),
            _ => None,
        }
    }

    /// Estimator name, used as the run name and stored on the model version.
    pub fn name(&self) -> &'static str {
        match self {
            ModelSpec::LinearRegression    => "LinearRegression",
            ModelSpec::DecisionTree { .. } => "DecisionTree",
            ModelSpec::RandomForest { .. } => "RandomForest",
        }
    }

    /// Hyperparameters as the tracker logs them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![("model", self.name().to_string())];
        let tree_params = |out: &mut Vec<(&'static str, String)>, p: &TreeParams| {
            let depth = p.max_depth.map_or_else(|| "None".to_string(), |d| d.to_string());
            out.push(("max_depth", depth));
            out.push(("min_samples_split", p.min_samples_split.to_string()));
            out.push(("min_samples_leaf", p.min_samples_leaf.to_string()));
        };
        match self {
            ModelSpec::LinearRegression => {}
            ModelSpec::DecisionTree { params } => tree_params(&mut out, params),
            ModelSpec::RandomForest { n_estimators, seed, params } => {
                out.push(("n_estimators", n_estimators.to_string()));
                out.push(("random_state", seed.to_string()));
                tree_params(&mut out, params);
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), FitError> {
        match self {
            ModelSpec::LinearRegression => Ok(()),
            ModelSpec::DecisionTree { params } => params.validate(),
            ModelSpec::RandomForest { n_estimators, params, .. } => {
                if *n_estimators == 0 || *n_estimators > u16::MAX as usize {
                    return Err(FitError::InvalidParameter {
                        name:   "n_estimators",
                        reason: format!("must be between 1 and {}", u16::MAX),
                    });
                }
                params.validate()
            }
        }
    }

    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Regressor, FitError> {
        self.validate()?;
        let n_features = check_training_set(x, y)?;
        let matrix     = DenseMatrix::from_2d_vec(&x.to_vec());
        let targets    = y.to_vec();
        let failed     = |e: Failed| FitError::Estimator(e.to_string());

        let estimator = match self {
            ModelSpec::LinearRegression => {
                let params = LinearRegressionParameters::default()
                    .with_solver(LinearRegressionSolverName::SVD);
                Estimator::Linear(LinearRegression::fit(&matrix, &targets, params).map_err(failed)?)
            }
            ModelSpec::DecisionTree { params } => Estimator::Tree(
                DecisionTreeRegressor::fit(&matrix, &targets, params.tree_parameters()).map_err(failed)?,
            ),
            // every feature is a split candidate, as in sklearn's regressor default
            ModelSpec::RandomForest { n_estimators, seed, params } => Estimator::Forest(
                RandomForestRegressor::fit(
                    &matrix,
                    &targets,
                    params.forest_parameters(*n_estimators, *seed, n_features),
                )
                .map_err(failed)?,
            ),
        };

        Ok(Regressor { n_features, estimator })
    }
}

// ─── Regressor ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fitted", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearFit),
    Tree(TreeFit),
    Forest(ForestFit),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Regressor {
    /// Width of the feature vector this regressor was fitted on.
    pub n_features: usize,
    pub estimator:  Estimator,
}

impl Regressor {
    /// Predict one value per row. Every row must be `n_features` wide.
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InferenceError> {
        if let Some(row) = rows.iter().find(|r| r.len() != self.n_features) {
            return Err(InferenceError::FeatureWidth { expected: self.n_features, actual: row.len() });
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = DenseMatrix::from_2d_vec(&rows.to_vec());
        let output = match &self.estimator {
            Estimator::Linear(m) => m.predict(&matrix),
            Estimator::Tree(m)   => m.predict(&matrix),
            Estimator::Forest(m) => m.predict(&matrix),
        };
        output.map_err(|e| InferenceError::Estimator(e.to_string()))
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, InferenceError> {
        self.predict_rows(&[features.to_vec()])?
            .first()
            .copied()
            .ok_or_else(|| InferenceError::Estimator("estimator returned no value".to_string()))
    }

    /// A loaded regressor must accept a row of its own width and
    /// answer with a finite value.
    pub fn verify(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("regressor was fitted on zero features".to_string());
        }
        match self.predict(&vec![0.0; self.n_features]) {
            Ok(value) if value.is_finite() => Ok(()),
            Ok(value) => Err(format!("regressor produced a non-finite value ({value})")),
            Err(e)    => Err(e.to_string()),
        }
    }
}

/// Shared input check for every estimator. Returns the feature width.
pub(crate) fn check_training_set(x: &[Vec<f64>], y: &[f64]) -> Result<usize, FitError> {
    if x.is_empty() {
        return Err(FitError::EmptyTrainingSet);
    }
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch { rows: x.len(), targets: y.len() });
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteTarget);
    }
    let width = x[0].len();
    if let Some(bad) = x.iter().find(|row| row.len() != width) {
        return Err(FitError::InvalidParameter {
            name:   "features",
            reason: format!("ragged rows: expected width {width}, found {}", bad.len()),
        });
    }
    Ok(width)
}
