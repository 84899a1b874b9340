// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// Everything numeric lives here. Nothing in this layer touches
// the filesystem, the network or the clock; it takes records and
// targets in and hands fitted values back.
//
//   preprocessor.rs — StandardScaler + drop-first OneHotEncoder
//   model.rs        — ModelSpec (what to fit) / Regressor (fitted
//                     smartcore estimator)
//   pipeline.rs     — preprocessor + regressor as one artifact
//   metrics.rs      — MAE, RMSE, R²
//   trainer.rs      — fit/score loop that reports to a tracker

/// Column scaling and categorical encoding
pub mod preprocessor;

/// Estimator specifications and fitted regressors
pub mod model;

/// Fitted preprocessor + regressor
pub mod pipeline;

pub mod metrics;

/// Runs every requested model against one train/test split
pub mod trainer;
