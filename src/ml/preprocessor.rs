// ============================================================
// Layer 5 — Column Preprocessor
// ============================================================
// The transform half of the pipeline. Two fitted steps, applied
// side by side and concatenated in this order:
//
//   numeric columns     → StandardScaler  (x - mean) / std
//   categorical columns → OneHotEncoder   one indicator per category,
//                                          first (sorted) category dropped
//
// Both steps are positional: they remember the column names they
// were fitted with, and a loaded artifact whose names differ from
// the current FeatureRecord layout is refused.
//
// Conventions follow scikit-learn so an artifact behaves like the
// pipeline it replaces:
//   - std is the population standard deviation (ddof = 0)
//   - a zero-variance column gets scale 1.0
//   - categories are sorted lexicographically
//   - an unseen category is an error, not an all-zero row

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::error::{FieldError, FieldErrorKind, FitError, InferenceError};
use crate::domain::feature_record::{FeatureRecord, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};

// ─── StandardScaler ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub columns: Vec<String>,
    pub means:   Vec<f64>,
    pub scales:  Vec<f64>,
}

impl StandardScaler {
    pub fn fit<R: AsRef<[f64]>>(columns: &[&str], rows: &[R]) -> Result<Self, FitError> {
        if rows.is_empty() {
            return Err(FitError::EmptyTrainingSet);
        }
        let width = columns.len();
        let n     = rows.len() as f64;

        let mut means = vec![0.0; width];
        for row in rows {
            for (mean, v) in means.iter_mut().zip(row.as_ref()) {
                *mean += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut variances = vec![0.0; width];
        for row in rows {
            for ((var, v), mean) in variances.iter_mut().zip(row.as_ref()).zip(&means) {
                *var += (v - mean).powi(2);
            }
        }
        let scales = variances
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Ok(Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            means,
            scales,
        })
    }

    fn transform_into(&self, values: &[f64], out: &mut Vec<f64>) {
        for ((v, mean), scale) in values.iter().zip(&self.means).zip(&self.scales) {
            out.push((v - mean) / scale);
        }
    }
}

// ─── OneHotEncoder ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns:    Vec<String>,
    /// Sorted vocabulary per column; index 0 is the dropped category.
    pub categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit<'v, R: AsRef<[&'v str]>>(columns: &[&str], rows: &[R]) -> Result<Self, FitError> {
        if rows.is_empty() {
            return Err(FitError::EmptyTrainingSet);
        }
        let mut seen: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); columns.len()];
        for row in rows {
            for (set, value) in seen.iter_mut().zip(row.as_ref()) {
                set.insert(*value);
            }
        }
        Ok(Self {
            columns:    columns.iter().map(|c| c.to_string()).collect(),
            categories: seen
                .into_iter()
                .map(|set| set.into_iter().map(str::to_string).collect())
                .collect(),
        })
    }

    /// Number of indicator columns produced (one per category, minus the dropped one).
    pub fn output_width(&self) -> usize {
        self.categories.iter().map(|c| c.len().saturating_sub(1)).sum()
    }

    fn transform_into(&self, values: &[&str], out: &mut Vec<f64>) -> Result<(), InferenceError> {
        for ((column, categories), value) in self.columns.iter().zip(&self.categories).zip(values) {
            let position = categories
                .iter()
                .position(|c| c == value)
                .ok_or_else(|| InferenceError::UnseenCategory {
                    column: column.clone(),
                    value:  value.to_string(),
                })?;
            out.extend((1..categories.len()).map(|k| if k == position { 1.0 } else { 0.0 }));
        }
        Ok(())
    }
}

// ─── Preprocessor ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub scaler:  StandardScaler,
    pub encoder: OneHotEncoder,
}

impl Preprocessor {
    pub fn fit(records: &[FeatureRecord]) -> Result<Self, FitError> {
        let numeric: Vec<[f64; 23]> = records.iter().map(FeatureRecord::numeric_values).collect();
        let categorical: Vec<[&str; 9]> =
            records.iter().map(FeatureRecord::categorical_values).collect();

        Ok(Self {
            scaler:  StandardScaler::fit(&NUMERIC_COLUMNS, &numeric)?,
            encoder: OneHotEncoder::fit(&CATEGORICAL_COLUMNS, &categorical)?,
        })
    }

    /// Width of the feature vector `transform` produces.
    pub fn output_width(&self) -> usize {
        self.scaler.columns.len() + self.encoder.output_width()
    }

    /// Encode one record into the positional feature vector.
    pub fn transform(&self, record: &FeatureRecord) -> Result<Vec<f64>, InferenceError> {
        let mut out = Vec::with_capacity(self.output_width());
        self.scaler.transform_into(&record.numeric_values(), &mut out);
        self.encoder.transform_into(&record.categorical_values(), &mut out)?;
        Ok(out)
    }

    /// Categorical values of `record` the encoder never saw while fitting.
    pub fn unseen_categories(&self, record: &FeatureRecord) -> Vec<FieldError> {
        let values = record.categorical_values();
        self.encoder
            .columns
            .iter()
            .zip(&self.encoder.categories)
            .zip(values)
            .filter(|((_, categories), value)| !categories.iter().any(|c| c == value))
            .map(|((column, categories), value)| {
                FieldError::new(column.clone(), FieldErrorKind::UnknownCategory {
                    value:   value.to_string(),
                    allowed: categories.clone(),
                })
            })
            .collect()
    }

    /// Check a deserialized preprocessor against the current record layout.
    pub fn verify_layout(&self) -> Result<(), String> {
        if self.scaler.columns != NUMERIC_COLUMNS {
            return Err(format!(
                "numeric columns {:?} do not match the record layout",
                self.scaler.columns
            ));
        }
        let width = NUMERIC_COLUMNS.len();
        if self.scaler.means.len() != width || self.scaler.scales.len() != width {
            return Err("scaler statistics have the wrong length".to_string());
        }
        if self.scaler.scales.iter().any(|s| !s.is_finite() || *s <= 0.0)
            || self.scaler.means.iter().any(|m| !m.is_finite())
        {
            return Err("scaler statistics must be finite with positive scales".to_string());
        }
        if self.encoder.columns != CATEGORICAL_COLUMNS {
            return Err(format!(
                "categorical columns {:?} do not match the record layout",
                self.encoder.columns
            ));
        }
        if self.encoder.categories.len() != CATEGORICAL_COLUMNS.len()
            || self.encoder.categories.iter().any(Vec::is_empty)
        {
            return Err("encoder vocabularies are missing".to_string());
        }
        Ok(())
    }
}
