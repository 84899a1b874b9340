// ============================================================
// Layer 5 — Regression Metrics
// ============================================================
// Scores a fitted pipeline on the held-out split.
//
//   MAE  = mean |y - ŷ|
//   RMSE = sqrt(mean (y - ŷ)²)
//   R²   = 1 - SS_res / SS_tot
//
// A constant test target makes SS_tot zero; R² is then 1.0 for a
// perfect fit and 0.0 otherwise.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae:  f64,
    pub rmse: f64,
    pub r2:   f64,
}

impl RegressionMetrics {
    /// Score predictions against the truth. Both slices must be the
    /// same non-zero length; an empty slice yields NaN everywhere.
    pub fn evaluate(truth: &[f64], predicted: &[f64]) -> Self {
        debug_assert_eq!(truth.len(), predicted.len());
        let n = truth.len() as f64;

        let mut abs_sum = 0.0;
        let mut sq_sum  = 0.0;
        for (y, p) in truth.iter().zip(predicted) {
            let residual = y - p;
            abs_sum += residual.abs();
            sq_sum  += residual * residual;
        }

        let mean   = truth.iter().sum::<f64>() / n;
        let ss_tot = truth.iter().map(|y| (y - mean).powi(2)).sum::<f64>();
        let r2 = if ss_tot > 0.0 {
            1.0 - sq_sum / ss_tot
        } else if sq_sum == 0.0 {
            1.0
        } else {
            0.0
        };

        Self { mae: abs_sum / n, rmse: (sq_sum / n).sqrt(), r2 }
    }

    /// Metrics as (name, value) pairs, in logging order, under the
    /// keys the experiment runs have always been recorded with.
    pub fn as_pairs(&self) -> [(&'static str, f64); 3] {
        [("MAE", self.mae), ("RMSE", self.rmse), ("R2", self.r2)]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let m = RegressionMetrics::evaluate(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 8.0]);
        assert_eq!(m.mae, 1.0);
        assert_eq!(m.rmse, 2.0);
        // SS_tot = 5, SS_res = 16
        assert!((m.r2 - (1.0 - 16.0 / 5.0)).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_fit() {
        let m = RegressionMetrics::evaluate(&[3.0, 5.0, 8.0], &[3.0, 5.0, 8.0]);
        assert_eq!(m, RegressionMetrics { mae: 0.0, rmse: 0.0, r2: 1.0 });
    }

    #[test]
    fn test_constant_target() {
        assert_eq!(RegressionMetrics::evaluate(&[4.0, 4.0], &[4.0, 4.0]).r2, 1.0);
        assert_eq!(RegressionMetrics::evaluate(&[4.0, 4.0], &[3.0, 5.0]).r2, 0.0);
    }

    #[test]
    fn test_logged_keys() {
        let m = RegressionMetrics::evaluate(&[1.0, 2.0], &[1.0, 3.0]);
        let keys: Vec<&str> = m.as_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["MAE", "RMSE", "R2"]);
        assert_eq!(m.as_pairs()[1].1, m.rmse);
    }
}
