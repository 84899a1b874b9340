// ============================================================
// Layer 3 — Prediction
// ============================================================
// The model's point estimate of the final grade G3. Only finite
// values can be wrapped; NaN or infinity is an inference failure,
// never a response.

use crate::domain::error::InferenceError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction(f64);

impl Prediction {
    pub fn new(value: f64) -> Result<Self, InferenceError> {
        if value.is_finite() {
            Ok(Self(value))
        } else {
            Err(InferenceError::NonFinite(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Two-decimal value for display and the HTTP response.
    pub fn rounded(self) -> f64 {
        (self.0 * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_finite() {
        assert!(Prediction::new(f64::NAN).is_err());
        assert!(Prediction::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        let p = Prediction::new(5.876_54).unwrap();
        assert_eq!(p.rounded(), 5.88);
        assert_eq!(p.value(), 5.876_54);
    }
}
