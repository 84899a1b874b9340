// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Three families of failure, each with a fixed handling policy:
//
//   ValidationError       → client error, detected before the model
//                           is ever called, never retried
//   ModelUnavailableError → fatal at startup, the service never
//                           becomes ready
//   InferenceError        → server error, full detail goes to the
//                           logs, the caller only sees an opaque id
//
// Application plumbing uses anyhow; these typed errors are what
// crosses layer boundaries where the caller has to branch on them.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// ─── ValidationError ──────────────────────────────────────────────────────────

/// What is wrong with a single field of an incoming record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldErrorKind {
    #[error("field is required")]
    Missing,

    #[error("field is not part of the schema")]
    Unexpected,

    #[error("expected {expected}")]
    WrongType { expected: &'static str },

    #[error("value {value} is outside [{min}, {max}]")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("unknown category {value:?}, expected one of {allowed:?}")]
    UnknownCategory { value: String, allowed: Vec<String> },
}

impl FieldErrorKind {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            FieldErrorKind::Missing                 => "missing",
            FieldErrorKind::Unexpected              => "unexpected",
            FieldErrorKind::WrongType { .. }        => "wrong_type",
            FieldErrorKind::OutOfRange { .. }       => "out_of_range",
            FieldErrorKind::UnknownCategory { .. }  => "unknown_category",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub kind:  FieldErrorKind,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self { field: field.into(), kind }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// A record failed schema validation. Carries every offending field,
/// not just the first one found.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(fields: Vec<FieldError>) -> Self {
        Self { fields }
    }

    /// True when every failure is an unknown category, which is
    /// reported separately from generic validation failures.
    pub fn is_unknown_category(&self) -> bool {
        !self.fields.is_empty()
            && self
                .fields
                .iter()
                .all(|f| matches!(f.kind, FieldErrorKind::UnknownCategory { .. }))
    }

    /// Names of the offending fields, in reporting order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid record")?;
        for (i, field) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{field}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// ─── ModelUnavailableError ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ModelUnavailableError {
    #[error("no version of model '{name}' matches selector '{selector}'")]
    NotFound { name: String, selector: String },

    #[error("unsupported tracking uri '{0}': only local paths and file:// uris are supported")]
    UnsupportedTrackingUri(String),

    #[error("model artifact '{file}' is unusable: {reason}", file = .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("cannot read '{file}'", file = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ─── InferenceError ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("feature vector has {actual} columns, regressor expects {expected}")]
    FeatureWidth { expected: usize, actual: usize },

    #[error("model produced a non-finite value ({0})")]
    NonFinite(f64),

    #[error("category {value:?} of column '{column}' was not seen during fitting")]
    UnseenCategory { column: String, value: String },

    #[error("estimator failed: {0}")]
    Estimator(String),

    #[error("inference exceeded {0:?}")]
    Timeout(Duration),

    #[error("inference worker failed: {0}")]
    Worker(String),
}

// ─── FitError ─────────────────────────────────────────────────────────────────
// Training-time only; never reaches the serving path.

#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("{rows} feature rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("training target contains a non-finite value")]
    NonFiniteTarget,

    #[error("invalid hyperparameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("estimator failed to fit: {0}")]
    Estimator(String),

    #[error("cannot encode training rows: {0}")]
    Encoding(String),
}
