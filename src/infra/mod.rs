// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem-backed implementations of the domain traits:
//
//   store.rs    — tracking-URI resolution and atomic JSON writes,
//                 shared by the two stores below
//
//   registry.rs — LocalRegistry: versioned, staged model store
//                 (implements ModelRegistry)
//
//   tracking.rs — LocalTracker: per-run params, metrics and model
//                 artifacts, plus an experiment-wide metrics.csv
//                 (implements ExperimentTracker)
//
// Only local paths and file:// URIs are supported. A remote
// tracking server would be another implementation of the same
// traits; nothing above this layer would change.

/// Tracking URI resolution and JSON file helpers
pub mod store;

/// Versioned model registry
pub mod registry;

/// Experiment run tracking
pub mod tracking;
