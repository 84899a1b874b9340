// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that define what the system works with:
// the validated student record, its categorical vocabularies,
// the prediction, registered model versions, and the error
// taxonomy shared by every other layer.
//
// Nothing in here performs I/O.

// Closed vocabularies of the string-valued columns
pub mod category;

// Typed failures: validation, model availability, inference
pub mod error;

// The 32-field student record and its validation
pub mod feature_record;

// Stages, selectors and version metadata of the registry
pub mod model_version;

// A finite grade estimate
pub mod prediction;

// Collaborator abstractions implemented by data/ and infra/
pub mod traits;
