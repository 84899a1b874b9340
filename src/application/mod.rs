// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only. This layer wires data, ml and infra
// together; it holds no numeric code and does no I/O of its own
// beyond what its collaborators do.
//
//   train_use_case.rs     — load, split, fit every model, register
//                           the winner, move it to a stage
//
//   prediction_service.rs — validate a raw record and predict with
//                           the loaded artifact (HTTP + CLI)

/// The training workflow
pub mod train_use_case;

/// The serving workflow
pub mod prediction_service;
