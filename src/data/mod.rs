// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the CSV file on disk and the rows the
// estimators are fitted on:
//
//   student-mat.csv
//       │
//       ▼
//   CsvLoader         → parses rows, applies the yes/no map,
//       │               validates each row into a FeatureRecord
//       ▼
//   Dataset           → records paired with their G3 target
//       │
//       ▼
//   split_train_test  → seeded shuffle + held-out test fraction

/// Reads the `;`-separated dataset file
pub mod loader;

/// Records + targets container
pub mod dataset;

/// Seeded train/test split
pub mod splitter;
