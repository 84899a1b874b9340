// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Reads student-mat.csv (UCI layout) into a validated Dataset.
//
// File format:
//   - `;`-separated, one header row, string values usually quoted
//   - 32 feature columns plus the target column G3
//   - binary columns hold "yes"/"no"
//
// Every row goes through FeatureRecord::from_source, the same
// validation the HTTP endpoint applies. A bad row aborts the load
// with its line number; nothing is silently coerced. In particular
// a binary column holding anything other than yes/no/1/0 is an
// error, never passed through to the model unchanged.

use anyhow::{bail, ensure, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::data::dataset::Dataset;
use crate::domain::feature_record::{FeatureRecord, FieldSource, RawValue, FIELD_NAMES};
use crate::domain::traits::DatasetSource;

/// Name of the target column.
pub const TARGET_COLUMN: &str = "G3";

/// Loads a delimited student-performance file.
pub struct CsvLoader {
    path:      PathBuf,
    delimiter: u8,
}

impl CsvLoader {
    /// A loader for a `;`-separated file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), delimiter: b';' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One CSV row viewed through the header, so fields are looked up
/// by name and column order in the file does not matter.
struct CsvRow<'a> {
    columns: &'a HashMap<String, usize>,
    row:     &'a csv::StringRecord,
}

impl FieldSource for CsvRow<'_> {
    fn get(&self, field: &str) -> Option<RawValue<'_>> {
        self.columns
            .get(field)
            .and_then(|&idx| self.row.get(idx))
            .map(RawValue::Text)
    }
}

impl DatasetSource for CsvLoader {
    fn load(&self) -> Result<Dataset> {
        let shown = self.path.display();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open dataset '{shown}'"))?;

        let columns: HashMap<String, usize> = reader
            .headers()
            .with_context(|| format!("Cannot read header of '{shown}'"))?
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();

        let missing: Vec<&str> = FIELD_NAMES
            .iter()
            .chain(std::iter::once(&TARGET_COLUMN))
            .filter(|name| !columns.contains_key(**name))
            .copied()
            .collect();
        ensure!(
            missing.is_empty(),
            "Dataset '{shown}' lacks column(s): {}",
            missing.join(", ")
        );
        let target_idx = columns[TARGET_COLUMN];

        let mut records = Vec::new();
        let mut targets = Vec::new();

        for (idx, row) in reader.records().enumerate() {
            // line 1 is the header
            let line = idx + 2;
            let row  = row.with_context(|| format!("Malformed line {line} in '{shown}'"))?;

            let source = CsvRow { columns: &columns, row: &row };
            let record = FeatureRecord::from_source(&source)
                .with_context(|| format!("Invalid line {line} in '{shown}'"))?;
            let target = parse_target(row.get(target_idx).unwrap_or_default())
                .with_context(|| format!("Invalid {TARGET_COLUMN} on line {line} in '{shown}'"))?;

            records.push(record);
            targets.push(target);
        }

        ensure!(!records.is_empty(), "Dataset '{shown}' contains no rows");
        tracing::info!("Loaded {} rows from '{}'", records.len(), shown);

        Dataset::new(records, targets)
    }
}

fn parse_target(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("'{raw}' is not a number"))?;
    if !(0.0..=20.0).contains(&value) {
        bail!("{value} is outside [0, 20]");
    }
    Ok(value)
}
