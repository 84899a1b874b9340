use anyhow::{ensure, Result};

use crate::data::splitter::split_train_test;
use crate::domain::feature_record::FeatureRecord;

/// Validated records paired with their final grade G3.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<FeatureRecord>,
    targets: Vec<f64>,
}

/// Train and held-out halves of one dataset.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Dataset,
    pub test:  Dataset,
}

impl Dataset {
    pub fn new(records: Vec<FeatureRecord>, targets: Vec<f64>) -> Result<Self> {
        ensure!(
            records.len() == targets.len(),
            "{} records but {} targets",
            records.len(),
            targets.len()
        );
        Ok(Self { records, targets })
    }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn records(&self) -> &[FeatureRecord] { &self.records }

    pub fn targets(&self) -> &[f64] { &self.targets }

    /// Seeded shuffle, then hold out `test_fraction` of the rows.
    pub fn split(self, test_fraction: f64, seed: u64) -> DatasetSplit {
        let rows: Vec<(FeatureRecord, f64)> = self.records.into_iter().zip(self.targets).collect();
        let (train, test) = split_train_test(rows, test_fraction, seed);
        DatasetSplit {
            train: Dataset::from_rows(train),
            test:  Dataset::from_rows(test),
        }
    }

    fn from_rows(rows: Vec<(FeatureRecord, f64)>) -> Self {
        let (records, targets) = rows.into_iter().unzip();
        Self { records, targets }
    }
}
