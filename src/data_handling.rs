//! Labelled sample matrices and the train/test split.
//!
//! `LabDataset` stacks aligned `LabSample`s into a row-major matrix so the
//! classifiers can iterate rows without re-checking vector lengths.
use crate::error::{AnomalyError, Result};
use crate::features::LabSample;
use crate::math::{Array1, Array2};

#[derive(Debug, Clone, PartialEq)]
pub struct LabDataset {
    pub x: Array2<f64>,
    /// `true` for abnormal results.
    pub y: Array1<bool>,
}

impl LabDataset {
    /// Stack samples into a dataset; every sample must have the same width.
    pub fn from_samples(samples: &[LabSample]) -> Result<Self> {
        let rows: Vec<Vec<f64>> = samples.iter().map(|s| s.values.clone()).collect();
        let x = Array2::from_rows(&rows).map_err(|e| AnomalyError::DimensionMismatch {
            expected: e.cols,
            found: e.len,
        })?;
        let y = samples.iter().map(|s| s.is_abnormal).collect();
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_abnormal(&self) -> usize {
        self.y.iter().filter(|&&v| v).count()
    }

    pub fn n_normal(&self) -> usize {
        self.len() - self.n_abnormal()
    }

    pub fn log_summary(&self, label: &str) {
        log::info!(
            "{}: {} samples ({} abnormal, {} normal) x {} features",
            label,
            self.len(),
            self.n_abnormal(),
            self.n_normal(),
            self.n_features()
        );
    }

    pub fn select(&self, indices: &[usize]) -> LabDataset {
        LabDataset {
            x: self.x.select_rows(indices),
            y: self.y.select(indices),
        }
    }

    /// Order-preserving split: the leading `floor(n * fraction)` rows train,
    /// the remainder tests. No shuffling, so splits are reproducible.
    pub fn split(&self, train_fraction: f64) -> (LabDataset, LabDataset) {
        let n_samples = self.len();
        let n_train = ((n_samples as f64 * train_fraction).floor() as usize).min(n_samples);
        let train_indices: Vec<usize> = (0..n_train).collect();
        let test_indices: Vec<usize> = (n_train..n_samples).collect();
        (self.select(&train_indices), self.select(&test_indices))
    }
}
