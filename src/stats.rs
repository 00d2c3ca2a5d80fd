use statrs::distribution::{Continuous, Normal};

use crate::error::{AnomalyError, Result};
use crate::math::{self, Array2};

/// Population mean and variance of every column of a sample matrix.
///
/// Rows are samples and columns are schema parameters. An empty matrix
/// produces empty statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStats {
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
}

impl FeatureStats {
    pub fn from_rows(x: &Array2<f64>) -> Self {
        if x.is_empty() {
            return Self {
                mean: Vec::new(),
                variance: Vec::new(),
            };
        }
        let (mean, variance) = (0..x.ncols())
            .map(|c| {
                let column = x.column(c);
                let mu = math::mean(column.as_slice()).unwrap_or(0.0);
                let var = math::variance(column.as_slice()).unwrap_or(0.0);
                (mu, var)
            })
            .unzip();
        Self { mean, variance }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Standard deviations; a zero deviation is replaced by `fallback`.
    pub fn std_devs(&self, fallback: f64) -> Vec<f64> {
        self.variance
            .iter()
            .map(|&v| if v > 0.0 { v.sqrt() } else { fallback })
            .collect()
    }
}

/// Per-feature Gaussian densities of one class, evaluated in log space.
#[derive(Debug, Clone)]
pub struct GaussianProfile {
    distributions: Vec<Normal>,
}

impl GaussianProfile {
    /// Build one normal distribution per feature; a zero variance is
    /// replaced by `zero_variance`.
    pub fn new(stats: &FeatureStats, zero_variance: f64) -> Result<Self> {
        let distributions = stats
            .mean
            .iter()
            .zip(stats.variance.iter())
            .map(|(&mu, &var)| {
                let var = if var > 0.0 { var } else { zero_variance };
                Normal::new(mu, var.sqrt())
                    .map_err(|e| AnomalyError::Numerical(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { distributions })
    }

    /// Sum of per-feature log densities at `x`.
    pub fn log_likelihood(&self, x: &[f64]) -> f64 {
        self.distributions
            .iter()
            .zip(x.iter())
            .map(|(dist, &v)| dist.ln_pdf(v))
            .sum()
    }
}
