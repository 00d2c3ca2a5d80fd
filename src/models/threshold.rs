use crate::config::ModelName;
use crate::error::Result;
use crate::math::{Array1, Array2};
use crate::models::classifier_trait::{
    check_sample_width, check_training_shape, Classifier, Prediction,
};
use crate::stats::FeatureStats;

/// Univariate z-score outlier counter, exposed as the `decisionTree` model.
///
/// Training learns the typical value of every parameter (mean and standard
/// deviation over all samples, labels ignored). A sample is abnormal when the
/// fraction of parameters lying more than `z_threshold` deviations from their
/// mean exceeds `outlier_fraction`. No splits are learned. A parameter that
/// was constant in training uses `zero_std_fallback` as its deviation.
pub struct ThresholdClassifier {
    z_threshold: f64,
    outlier_fraction: f64,
    zero_std_fallback: f64,
    mean: Vec<f64>,
    std_dev: Vec<f64>,
}

impl ThresholdClassifier {
    pub fn new(z_threshold: f64, outlier_fraction: f64, zero_std_fallback: f64) -> Self {
        ThresholdClassifier {
            z_threshold,
            outlier_fraction,
            zero_std_fallback,
            mean: Vec::new(),
            std_dev: Vec::new(),
        }
    }

    /// Fraction of features whose |z| exceeds the threshold.
    pub fn outlier_fraction_of(&self, x: &[f64]) -> f64 {
        if self.mean.is_empty() || x.is_empty() {
            return 0.0;
        }
        let outliers = x
            .iter()
            .zip(self.mean.iter().zip(self.std_dev.iter()))
            .filter(|&(&v, (&mu, &sd))| ((v - mu).abs() / sd) > self.z_threshold)
            .count();
        outliers as f64 / x.len() as f64
    }

    pub fn means(&self) -> &[f64] {
        &self.mean
    }
}

impl Classifier for ThresholdClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        check_training_shape(x, y)?;
        let stats = FeatureStats::from_rows(x);
        self.std_dev = stats.std_devs(self.zero_std_fallback);
        self.mean = stats.mean;
        log::trace!("decisionTree: learned statistics for {} features", self.mean.len());
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> Result<Prediction> {
        if !self.is_trained() {
            return Ok(Prediction::untrained());
        }
        check_sample_width(self.mean.len(), x)?;
        let fraction = self.outlier_fraction_of(x);
        Ok(Prediction::new(fraction > self.outlier_fraction, fraction.min(1.0)))
    }

    fn name(&self) -> ModelName {
        ModelName::DecisionTree
    }

    fn is_trained(&self) -> bool {
        !self.mean.is_empty()
    }

    fn n_features(&self) -> Option<usize> {
        self.is_trained().then(|| self.mean.len())
    }
}
