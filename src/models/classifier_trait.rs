use serde::{Deserialize, Serialize};

use crate::config::ModelName;
use crate::error::{AnomalyError, Result};
use crate::math::{Array1, Array2};

/// Binary prediction of one classifier for one sample.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// 1 for abnormal, 0 for normal.
    pub prediction: u8,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

impl Prediction {
    pub fn new(is_abnormal: bool, confidence: f64) -> Self {
        Self {
            prediction: u8::from(is_abnormal),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Returned by classifiers that have not been fitted.
    pub fn untrained() -> Self {
        Self {
            prediction: 0,
            confidence: 0.0,
        }
    }

    pub fn is_abnormal(&self) -> bool {
        self.prediction == 1
    }
}

/// Common contract of the ensemble members.
///
/// `x` rows and the samples passed to `predict` share one feature schema.
/// `fit` rejects label/row count mismatches and `predict` rejects samples
/// whose width differs from the fitted width.
pub trait Classifier: Send + Sync {
    /// Fit the model from scratch. `y` is `true` for abnormal samples.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()>;

    /// Predict one feature vector. Untrained models return
    /// `Prediction::untrained()`.
    fn predict(&self, x: &[f64]) -> Result<Prediction>;

    fn predict_batch(&self, x: &Array2<f64>) -> Result<Vec<Prediction>> {
        x.rows().map(|row| self.predict(row)).collect()
    }

    fn name(&self) -> ModelName;

    fn is_trained(&self) -> bool;

    /// Width of the feature vectors the model was fitted on.
    fn n_features(&self) -> Option<usize>;
}

/// Shape check shared by the `fit` implementations.
pub(crate) fn check_training_shape(x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(AnomalyError::DimensionMismatch {
            expected: x.nrows(),
            found: y.len(),
        });
    }
    Ok(())
}

/// Width check shared by the `predict` implementations.
pub(crate) fn check_sample_width(expected: usize, x: &[f64]) -> Result<()> {
    if x.len() != expected {
        return Err(AnomalyError::DimensionMismatch {
            expected,
            found: x.len(),
        });
    }
    Ok(())
}
