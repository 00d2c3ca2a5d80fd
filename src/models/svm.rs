use crate::config::ModelName;
use crate::error::Result;
use crate::math::{dot, sigmoid, Array1, Array2};
use crate::models::classifier_trait::{
    check_sample_width, check_training_shape, Classifier, Prediction,
};

/// Linear classifier trained with hinge-loss sub-gradient steps.
///
/// Labels map to +1 (abnormal) and -1 (normal). Every epoch visits the samples
/// in input order, and a sample whose margin `y * (w.x + b)` is below 1 moves
/// the weights by `lr * y * x` and the bias by `lr * y`. There is no shuffling
/// and no regularisation term, so training is fully deterministic.
pub struct SvmClassifier {
    learning_rate: f64,
    iterations: usize,
    weights: Option<Vec<f64>>,
    bias: f64,
}

impl SvmClassifier {
    pub fn new(learning_rate: f64, iterations: usize) -> Self {
        SvmClassifier {
            learning_rate,
            iterations,
            weights: None,
            bias: 0.0,
        }
    }

    /// Signed distance-like score `w.x + b`.
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        match &self.weights {
            Some(w) => dot(w, x) + self.bias,
            None => 0.0,
        }
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl Classifier for SvmClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        check_training_shape(x, y)?;
        if x.is_empty() {
            self.weights = None;
            self.bias = 0.0;
            return Ok(());
        }

        let mut w = vec![0.0; x.ncols()];
        let mut b = 0.0;
        let lr = self.learning_rate;
        for _ in 0..self.iterations {
            for (row, &label) in x.rows().zip(y.iter()) {
                let target = if label { 1.0 } else { -1.0 };
                if target * (dot(&w, row) + b) < 1.0 {
                    for (wi, &xi) in w.iter_mut().zip(row.iter()) {
                        *wi += lr * target * xi;
                    }
                    b += lr * target;
                }
            }
        }

        log::trace!("svm: bias={:.4} after {} epochs", b, self.iterations);
        self.weights = Some(w);
        self.bias = b;
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> Result<Prediction> {
        let Some(w) = &self.weights else {
            return Ok(Prediction::untrained());
        };
        check_sample_width(w.len(), x)?;
        let confidence = sigmoid(self.decision_function(x));
        Ok(Prediction::new(confidence > 0.5, confidence))
    }

    fn name(&self) -> ModelName {
        ModelName::Svm
    }

    fn is_trained(&self) -> bool {
        self.weights.is_some()
    }

    fn n_features(&self) -> Option<usize> {
        self.weights.as_ref().map(Vec::len)
    }
}
