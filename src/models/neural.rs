use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ModelName;
use crate::error::Result;
use crate::math::{dot, sigmoid, Array1, Array2};
use crate::models::classifier_trait::{
    check_sample_width, check_training_shape, Classifier, Prediction,
};

/// Frozen random hidden layer plus a trainable logistic output unit.
///
/// `w1` (features x hidden) and `b1` are drawn once per `fit` from
/// U(-0.5, 0.5) and never updated; only `w2` and `b2` learn, by gradient
/// steps on the squared error through the output sigmoid. Pass a seed to make
/// the projection, and therefore training, reproducible.
pub struct RandomProjectionClassifier {
    hidden_units: usize,
    learning_rate: f64,
    iterations: usize,
    seed: Option<u64>,
    w1: Option<Array2<f64>>,
    b1: Vec<f64>,
    w2: Vec<f64>,
    b2: f64,
}

impl RandomProjectionClassifier {
    pub fn new(hidden_units: usize, learning_rate: f64, iterations: usize, seed: Option<u64>) -> Self {
        RandomProjectionClassifier {
            hidden_units: hidden_units.max(1),
            learning_rate,
            iterations,
            seed,
            w1: None,
            b1: Vec::new(),
            w2: Vec::new(),
            b2: 0.0,
        }
    }

    fn hidden(&self, w1: &Array2<f64>, x: &[f64]) -> Vec<f64> {
        (0..self.hidden_units)
            .map(|j| {
                let z: f64 = x
                    .iter()
                    .enumerate()
                    .map(|(i, &xi)| w1[(i, j)] * xi)
                    .sum();
                sigmoid(z + self.b1[j])
            })
            .collect()
    }

    fn output(&self, hidden: &[f64]) -> f64 {
        sigmoid(dot(&self.w2, hidden) + self.b2)
    }

    /// Network output for `x`, or `None` before training.
    pub fn forward(&self, x: &[f64]) -> Option<f64> {
        let w1 = self.w1.as_ref()?;
        Some(self.output(&self.hidden(w1, x)))
    }

    pub fn hidden_weights(&self) -> Option<&Array2<f64>> {
        self.w1.as_ref()
    }

    pub fn output_weights(&self) -> (&[f64], f64) {
        (&self.w2, self.b2)
    }
}

impl Classifier for RandomProjectionClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        check_training_shape(x, y)?;
        if x.is_empty() {
            self.w1 = None;
            return Ok(());
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let w1 = Array2::from_shape_fn((x.ncols(), self.hidden_units), |_, _| {
            rng.gen_range(-0.5..0.5)
        });
        self.b1 = (0..self.hidden_units).map(|_| rng.gen_range(-0.5..0.5)).collect();
        self.w2 = (0..self.hidden_units).map(|_| rng.gen_range(-0.5..0.5)).collect();
        self.b2 = 0.0;

        let lr = self.learning_rate;
        for _ in 0..self.iterations {
            for (row, &label) in x.rows().zip(y.iter()) {
                let target = if label { 1.0 } else { 0.0 };
                let hidden = self.hidden(&w1, row);
                let out = self.output(&hidden);
                let delta = (out - target) * out * (1.0 - out);
                for (w, h) in self.w2.iter_mut().zip(hidden.iter()) {
                    *w -= lr * delta * h;
                }
                self.b2 -= lr * delta;
            }
        }

        log::trace!(
            "neuralNetwork: {} hidden units, output bias {:.4}",
            self.hidden_units,
            self.b2
        );
        self.w1 = Some(w1);
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> Result<Prediction> {
        let Some(w1) = &self.w1 else {
            return Ok(Prediction::untrained());
        };
        check_sample_width(w1.nrows(), x)?;
        let confidence = self.output(&self.hidden(w1, x));
        Ok(Prediction::new(confidence > 0.5, confidence))
    }

    fn name(&self) -> ModelName {
        ModelName::NeuralNetwork
    }

    fn is_trained(&self) -> bool {
        self.w1.is_some()
    }

    fn n_features(&self) -> Option<usize> {
        self.w1.as_ref().map(|w| w.nrows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_abnormal() -> (Array2<f64>, Array1<bool>) {
        let x = Array2::from_shape_fn((8, 3), |r, c| 0.1 * (r + c) as f64);
        (x, Array1::from_elem(8, true))
    }

    #[test]
    fn training_never_touches_the_projection() {
        let (x, y) = all_abnormal();
        let mut frozen = RandomProjectionClassifier::new(4, 0.1, 0, Some(3));
        frozen.fit(&x, &y).unwrap();
        let mut trained = RandomProjectionClassifier::new(4, 0.1, 25, Some(3));
        trained.fit(&x, &y).unwrap();
        assert_eq!(frozen.hidden_weights(), trained.hidden_weights());
        assert_eq!(frozen.b1, trained.b1);
        assert_ne!(frozen.output_weights().0, trained.output_weights().0);
    }

    #[test]
    fn training_on_abnormal_samples_raises_the_output() {
        let (x, y) = all_abnormal();
        let mut frozen = RandomProjectionClassifier::new(10, 0.01, 0, Some(11));
        frozen.fit(&x, &y).unwrap();
        let mut trained = RandomProjectionClassifier::new(10, 0.01, 100, Some(11));
        trained.fit(&x, &y).unwrap();
        for row in x.rows() {
            assert!(trained.forward(row).unwrap() > frozen.forward(row).unwrap());
        }
    }
}
