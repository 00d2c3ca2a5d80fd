use crate::config::ModelName;
use crate::error::Result;
use crate::math::{euclidean_distance, Array1, Array2};
use crate::models::classifier_trait::{
    check_sample_width, check_training_shape, Classifier, Prediction,
};

/// k-nearest-neighbour classifier over Euclidean distance.
///
/// Instance based: `fit` stores the training rows verbatim. A neighbourhood
/// without a strict abnormal majority (including an even split) predicts
/// normal.
pub struct KnnClassifier {
    k: usize,
    x: Option<Array2<f64>>,
    y: Array1<bool>,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Self {
        KnnClassifier {
            k: k.max(1),
            x: None,
            y: Array1::from_vec(Vec::new()),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Classifier for KnnClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        check_training_shape(x, y)?;
        self.x = Some(x.clone());
        self.y = y.clone();
        Ok(())
    }

    fn predict(&self, sample: &[f64]) -> Result<Prediction> {
        let x = match &self.x {
            Some(x) if !x.is_empty() => x,
            _ => return Ok(Prediction::untrained()),
        };
        check_sample_width(x.ncols(), sample)?;

        let mut distances: Vec<(f64, bool)> = x
            .rows()
            .zip(self.y.iter())
            .map(|(row, &label)| (euclidean_distance(sample, row), label))
            .collect();
        // Stable sort: equidistant neighbours keep training order.
        distances.sort_by(|a, b| a.0.total_cmp(&b.0));

        let neighbours = &distances[..self.k.min(distances.len())];
        let abnormal = neighbours.iter().filter(|(_, label)| *label).count();
        let normal = neighbours.len() - abnormal;

        Ok(Prediction::new(
            abnormal > normal,
            abnormal.max(normal) as f64 / neighbours.len() as f64,
        ))
    }

    fn name(&self) -> ModelName {
        ModelName::Knn
    }

    fn is_trained(&self) -> bool {
        self.x.as_ref().map_or(false, |x| !x.is_empty())
    }

    fn n_features(&self) -> Option<usize> {
        self.x.as_ref().map(|x| x.ncols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(k: usize) -> KnnClassifier {
        let x = Array2::from_shape_vec(
            (6, 2),
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 10.0, 10.0, 11.0, 10.0, 10.0, 11.0],
        )
        .unwrap();
        let y = Array1::from_vec(vec![false, false, false, true, true, true]);
        let mut knn = KnnClassifier::new(k);
        knn.fit(&x, &y).unwrap();
        knn
    }

    #[test]
    fn untrained_predicts_normal_with_zero_confidence() {
        let knn = KnnClassifier::new(5);
        assert_eq!(knn.predict(&[1.0, 2.0]).unwrap(), Prediction::untrained());
        assert!(!knn.is_trained());
    }

    #[test]
    fn even_split_is_normal() {
        let knn = fitted(6);
        let p = knn.predict(&[5.0, 5.0]).unwrap();
        assert_eq!(p.prediction, 0);
        assert!((p.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn k_larger_than_training_set_uses_all_rows() {
        let knn = fitted(50);
        let p = knn.predict(&[10.0, 10.0]).unwrap();
        assert!((p.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn majority_decides_label() {
        let knn = fitted(3);
        let p = knn.predict(&[10.5, 10.5]).unwrap();
        assert_eq!(p.prediction, 1);
        assert!((p.confidence - 1.0).abs() < 1e-12);
    }
}
