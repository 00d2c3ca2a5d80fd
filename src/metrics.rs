//! Confusion-matrix metrics for the held-out test split.
use serde::{Deserialize, Serialize};

use crate::data_handling::LabDataset;
use crate::error::Result;
use crate::math::round_percent;
use crate::models::Classifier;

/// TP/FP/TN/FN counts with "abnormal" as the positive class.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_labels<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        let mut cm = ConfusionMatrix::default();
        for (predicted, actual) in pairs {
            cm.record(predicted, actual);
        }
        cm
    }

    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.tp += 1,
            (true, false) => self.fp += 1,
            (false, false) => self.tn += 1,
            (false, true) => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Scores of one classifier; the four rates are percentages with two decimals.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl From<ConfusionMatrix> for ModelMetrics {
    fn from(cm: ConfusionMatrix) -> Self {
        ModelMetrics {
            accuracy: round_percent(cm.accuracy()),
            precision: round_percent(cm.precision()),
            recall: round_percent(cm.recall()),
            f1_score: round_percent(cm.f1()),
            true_positives: cm.tp,
            false_positives: cm.fp,
            true_negatives: cm.tn,
            false_negatives: cm.fn_,
        }
    }
}

/// Run `model` over every test sample and score it.
pub fn evaluate(model: &dyn Classifier, test: &LabDataset) -> Result<ModelMetrics> {
    let predictions = model.predict_batch(&test.x)?;
    let cm = ConfusionMatrix::from_labels(
        predictions
            .iter()
            .map(|p| p.is_abnormal())
            .zip(test.y.iter().copied()),
    );
    log::debug!(
        "{}: tp={} fp={} tn={} fn={}",
        model.name(),
        cm.tp,
        cm.fp,
        cm.tn,
        cm.fn_
    );
    Ok(ModelMetrics::from(cm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_scores_follow_counts() {
        let cm = ConfusionMatrix {
            tp: 3,
            fp: 1,
            tn: 4,
            fn_: 2,
        };
        let m = ModelMetrics::from(cm);
        assert_eq!(m.accuracy, 70.0);
        assert_eq!(m.precision, 75.0);
        assert_eq!(m.recall, 60.0);
        assert_eq!(m.f1_score, 66.67);
    }

    #[test]
    fn empty_denominators_score_zero() {
        let cm = ConfusionMatrix::from_labels(vec![(false, false), (false, false)]);
        let m = ModelMetrics::from(cm);
        assert_eq!(m.accuracy, 100.0);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1_score, 0.0);
        assert_eq!(m.true_negatives, 2);
    }

    #[test]
    fn serializes_with_host_field_names() {
        let m = ModelMetrics::from(ConfusionMatrix::default());
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"f1Score\""));
        assert!(json.contains("\"truePositives\""));
        assert!(json.contains("\"falseNegatives\""));
    }
}
