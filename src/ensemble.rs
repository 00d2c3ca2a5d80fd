//! Majority-vote aggregation over the trained classifiers.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ModelName;
use crate::error::Result;
use crate::math::round_percent;
use crate::models::{Classifier, Prediction};

/// Vote tally of the ensemble.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleVote {
    pub prediction: u8,
    /// Mean confidence in [0, 1].
    pub confidence: f64,
    pub votes_for_anomalous: usize,
    pub total_models: usize,
}

/// Outcome of running every classifier on one sample.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleResult {
    pub is_anomalous: bool,
    /// Mean confidence as a percentage with two decimals.
    pub average_confidence: f64,
    pub individual_predictions: BTreeMap<ModelName, Prediction>,
    pub ensemble: EnsembleVote,
}

/// Combine per-model predictions by strict majority.
///
/// A tie (possible with an even number of models) is not anomalous.
pub fn aggregate(predictions: BTreeMap<ModelName, Prediction>) -> EnsembleResult {
    let total_models = predictions.len();
    let votes_for_anomalous = predictions.values().filter(|p| p.is_abnormal()).count();
    let is_anomalous = 2 * votes_for_anomalous > total_models;
    let confidence = if total_models == 0 {
        0.0
    } else {
        predictions.values().map(|p| p.confidence).sum::<f64>() / total_models as f64
    };

    EnsembleResult {
        is_anomalous,
        average_confidence: round_percent(confidence),
        individual_predictions: predictions,
        ensemble: EnsembleVote {
            prediction: u8::from(is_anomalous),
            confidence,
            votes_for_anomalous,
            total_models,
        },
    }
}

/// Run every model on `x` and aggregate the votes.
pub fn predict_all<'a, I>(models: I, x: &[f64]) -> Result<EnsembleResult>
where
    I: IntoIterator<Item = &'a dyn Classifier>,
{
    let predictions = models
        .into_iter()
        .map(|model| Ok((model.name(), model.predict(x)?)))
        .collect::<Result<BTreeMap<_, _>>>()?;
    Ok(aggregate(predictions))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(labels: &[(ModelName, bool)]) -> BTreeMap<ModelName, Prediction> {
        labels
            .iter()
            .map(|&(name, abnormal)| (name, Prediction::new(abnormal, 0.8)))
            .collect()
    }

    #[test]
    fn strict_majority_wins() {
        let result = aggregate(votes(&[
            (ModelName::Knn, true),
            (ModelName::DecisionTree, true),
            (ModelName::Bayesian, true),
            (ModelName::Svm, false),
            (ModelName::NeuralNetwork, false),
        ]));
        assert!(result.is_anomalous);
        assert_eq!(result.ensemble.votes_for_anomalous, 3);
        assert_eq!(result.ensemble.total_models, 5);
        assert_eq!(result.ensemble.prediction, 1);
        assert_eq!(result.average_confidence, 80.0);
    }

    #[test]
    fn even_tie_is_not_anomalous() {
        let result = aggregate(votes(&[
            (ModelName::Knn, true),
            (ModelName::DecisionTree, true),
            (ModelName::Bayesian, false),
            (ModelName::Svm, false),
        ]));
        assert!(!result.is_anomalous);
        assert_eq!(result.ensemble.prediction, 0);
    }

    #[test]
    fn individual_predictions_serialize_by_model_name() {
        let result = aggregate(votes(&[(ModelName::NeuralNetwork, true)]));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["individualPredictions"]["neuralNetwork"]["prediction"], 1);
        assert_eq!(json["ensemble"]["votesForAnomalous"], 1);
        assert_eq!(json["isAnomalous"], true);
    }
}
