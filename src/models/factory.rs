use crate::config::{ModelConfig, ModelType};
use crate::models::bayes::BayesClassifier;
use crate::models::classifier_trait::Classifier;
use crate::models::knn::KnnClassifier;
use crate::models::neural::RandomProjectionClassifier;
use crate::models::svm::SvmClassifier;
use crate::models::threshold::ThresholdClassifier;

/// Build an untrained classifier from its configuration.
pub fn build_model(params: &ModelConfig) -> Box<dyn Classifier> {
    match params.model_type {
        ModelType::Knn { k } => Box::new(KnnClassifier::new(k)),
        ModelType::DecisionTree {
            z_threshold,
            outlier_fraction,
            zero_std_fallback,
        } => Box::new(ThresholdClassifier::new(
            z_threshold,
            outlier_fraction,
            zero_std_fallback,
        )),
        ModelType::Bayesian {
            zero_variance_fallback,
        } => Box::new(BayesClassifier::new(zero_variance_fallback)),
        ModelType::Svm {
            learning_rate,
            iterations,
        } => Box::new(SvmClassifier::new(learning_rate, iterations)),
        ModelType::NeuralNetwork {
            hidden_units,
            learning_rate,
            iterations,
            seed,
        } => Box::new(RandomProjectionClassifier::new(
            hidden_units,
            learning_rate,
            iterations,
            seed,
        )),
    }
}
