use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{AnomalyError, Result};

/// Closed set of classifiers the ensemble knows about.
///
/// The declaration order is the key order of per-model vote maps.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ModelName {
    Knn,
    DecisionTree,
    Bayesian,
    Svm,
    NeuralNetwork,
}

impl ModelName {
    pub const ALL: [ModelName; 5] = [
        ModelName::Knn,
        ModelName::DecisionTree,
        ModelName::Bayesian,
        ModelName::Svm,
        ModelName::NeuralNetwork,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Knn => "knn",
            ModelName::DecisionTree => "decisionTree",
            ModelName::Bayesian => "bayesian",
            ModelName::Svm => "svm",
            ModelName::NeuralNetwork => "neuralNetwork",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = AnomalyError;

    /// Accepts the canonical names case-insensitively, with `_` or `-` separators.
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "knn" => Ok(ModelName::Knn),
            "decisiontree" => Ok(ModelName::DecisionTree),
            "bayesian" => Ok(ModelName::Bayesian),
            "svm" => Ok(ModelName::Svm),
            "neuralnetwork" => Ok(ModelName::NeuralNetwork),
            _ => Err(AnomalyError::UnknownModel(s.to_string())),
        }
    }
}

/// Configuration for one classifier in the ensemble.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    #[serde(flatten)]
    pub model_type: ModelType,
}

/// Supported classifiers and their hyper-parameters, tagged by the same
/// camelCase names as `ModelName`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ModelType {
    Knn {
        k: usize,
    },
    /// Univariate z-score outlier counter (not a learned tree).
    DecisionTree {
        z_threshold: f64,
        outlier_fraction: f64,
        /// Standard deviation used for a parameter that was constant in training.
        zero_std_fallback: f64,
    },
    Bayesian {
        /// Variance used for a parameter that was constant within a class.
        zero_variance_fallback: f64,
    },
    Svm {
        learning_rate: f64,
        iterations: usize,
    },
    NeuralNetwork {
        hidden_units: usize,
        learning_rate: f64,
        iterations: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::Knn { k: 5 }
    }
}

impl ModelType {
    pub fn name(&self) -> ModelName {
        match self {
            ModelType::Knn { .. } => ModelName::Knn,
            ModelType::DecisionTree { .. } => ModelName::DecisionTree,
            ModelType::Bayesian { .. } => ModelName::Bayesian,
            ModelType::Svm { .. } => ModelName::Svm,
            ModelType::NeuralNetwork { .. } => ModelName::NeuralNetwork,
        }
    }

    /// Default hyper-parameters for a classifier.
    pub fn defaults_for(name: ModelName) -> Self {
        match name {
            ModelName::Knn => ModelType::Knn { k: 5 },
            ModelName::DecisionTree => ModelType::DecisionTree {
                z_threshold: 2.0,
                outlier_fraction: 0.3,
                zero_std_fallback: 1.0,
            },
            ModelName::Bayesian => ModelType::Bayesian {
                zero_variance_fallback: 1.0,
            },
            ModelName::Svm => ModelType::Svm {
                learning_rate: 0.01,
                iterations: 100,
            },
            ModelName::NeuralNetwork => ModelType::NeuralNetwork {
                hidden_units: 10,
                learning_rate: 0.01,
                iterations: 100,
                seed: None,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AnomalyError::InvalidConfig(msg));
        match *self {
            ModelType::Knn { k } if k == 0 => invalid("knn: k must be at least 1".into()),
            ModelType::DecisionTree {
                z_threshold,
                outlier_fraction,
                zero_std_fallback,
            } if z_threshold <= 0.0
                || !(0.0..=1.0).contains(&outlier_fraction)
                || zero_std_fallback <= 0.0 =>
            {
                invalid(format!(
                    "decisionTree: z_threshold={} outlier_fraction={} zero_std_fallback={}",
                    z_threshold, outlier_fraction, zero_std_fallback
                ))
            }
            ModelType::Bayesian {
                zero_variance_fallback,
            } if zero_variance_fallback <= 0.0 => {
                invalid("bayesian: zero_variance_fallback must be positive".into())
            }
            ModelType::Svm { learning_rate, .. } if learning_rate <= 0.0 => {
                invalid("svm: learning_rate must be positive".into())
            }
            ModelType::NeuralNetwork {
                hidden_units,
                learning_rate,
                ..
            } if hidden_units == 0 || learning_rate <= 0.0 => invalid(format!(
                "neuralNetwork: hidden_units={} learning_rate={}",
                hidden_units, learning_rate
            )),
            _ => Ok(()),
        }
    }
}

impl FromStr for ModelType {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<ModelName>().map(ModelType::defaults_for)
    }
}

impl ModelConfig {
    pub fn new(model_type: ModelType) -> Self {
        Self { model_type }
    }

    pub fn name(&self) -> ModelName {
        self.model_type.name()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::default(),
        }
    }
}

/// How to treat a schema parameter that a lab result does not report.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Drop the training sample; reject the inference input.
    #[default]
    Exclude,
    /// Fill with the parameter's training mean.
    ImputeMean,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Fraction of usable results that must report a parameter for it to
    /// become a feature column.
    pub min_parameter_coverage: f64,
    pub missing_values: MissingValuePolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_parameter_coverage: 0.5,
            missing_values: MissingValuePolicy::Exclude,
        }
    }
}

/// Top-level engine configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub min_training_samples: usize,
    /// Leading fraction of the samples used for training; the rest is the test split.
    pub train_fraction: f64,
    pub features: FeatureConfig,
    pub models: Vec<ModelConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let models = ModelName::ALL
            .iter()
            .map(|&name| {
                let mut model_type = ModelType::defaults_for(name);
                // The production ensemble runs the network for fewer epochs.
                if let ModelType::NeuralNetwork { iterations, .. } = &mut model_type {
                    *iterations = 50;
                }
                ModelConfig::new(model_type)
            })
            .collect();
        Self {
            min_training_samples: 10,
            train_fraction: 0.8,
            features: FeatureConfig::default(),
            models,
        }
    }
}

impl EngineConfig {
    /// Load a JSON configuration; omitted fields fall back to defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_models(mut self, models: Vec<ModelConfig>) -> Self {
        self.models = models;
        self
    }

    /// Fix the random-projection seed so training is reproducible.
    pub fn with_seed(mut self, value: u64) -> Self {
        for model in self.models.iter_mut() {
            if let ModelType::NeuralNetwork { seed, .. } = &mut model.model_type {
                *seed = Some(value);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(AnomalyError::InvalidConfig(
                "at least one model must be configured".into(),
            ));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(AnomalyError::InvalidConfig(format!(
                "train_fraction must lie in (0, 1), got {}",
                self.train_fraction
            )));
        }
        if self.min_training_samples < 2 {
            return Err(AnomalyError::InvalidConfig(
                "min_training_samples must be at least 2".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.features.min_parameter_coverage) {
            return Err(AnomalyError::InvalidConfig(format!(
                "min_parameter_coverage must lie in [0, 1], got {}",
                self.features.min_parameter_coverage
            )));
        }
        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.name()) {
                return Err(AnomalyError::InvalidConfig(format!(
                    "model '{}' configured more than once",
                    model.name()
                )));
            }
            model.model_type.validate()?;
        }
        Ok(())
    }
}
