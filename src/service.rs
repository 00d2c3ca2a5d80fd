//! Training orchestration and the host-facing service.
//!
//! `Trainer::fit` is a pure builder: it extracts features, splits the data,
//! fits every configured classifier and scores it on the test split, and
//! returns a complete `TrainedEnsemble`. `AnomalyDetectionService` owns at
//! most one such ensemble and swaps it in whole after a successful fit, so a
//! failed or in-progress training never exposes a partial model set.
//!
//! The service is not internally synchronised. Hosts sharing it between
//! threads should wrap it in a lock (e.g. `RwLock`): predictions only need
//! `&self`, retraining needs `&mut self`. Long trainings can run through
//! `Trainer::fit` without holding the lock, followed by `install`.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, ModelName};
use crate::data_handling::LabDataset;
use crate::ensemble::{self, EnsembleResult};
use crate::error::{AnomalyError, Result};
use crate::features::{FeatureExtractor, LabResult, ParameterResult};
use crate::metrics::{self, ModelMetrics};
use crate::models::factory::build_model;
use crate::models::{Classifier, Prediction};

/// Classifiers, schema and test metrics from one training run.
pub struct TrainedEnsemble {
    extractor: FeatureExtractor,
    models: Vec<Box<dyn Classifier>>,
    metrics: BTreeMap<ModelName, ModelMetrics>,
    summary: TrainingSummary,
}

impl TrainedEnsemble {
    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn model(&self, name: ModelName) -> Option<&dyn Classifier> {
        self.models
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    fn classifiers(&self) -> impl Iterator<Item = &dyn Classifier> + '_ {
        self.models.iter().map(|m| m.as_ref())
    }

    /// Model names in configuration order.
    fn names(&self) -> impl Iterator<Item = ModelName> + '_ {
        self.models.iter().map(|m| m.name())
    }
}

/// Report returned by a successful training run.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSummary {
    pub success: bool,
    pub samples_used: usize,
    pub samples_rejected: usize,
    pub samples_excluded: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub feature_names: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub metrics: BTreeMap<ModelName, ModelMetrics>,
}

/// Builds trained ensembles from historical lab results.
pub struct Trainer;

impl Trainer {
    pub fn fit(config: &EngineConfig, results: &[LabResult]) -> Result<TrainedEnsemble> {
        config.validate()?;

        let (extractor, outcome) = FeatureExtractor::fit(results, &config.features);
        log::info!(
            "Extracted {} samples from {} lab results ({} rejected, {} excluded), {} features",
            outcome.samples.len(),
            results.len(),
            outcome.rejected,
            outcome.excluded,
            extractor.schema().len()
        );

        if outcome.samples.len() < config.min_training_samples {
            log::warn!(
                "Insufficient training data: {} usable samples, minimum {} required",
                outcome.samples.len(),
                config.min_training_samples
            );
            return Err(AnomalyError::InsufficientData {
                usable: outcome.samples.len(),
                required: config.min_training_samples,
            });
        }

        let dataset = LabDataset::from_samples(&outcome.samples)?;
        let (train, test) = dataset.split(config.train_fraction);
        train.log_summary("Train split");
        test.log_summary("Test split");

        let mut models = Vec::with_capacity(config.models.len());
        let mut scores = BTreeMap::new();
        for model_config in &config.models {
            let mut model = build_model(model_config);
            log::info!("Training {}", model.name());
            model.fit(&train.x, &train.y)?;
            let model_metrics = metrics::evaluate(model.as_ref(), &test)?;
            log::info!(
                "{}: accuracy {:.2}% precision {:.2}% recall {:.2}% f1 {:.2}%",
                model.name(),
                model_metrics.accuracy,
                model_metrics.precision,
                model_metrics.recall,
                model_metrics.f1_score
            );
            scores.insert(model.name(), model_metrics);
            models.push(model);
        }

        let summary = TrainingSummary {
            success: true,
            samples_used: dataset.len(),
            samples_rejected: outcome.rejected,
            samples_excluded: outcome.excluded,
            train_size: train.len(),
            test_size: test.len(),
            feature_names: extractor.schema().names().to_vec(),
            trained_at: Utc::now(),
            metrics: scores.clone(),
        };

        Ok(TrainedEnsemble {
            extractor,
            models,
            metrics: scores,
            summary,
        })
    }
}

/// Training state as seen by the host.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub is_trained: bool,
    pub last_training_date: Option<DateTime<Utc>>,
    pub metrics: BTreeMap<ModelName, ModelMetrics>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub is_trained: bool,
    pub last_training_date: Option<DateTime<Utc>>,
    pub model_count: usize,
    pub models: Vec<ModelName>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BestModel {
    pub model_name: ModelName,
    pub metrics: ModelMetrics,
}

/// One row of the model comparison table.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelComparisonEntry {
    pub name: ModelName,
    #[serde(flatten)]
    pub metrics: ModelMetrics,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelComparison {
    pub trained: bool,
    pub training_date: Option<DateTime<Utc>>,
    pub models: Vec<ModelComparisonEntry>,
}

/// Host-owned anomaly detection service.
pub struct AnomalyDetectionService {
    config: EngineConfig,
    trained: Option<TrainedEnsemble>,
}

impl Default for AnomalyDetectionService {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AnomalyDetectionService {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            trained: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    /// Retrain every classifier from scratch. On error the previously
    /// trained ensemble, if any, stays in place.
    pub fn train(&mut self, results: &[LabResult]) -> Result<TrainingSummary> {
        let ensemble = Trainer::fit(&self.config, results)?;
        let summary = ensemble.summary().clone();
        self.install(ensemble);
        Ok(summary)
    }

    /// Replace the current ensemble with one built by `Trainer::fit`.
    pub fn install(&mut self, ensemble: TrainedEnsemble) {
        if let Some(best) = best_of(ensemble.names(), &ensemble.metrics) {
            log::info!(
                "Installed ensemble of {} models, best model {} (f1 {:.2}%)",
                ensemble.models.len(),
                best.model_name,
                best.metrics.f1_score
            );
        }
        self.trained = Some(ensemble);
    }

    fn ensemble(&self) -> Result<&TrainedEnsemble> {
        self.trained.as_ref().ok_or(AnomalyError::NotTrained)
    }

    /// Ensemble prediction for one lab result.
    pub fn predict_ensemble(&self, params: &[ParameterResult]) -> Result<EnsembleResult> {
        let ensemble = self.ensemble()?;
        let x = ensemble.extractor.transform(params)?;
        ensemble::predict_all(ensemble.classifiers(), &x)
    }

    /// Prediction of a single named classifier, without aggregation.
    pub fn predict_single(&self, params: &[ParameterResult], model_name: &str) -> Result<Prediction> {
        let ensemble = self.ensemble()?;
        let name: ModelName = model_name.parse()?;
        let model = ensemble
            .model(name)
            .ok_or_else(|| AnomalyError::UnknownModel(model_name.to_string()))?;
        let x = ensemble.extractor.transform(params)?;
        model.predict(&x)
    }

    pub fn metrics(&self) -> MetricsReport {
        match &self.trained {
            Some(t) => MetricsReport {
                is_trained: true,
                last_training_date: Some(t.summary.trained_at),
                metrics: t.metrics.clone(),
            },
            None => MetricsReport {
                is_trained: false,
                last_training_date: None,
                metrics: BTreeMap::new(),
            },
        }
    }

    /// Trained models in configuration order.
    pub fn status(&self) -> ServiceStatus {
        let models: Vec<ModelName> = self
            .trained
            .as_ref()
            .map(|t| t.names().collect())
            .unwrap_or_default();
        ServiceStatus {
            is_trained: self.is_trained(),
            last_training_date: self.trained.as_ref().map(|t| t.summary.trained_at),
            model_count: models.len(),
            models,
        }
    }

    /// Classifier with the highest test F1; ties go to the model configured first.
    pub fn best_model(&self) -> Option<BestModel> {
        self.trained
            .as_ref()
            .and_then(|t| best_of(t.names(), &t.metrics))
    }

    /// Per-model test metrics in configuration order.
    pub fn model_comparison(&self) -> ModelComparison {
        let models = match &self.trained {
            Some(t) => t
                .names()
                .filter_map(|name| {
                    t.metrics
                        .get(&name)
                        .map(|&metrics| ModelComparisonEntry { name, metrics })
                })
                .collect(),
            None => Vec::new(),
        };
        ModelComparison {
            trained: self.is_trained(),
            training_date: self.trained.as_ref().map(|t| t.summary.trained_at),
            models,
        }
    }
}

fn best_of<I>(order: I, metrics: &BTreeMap<ModelName, ModelMetrics>) -> Option<BestModel>
where
    I: IntoIterator<Item = ModelName>,
{
    let mut best: Option<BestModel> = None;
    for name in order {
        let Some(m) = metrics.get(&name) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| m.f1_score > b.metrics.f1_score) {
            best = Some(BestModel {
                model_name: name,
                metrics: *m,
            });
        }
    }
    best
}
