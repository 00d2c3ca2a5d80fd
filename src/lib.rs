//! meditrack-anomaly: ensemble anomaly detection for laboratory results.
//!
//! Five small classifiers (k-nearest neighbours, a z-score outlier rule,
//! Gaussian naive Bayes, a linear hinge-loss SVM and a random-projection
//! network) are trained on historical lab results whose parameters carry
//! abnormal flags. New results are scored by every classifier and combined by
//! majority vote.
//!
//! The entry point for hosts is [`service::AnomalyDetectionService`]; the
//! classifiers, feature extraction and metrics are usable on their own.
pub mod config;
pub mod data_handling;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod io;
pub mod math;
pub mod metrics;
pub mod models;
pub mod service;
pub mod stats;

pub use config::{EngineConfig, ModelName};
pub use ensemble::EnsembleResult;
pub use error::{AnomalyError, Result};
pub use features::{LabResult, ParameterResult};
pub use models::{Classifier, Prediction};
pub use service::{AnomalyDetectionService, Trainer, TrainingSummary};
