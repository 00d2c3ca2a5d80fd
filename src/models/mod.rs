pub mod bayes;
pub mod classifier_trait;
pub mod factory;
pub mod knn;
pub mod neural;
pub mod svm;
pub mod threshold;

pub use classifier_trait::{Classifier, Prediction};
