use std::error::Error;
use std::fmt;

/// Errors reported by the anomaly detection engine.
#[derive(Debug, Clone, PartialEq)]
pub enum AnomalyError {
    /// Fewer usable historical samples than the configured minimum.
    InsufficientData { usable: usize, required: usize },
    NotTrained,
    /// The result to classify carries no numeric parameter value.
    NoNumericData,
    UnknownModel(String),
    /// A parameter of the trained feature schema is absent from the input.
    MissingFeature(String),
    DimensionMismatch { expected: usize, found: usize },
    InvalidConfig(String),
    Numerical(String),
}

impl fmt::Display for AnomalyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnomalyError::InsufficientData { usable, required } => write!(
                f,
                "Insufficient training data: {} usable samples, at least {} required",
                usable, required
            ),
            AnomalyError::NotTrained => write!(f, "Models not trained yet"),
            AnomalyError::NoNumericData => write!(f, "No numeric values to analyze"),
            AnomalyError::UnknownModel(name) => write!(f, "Unknown model: {}", name),
            AnomalyError::MissingFeature(name) => {
                write!(f, "Missing value for trained parameter '{}'", name)
            }
            AnomalyError::DimensionMismatch { expected, found } => write!(
                f,
                "Feature vector has {} values, expected {}",
                found, expected
            ),
            AnomalyError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            AnomalyError::Numerical(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl Error for AnomalyError {}

pub type Result<T> = std::result::Result<T, AnomalyError>;
