//! Small array types and numeric helpers shared by the classifiers.
//!
//! `Array2` holds sample matrices (rows = lab samples, columns = schema
//! parameters) and `Array1` holds labels and per-feature statistics. The free
//! functions operate on plain slices so classifiers can work on borrowed rows.
pub mod matrix;
pub mod vector;

pub use matrix::{Array2, ShapeError};
pub use vector::{dot, euclidean_distance, mean, variance, Array1};

/// Logistic function, saturating cleanly for large magnitudes.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Express a fraction as a percentage rounded to two decimals.
pub fn round_percent(fraction: f64) -> f64 {
    (fraction * 10000.0).round() / 100.0
}
