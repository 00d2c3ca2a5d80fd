//! Feature extraction for lab results.
//!
//! A lab result is a list of parameter readings. Readings are keyed by
//! parameter name and laid out against a `FeatureSchema` learned from the
//! training history, so position `i` of every feature vector always refers to
//! the same test parameter.
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::{FeatureConfig, MissingValuePolicy};
use crate::error::{AnomalyError, Result};

/// Recorded value of a parameter: hosts send either JSON numbers or strings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
}

impl ParameterValue {
    /// Numeric reading, if the value holds a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(v) => Some(*v).filter(|v| v.is_finite()),
            ParameterValue::Text(s) => parse_numeric(s),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

/// One parameter reading of a lab result.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterResult {
    #[serde(default)]
    pub parameter_name: String,
    #[serde(default)]
    pub value: Option<ParameterValue>,
    /// Explicit abnormal flag; only present on historical results.
    #[serde(default)]
    pub is_abnormal: Option<bool>,
}

impl ParameterResult {
    pub fn new(parameter_name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            parameter_name: parameter_name.into(),
            value: Some(value.into()),
            is_abnormal: None,
        }
    }

    pub fn flagged(mut self, is_abnormal: bool) -> Self {
        self.is_abnormal = Some(is_abnormal);
        self
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_ref().and_then(ParameterValue::as_number)
    }

    fn key(&self) -> &str {
        self.parameter_name.trim()
    }
}

/// A completed lab request with its parameter readings.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parameter_results: Vec<ParameterResult>,
}

impl LabResult {
    pub fn new(parameter_results: Vec<ParameterResult>) -> Self {
        Self {
            id: None,
            parameter_results,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// A result is abnormal when any of its parameters is flagged.
    pub fn is_abnormal(&self) -> bool {
        self.parameter_results
            .iter()
            .any(|p| p.is_abnormal == Some(true))
    }
}

/// Numeric feature vector plus label derived from one historical result.
#[derive(Debug, Clone, PartialEq)]
pub struct LabSample {
    pub values: Vec<f64>,
    pub is_abnormal: bool,
}

/// Parse the leading number of a reading, e.g. `"12.5 mg/dL"` -> `12.5`.
///
/// Leading whitespace is skipped and the longest decimal literal (with an
/// optional exponent) is taken. Unparsable or non-finite values yield `None`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - (end + 1);
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric readings keyed by parameter name; the first numeric reading of a
/// parameter wins.
pub fn numeric_readings(params: &[ParameterResult]) -> HashMap<&str, f64> {
    let mut readings = HashMap::new();
    for param in params {
        if let Some(value) = param.numeric_value() {
            readings.entry(param.key()).or_insert(value);
        }
    }
    readings
}

/// Ordered feature columns learned from the training history.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    means: Vec<f64>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Keep the parameters (in first-seen order) reported numerically by at
    /// least `min_coverage` of the results that carry any numeric reading.
    pub fn infer(results: &[LabResult], min_coverage: f64) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<String, (usize, f64)> = HashMap::new();
        let mut usable = 0usize;

        for result in results {
            let readings = numeric_readings(&result.parameter_results);
            if readings.is_empty() {
                continue;
            }
            usable += 1;
            // Iterate the parameter list rather than the map to keep first-seen order.
            let mut counted = HashSet::new();
            for param in &result.parameter_results {
                let key = param.key();
                let Some(&value) = readings.get(key) else {
                    continue;
                };
                if !counted.insert(key) {
                    continue;
                }
                let entry = totals.entry(key.to_string()).or_insert_with(|| {
                    order.push(key.to_string());
                    (0, 0.0)
                });
                entry.0 += 1;
                entry.1 += value;
            }
        }

        let mut names = Vec::new();
        let mut means = Vec::new();
        for name in order {
            let (count, sum) = totals[&name];
            if usable > 0 && count as f64 / usable as f64 >= min_coverage {
                means.push(sum / count as f64);
                names.push(name);
            }
        }
        Self::new(names, means)
    }

    pub fn new(names: Vec<String>, means: Vec<f64>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            names,
            means,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name.trim()).copied()
    }

    /// Lay the numeric readings of `params` out against the schema.
    pub fn vectorize(
        &self,
        params: &[ParameterResult],
        policy: MissingValuePolicy,
    ) -> Result<Vec<f64>> {
        let readings = numeric_readings(params);
        if readings.is_empty() {
            return Err(AnomalyError::NoNumericData);
        }
        let ignored = readings
            .keys()
            .filter(|k| !self.index.contains_key(**k))
            .count();
        if ignored > 0 {
            log::debug!("Ignoring {} parameters outside the feature schema", ignored);
        }

        self.names
            .iter()
            .zip(self.means.iter())
            .map(|(name, &mean)| match (readings.get(name.as_str()), policy) {
                (Some(&value), _) => Ok(value),
                (None, MissingValuePolicy::ImputeMean) => Ok(mean),
                (None, MissingValuePolicy::Exclude) => {
                    Err(AnomalyError::MissingFeature(name.clone()))
                }
            })
            .collect()
    }

    fn covers_any(&self, params: &[ParameterResult]) -> bool {
        numeric_readings(params)
            .keys()
            .any(|k| self.index.contains_key(*k))
    }
}

/// Counts from one extraction pass over historical results.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub samples: Vec<LabSample>,
    /// Results without a single numeric reading.
    pub rejected: usize,
    /// Results dropped because they did not fit the schema.
    pub excluded: usize,
}

/// Turns lab results into aligned feature vectors.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    schema: FeatureSchema,
    policy: MissingValuePolicy,
}

impl FeatureExtractor {
    pub fn new(schema: FeatureSchema, policy: MissingValuePolicy) -> Self {
        Self { schema, policy }
    }

    /// Learn the schema from `results` and extract labelled samples from them.
    pub fn fit(results: &[LabResult], config: &FeatureConfig) -> (Self, ExtractionOutcome) {
        let schema = FeatureSchema::infer(results, config.min_parameter_coverage);
        let extractor = Self::new(schema, config.missing_values);
        let outcome = extractor.extract(results);
        (extractor, outcome)
    }

    /// Extract labelled samples, preserving input order.
    pub fn extract(&self, results: &[LabResult]) -> ExtractionOutcome {
        let mut samples = Vec::with_capacity(results.len());
        let mut rejected = 0;
        let mut excluded = 0;

        for result in results {
            let params = &result.parameter_results;
            if !self.schema.covers_any(params) {
                if numeric_readings(params).is_empty() {
                    rejected += 1;
                } else {
                    excluded += 1;
                }
                continue;
            }
            match self.schema.vectorize(params, self.policy) {
                Ok(values) => samples.push(LabSample {
                    values,
                    is_abnormal: result.is_abnormal(),
                }),
                Err(err) => {
                    log::trace!("Excluding result {:?}: {}", result.id, err);
                    excluded += 1;
                }
            }
        }

        ExtractionOutcome {
            samples,
            rejected,
            excluded,
        }
    }

    /// Feature vector for an unlabelled result.
    pub fn transform(&self, params: &[ParameterResult]) -> Result<Vec<f64>> {
        self.schema.vectorize(params, self.policy)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}
