//! Long-format lab result reader.
//!
//! One row per parameter reading, grouped into lab results by `result_id`:
//!
//! ```text
//! result_id  parameter   value       is_abnormal
//! R1         Glucose     5.4 mmol/L  false
//! R1         Sodium      141
//! R2         Glucose     13.2        true
//! ```
use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;

use crate::features::{LabResult, ParameterResult, ParameterValue};

const RESULT_ID_COLUMN: &str = "result_id";
const PARAMETER_COLUMN: &str = "parameter";
const VALUE_COLUMN: &str = "value";
const FLAG_COLUMN: &str = "is_abnormal";

/// Read a tab-separated (or `.csv`, comma-separated) lab result file.
pub fn read_lab_results<P: AsRef<Path>>(path: P) -> Result<Vec<LabResult>> {
    let path = path.as_ref();
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open lab result file: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read lab result header row")?
        .clone();

    let id_idx = require_column(&headers, RESULT_ID_COLUMN)?;
    let param_idx = require_column(&headers, PARAMETER_COLUMN)?;
    let value_idx = require_column(&headers, VALUE_COLUMN)?;
    let flag_idx = find_column(&headers, FLAG_COLUMN);

    let mut results: Vec<LabResult> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for (row_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let id = record.get(id_idx).unwrap_or_default().trim();
        if id.is_empty() {
            return Err(anyhow!("Missing {} at row {}", RESULT_ID_COLUMN, row_idx + 1));
        }

        let value = record.get(value_idx).unwrap_or_default().trim();
        let is_abnormal = match flag_idx.and_then(|idx| record.get(idx)) {
            Some(raw) => parse_flag(raw)
                .with_context(|| format!("Invalid {} at row {}", FLAG_COLUMN, row_idx + 1))?,
            None => None,
        };

        let reading = ParameterResult {
            parameter_name: record.get(param_idx).unwrap_or_default().trim().to_string(),
            value: (!value.is_empty()).then(|| ParameterValue::from(value)),
            is_abnormal,
        };

        let slot = *by_id.entry(id.to_string()).or_insert_with(|| {
            results.push(LabResult::default().with_id(id));
            results.len() - 1
        });
        results[slot].parameter_results.push(reading);
    }

    log::debug!(
        "Read {} lab results from {}",
        results.len(),
        path.display()
    );
    Ok(results)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}

fn require_column(headers: &StringRecord, name: &str) -> Result<usize> {
    find_column(headers, name).ok_or_else(|| anyhow!("Missing column '{}'", name))
}

fn parse_flag(raw: &str) -> Result<Option<bool>> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        other => Err(anyhow!("expected true/false, got '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag(" YES ").unwrap(), Some(true));
        assert_eq!(parse_flag("0").unwrap(), Some(false));
        assert_eq!(parse_flag("").unwrap(), None);
        assert!(parse_flag("maybe").is_err());
    }
}
