//! Tests for loading long-format lab result files.

use std::io::Write;

use meditrack_anomaly::features::ParameterValue;
use meditrack_anomaly::io::lab_results::read_lab_results;

fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn groups_rows_by_result_in_first_seen_order() {
    let file = write_file(
        ".tsv",
        "result_id\tparameter\tvalue\tis_abnormal\n\
         R2\tGlucose\t13.2 mmol/L\ttrue\n\
         R1\tGlucose\t5.4\tfalse\n\
         R2\tSodium\t141\t\n\
         R1\tCulture\tnegative\tno\n",
    );
    let results = read_lab_results(file.path()).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id.as_deref(), Some("R2"));
    assert_eq!(results[1].id.as_deref(), Some("R1"));

    let r2 = &results[0].parameter_results;
    assert_eq!(r2.len(), 2);
    assert_eq!(r2[0].parameter_name, "Glucose");
    assert_eq!(r2[0].numeric_value(), Some(13.2));
    assert_eq!(r2[0].is_abnormal, Some(true));
    assert_eq!(r2[1].is_abnormal, None);
    assert!(results[0].is_abnormal());

    let r1 = &results[1].parameter_results;
    assert_eq!(r1[1].value, Some(ParameterValue::Text("negative".into())));
    assert_eq!(r1[1].is_abnormal, Some(false));
    assert!(!results[1].is_abnormal());
}

#[test]
fn csv_extension_switches_delimiter() {
    let file = write_file(
        ".csv",
        "Result_ID,Parameter,Value\nA,Potassium,4.1\nA,Chloride,\n",
    );
    let results = read_lab_results(file.path()).unwrap();
    assert_eq!(results.len(), 1);
    let params = &results[0].parameter_results;
    assert_eq!(params[0].numeric_value(), Some(4.1));
    assert_eq!(params[1].value, None);
    assert_eq!(params[1].is_abnormal, None);
}

#[test]
fn missing_required_column_is_an_error() {
    let file = write_file(".tsv", "result_id\tvalue\nA\t1\n");
    let err = read_lab_results(file.path()).unwrap_err();
    assert!(err.to_string().contains("parameter"));
}

#[test]
fn bad_flag_is_an_error() {
    let file = write_file(".tsv", "result_id\tparameter\tvalue\tis_abnormal\nA\tK\t4\tmaybe\n");
    assert!(read_lab_results(file.path()).is_err());
}

#[test]
fn missing_file_is_an_error() {
    assert!(read_lab_results("/nonexistent/lab_results.tsv").is_err());
}
