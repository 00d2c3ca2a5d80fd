//! Integration tests for the Array1/Array2 containers and numeric helpers.

use meditrack_anomaly::math::{dot, euclidean_distance, mean, variance, Array1, Array2};

// ---------------------------------------------------------------------------
// Array1
// ---------------------------------------------------------------------------

#[test]
fn array1_select_keeps_requested_order() {
    let a = Array1::from_vec(vec![10, 20, 30, 40, 50]);
    assert_eq!(a.select(&[4, 0, 2]).to_vec(), vec![50, 10, 30]);
}

#[test]
fn array1_population_moments() {
    let a: Array1<f64> = Array1::from_vec(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    assert!((a.mean().unwrap() - 5.0).abs() < 1e-12);
    assert!((a.variance().unwrap() - 4.0).abs() < 1e-12);
}

#[test]
fn array1_moments_of_empty_are_none() {
    let a: Array1<f64> = Array1::from_vec(vec![]);
    assert!(a.mean().is_none());
    assert!(a.variance().is_none());
}

#[test]
fn array1_display() {
    let a = Array1::from_vec(vec![true, false]);
    assert_eq!(a.to_string(), "[true, false]");
}

#[test]
fn array1_collects_from_iterator() {
    let a: Array1<bool> = (0..4).map(|i| i % 2 == 0).collect();
    assert_eq!(a.len(), 4);
    assert!(a[0]);
    assert!(!a[1]);
}

// ---------------------------------------------------------------------------
// Array2
// ---------------------------------------------------------------------------

#[test]
fn array2_shape_mismatch_errors() {
    assert!(Array2::from_shape_vec((2, 3), vec![1.0; 5]).is_err());
}

#[test]
fn array2_rows_and_columns() {
    let m = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(m.shape(), (2, 3));
    assert_eq!(m.row_slice(1), &[4.0, 5.0, 6.0]);
    assert_eq!(m.column(2).to_vec(), vec![3.0, 6.0]);
    assert_eq!(m[(0, 1)], 2.0);
    assert_eq!(m.rows().count(), 2);
}

#[test]
fn array2_select_rows() {
    let m = Array2::from_shape_fn((4, 2), |r, c| (r * 10 + c) as f64);
    let picked = m.select_rows(&[3, 1]);
    assert_eq!(picked.shape(), (2, 2));
    assert_eq!(picked.row_slice(0), &[30.0, 31.0]);
    assert_eq!(picked.row_slice(1), &[10.0, 11.0]);
}

#[test]
fn array2_from_rows_rejects_ragged_input() {
    let ok = Array2::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    assert_eq!(ok.shape(), (2, 2));
    // Lengths sum to a valid 2x2 buffer but the rows are ragged.
    assert!(Array2::from_rows(&[vec![1.0], vec![2.0, 3.0, 4.0]]).is_err());
}

// ---------------------------------------------------------------------------
// Slice helpers
// ---------------------------------------------------------------------------

#[test]
fn slice_helpers() {
    assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
    assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    assert_eq!(mean(&[1.0, 3.0]), Some(2.0));
    assert_eq!(variance(&[1.0, 3.0]), Some(1.0));
}
