//! Integration tests for the individual ensemble members.

use meditrack_anomaly::config::{EngineConfig, ModelName};
use meditrack_anomaly::math::{Array1, Array2};
use meditrack_anomaly::models::bayes::BayesClassifier;
use meditrack_anomaly::models::factory::build_model;
use meditrack_anomaly::models::knn::KnnClassifier;
use meditrack_anomaly::models::neural::RandomProjectionClassifier;
use meditrack_anomaly::models::svm::SvmClassifier;
use meditrack_anomaly::models::threshold::ThresholdClassifier;
use meditrack_anomaly::{AnomalyError, Classifier, Prediction};

/// Every third sample abnormal with all values above 100, the rest below 10.
fn separable() -> (Array2<f64>, Array1<bool>) {
    let n = 20;
    let x = Array2::from_shape_fn((n, 4), |i, j| {
        if i % 3 == 0 {
            (101 + (i * 7 + j * 13) % 50) as f64
        } else {
            (1 + (i * 5 + j * 3) % 9) as f64
        }
    });
    let y = (0..n).map(|i| i % 3 == 0).collect();
    (x, y)
}

fn accuracy(model: &dyn Classifier, x: &Array2<f64>, y: &Array1<bool>) -> f64 {
    let correct = model
        .predict_batch(x)
        .unwrap()
        .iter()
        .zip(y.iter())
        .filter(|&(p, &label)| p.is_abnormal() == label)
        .count();
    correct as f64 / y.len() as f64
}

// ---------------------------------------------------------------------------
// Shared contract
// ---------------------------------------------------------------------------

#[test]
fn untrained_models_predict_normal_with_zero_confidence() {
    for config in EngineConfig::default().models {
        let model = build_model(&config);
        assert_eq!(model.name(), config.name());
        assert!(!model.is_trained());
        assert_eq!(model.n_features(), None);
        assert_eq!(
            model.predict(&[1.0, 2.0, 3.0, 4.0]).unwrap(),
            Prediction::untrained()
        );
    }
}

#[test]
fn fitted_models_report_their_width() {
    let (x, y) = separable();
    for config in EngineConfig::default().with_seed(1).models {
        let mut model = build_model(&config);
        model.fit(&x, &y).unwrap();
        assert!(model.is_trained(), "{} should be trained", model.name());
        assert_eq!(model.n_features(), Some(4));
        for p in model.predict_batch(&x).unwrap() {
            assert!(p.prediction <= 1);
            assert!((0.0..=1.0).contains(&p.confidence));
        }
    }
}

#[test]
fn fitted_models_reject_samples_of_another_width() {
    let (x, y) = separable();
    for config in EngineConfig::default().with_seed(1).models {
        let mut model = build_model(&config);
        model.fit(&x, &y).unwrap();
        for sample in [&[100.0, 100.0][..], &[1000.0][..], &[1.0; 6][..]] {
            assert_eq!(
                model.predict(sample),
                Err(AnomalyError::DimensionMismatch {
                    expected: 4,
                    found: sample.len()
                }),
                "{} accepted a sample of width {}",
                model.name(),
                sample.len()
            );
        }
        let wide = Array2::from_shape_fn((2, 5), |_, _| 1.0);
        assert!(model.predict_batch(&wide).is_err());
    }
}

#[test]
fn label_count_mismatch_is_rejected() {
    let (x, _) = separable();
    let y = Array1::from_vec(vec![true; 3]);
    let mut model = build_model(&EngineConfig::default().models[0]);
    assert_eq!(
        model.fit(&x, &y),
        Err(AnomalyError::DimensionMismatch {
            expected: 20,
            found: 3
        })
    );
}

// ---------------------------------------------------------------------------
// k-nearest neighbours
// ---------------------------------------------------------------------------

#[test]
fn knn_with_k1_returns_label_of_identical_sample() {
    let (x, y) = separable();
    let mut knn = KnnClassifier::new(1);
    knn.fit(&x, &y).unwrap();
    for (row, &label) in x.rows().zip(y.iter()) {
        let p = knn.predict(row).unwrap();
        assert_eq!(p.is_abnormal(), label);
        assert_eq!(p.confidence, 1.0);
    }
}

// ---------------------------------------------------------------------------
// z-score outlier rule
// ---------------------------------------------------------------------------

#[test]
fn threshold_at_training_mean_is_normal() {
    let (x, y) = separable();
    let mut model = ThresholdClassifier::new(2.0, 0.3, 1.0);
    model.fit(&x, &y).unwrap();
    let centre = model.means().to_vec();
    assert_eq!(model.outlier_fraction_of(&centre), 0.0);
    let p = model.predict(&centre).unwrap();
    assert_eq!(p.prediction, 0);
    assert_eq!(p.confidence, 0.0);
}

#[test]
fn threshold_flags_far_outliers() {
    let (x, y) = separable();
    let mut model = ThresholdClassifier::new(2.0, 0.3, 1.0);
    model.fit(&x, &y).unwrap();
    let p = model.predict(&[1000.0; 4]).unwrap();
    assert_eq!(p.prediction, 1);
    assert_eq!(p.confidence, 1.0);
}

#[test]
fn threshold_constant_feature_uses_unit_deviation() {
    let x = Array2::from_shape_vec((3, 1), vec![5.0, 5.0, 5.0]).unwrap();
    let y = Array1::from_vec(vec![false; 3]);
    let mut model = ThresholdClassifier::new(2.0, 0.3, 1.0);
    model.fit(&x, &y).unwrap();
    assert_eq!(model.predict(&[5.0]).unwrap().prediction, 0);
    assert_eq!(model.predict(&[5.001]).unwrap().prediction, 0);
    assert_eq!(model.predict(&[6.9]).unwrap().prediction, 0);
    assert_eq!(model.predict(&[8.0]).unwrap().prediction, 1);
}

// ---------------------------------------------------------------------------
// Gaussian naive Bayes
// ---------------------------------------------------------------------------

#[test]
fn bayes_priors_and_posteriors_sum_to_one() {
    let (x, y) = separable();
    let mut nb = BayesClassifier::new(1.0);
    nb.fit(&x, &y).unwrap();

    let (normal, abnormal) = nb.priors();
    assert!((normal + abnormal - 1.0).abs() < 1e-12);
    assert!((abnormal - 7.0 / 20.0).abs() < 1e-12);

    for sample in [[0.0; 4], [5.0; 4], [60.0; 4], [120.0; 4], [1e5; 4]] {
        let post = nb.posterior(&sample).unwrap();
        assert!((post.normal + post.abnormal - 1.0).abs() < 1e-9);
    }
}

#[test]
fn bayes_separates_the_classes() {
    let (x, y) = separable();
    let mut nb = BayesClassifier::new(1.0);
    nb.fit(&x, &y).unwrap();
    assert_eq!(accuracy(&nb, &x, &y), 1.0);
}

#[test]
fn bayes_constant_class_feature_uses_unit_variance() {
    let x = Array2::from_shape_vec((6, 1), vec![100.0, 95.0, 100.0, 100.0, 105.0, 100.0]).unwrap();
    let y = Array1::from_vec(vec![true, false, true, false, false, true]);
    let mut nb = BayesClassifier::new(1.0);
    nb.fit(&x, &y).unwrap();

    // Normal class variance is 50/3; the constant abnormal class gets 1.0.
    let post = nb.posterior(&[100.01]).unwrap();
    assert!(post.abnormal > 0.5 && post.abnormal < 1.0);
    assert!(post.normal > 0.0);
    let expected = 1.0 / (1.0 + (-0.5 * (50.0f64 / 3.0).ln()).exp());
    assert!((post.abnormal - expected).abs() < 1e-3);
}

// ---------------------------------------------------------------------------
// Linear SVM
// ---------------------------------------------------------------------------

#[test]
fn svm_reaches_full_training_accuracy_on_separable_data() {
    let (x, y) = separable();
    let mut svm = SvmClassifier::new(0.01, 100);
    svm.fit(&x, &y).unwrap();
    assert_eq!(accuracy(&svm, &x, &y), 1.0);
}

#[test]
fn svm_training_is_deterministic() {
    let (x, y) = separable();
    let mut a = SvmClassifier::new(0.01, 100);
    let mut b = SvmClassifier::new(0.01, 100);
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();
    assert_eq!(a.weights(), b.weights());
    assert_eq!(a.bias(), b.bias());
}

// ---------------------------------------------------------------------------
// Random-projection network
// ---------------------------------------------------------------------------

#[test]
fn seeded_network_is_reproducible() {
    let (x, y) = separable();
    let mut a = RandomProjectionClassifier::new(10, 0.01, 100, Some(42));
    let mut b = RandomProjectionClassifier::new(10, 0.01, 100, Some(42));
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();
    assert_eq!(a.predict_batch(&x).unwrap(), b.predict_batch(&x).unwrap());
    assert_eq!(a.name(), ModelName::NeuralNetwork);
}

#[test]
fn network_confidence_is_its_output() {
    let (x, y) = separable();
    let mut nn = RandomProjectionClassifier::new(10, 0.01, 20, Some(5));
    nn.fit(&x, &y).unwrap();
    let row = x.row_slice(0);
    let out = nn.forward(row).unwrap();
    let p = nn.predict(row).unwrap();
    assert_eq!(p.confidence, out);
    assert_eq!(p.is_abnormal(), out > 0.5);
}
