use crate::config::ModelName;
use crate::error::Result;
use crate::math::{Array1, Array2};
use crate::models::classifier_trait::{
    check_sample_width, check_training_shape, Classifier, Prediction,
};
use crate::stats::{FeatureStats, GaussianProfile};

/// Class posteriors for one sample; the two values sum to one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPosterior {
    pub normal: f64,
    pub abnormal: f64,
}

struct ClassModel {
    prior: f64,
    profile: GaussianProfile,
}

/// Gaussian naive Bayes over the two result classes.
///
/// Scores are combined in log space and normalised with log-sum-exp, which
/// keeps the posterior finite when many per-feature densities are multiplied.
/// A class without training samples has prior 0 and never wins. A feature
/// that is constant within a class uses `zero_variance_fallback`.
pub struct BayesClassifier {
    zero_variance_fallback: f64,
    normal: Option<ClassModel>,
    abnormal: Option<ClassModel>,
    n_features: Option<usize>,
}

impl BayesClassifier {
    pub fn new(zero_variance_fallback: f64) -> Self {
        BayesClassifier {
            zero_variance_fallback,
            normal: None,
            abnormal: None,
            n_features: None,
        }
    }

    /// Prior probabilities `(normal, abnormal)` learned from class frequencies.
    pub fn priors(&self) -> (f64, f64) {
        let prior = |class: &Option<ClassModel>| class.as_ref().map_or(0.0, |c| c.prior);
        (prior(&self.normal), prior(&self.abnormal))
    }

    pub fn posterior(&self, x: &[f64]) -> Option<ClassPosterior> {
        let score = |class: &Option<ClassModel>| {
            class
                .as_ref()
                .map(|c| c.prior.ln() + c.profile.log_likelihood(x))
        };
        match (score(&self.normal), score(&self.abnormal)) {
            (Some(n), Some(a)) => {
                let max = n.max(a);
                if !max.is_finite() {
                    // Both likelihoods vanished; fall back to the priors.
                    let (pn, pa) = self.priors();
                    return Some(ClassPosterior {
                        normal: pn,
                        abnormal: pa,
                    });
                }
                let en = (n - max).exp();
                let ea = (a - max).exp();
                Some(ClassPosterior {
                    normal: en / (en + ea),
                    abnormal: ea / (en + ea),
                })
            }
            (Some(_), None) => Some(ClassPosterior {
                normal: 1.0,
                abnormal: 0.0,
            }),
            (None, Some(_)) => Some(ClassPosterior {
                normal: 0.0,
                abnormal: 1.0,
            }),
            (None, None) => None,
        }
    }

    fn class_model(&self, x: &Array2<f64>, rows: &[usize], total: usize) -> Result<Option<ClassModel>> {
        if rows.is_empty() {
            return Ok(None);
        }
        let stats = FeatureStats::from_rows(&x.select_rows(rows));
        Ok(Some(ClassModel {
            prior: rows.len() as f64 / total as f64,
            profile: GaussianProfile::new(&stats, self.zero_variance_fallback)?,
        }))
    }
}

impl Classifier for BayesClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<bool>) -> Result<()> {
        check_training_shape(x, y)?;
        let (abnormal_rows, normal_rows): (Vec<usize>, Vec<usize>) =
            (0..y.len()).partition(|&i| y[i]);

        self.normal = self.class_model(x, &normal_rows, y.len())?;
        self.abnormal = self.class_model(x, &abnormal_rows, y.len())?;
        self.n_features = Some(x.ncols());
        log::trace!(
            "bayesian: priors normal={:.3} abnormal={:.3}",
            self.priors().0,
            self.priors().1
        );
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> Result<Prediction> {
        let Some(width) = self.n_features.filter(|_| self.is_trained()) else {
            return Ok(Prediction::untrained());
        };
        check_sample_width(width, x)?;
        Ok(match self.posterior(x) {
            Some(post) => Prediction::new(post.abnormal > 0.5, post.abnormal),
            None => Prediction::untrained(),
        })
    }

    fn name(&self) -> ModelName {
        ModelName::Bayesian
    }

    fn is_trained(&self) -> bool {
        self.normal.is_some() || self.abnormal.is_some()
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}
