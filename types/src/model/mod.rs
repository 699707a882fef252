//! Fraud classifiers: a bagged tree ensemble and a logistic baseline.
//!
//! Both are trained offline by the `trainer` crate and loaded by the service
//! through [`ModelArtifact`].

use eyre::{ensure, Result};

use crate::error::Error;
use crate::table::FeatureMatrix;

pub mod artifact;
pub mod forest;
pub mod logistic;
pub mod tree;

pub use artifact::ModelArtifact;
pub use forest::{ForestParams, RandomForest};
pub use logistic::{LogisticParams, LogisticRegression};

/// Probability above which a row is labelled fraud.
pub const DECISION_THRESHOLD: f64 = 0.5;

pub trait Classifier {
    /// Feature columns, in order, the model was trained on.
    fn feature_names(&self) -> &[String];

    /// Probability of the positive (fraud) class for each row.
    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| u8::from(p > DECISION_THRESHOLD))
            .collect())
    }

    /// Normalized per-feature importances, when the model has them.
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }

    fn check_schema(&self, features: &FeatureMatrix) -> Result<()> {
        ensure!(features.width() > 0, Error::NoNumericFeatures);
        ensure!(
            features.names.as_slice() == self.feature_names(),
            Error::FeatureMismatch {
                expected: self.feature_names().to_vec(),
                found: features.names.clone(),
            }
        );
        Ok(())
    }
}

/// `n_samples / (n_classes * count(class))` for classes 0 and 1.
pub fn balanced_class_weights(labels: &[u8]) -> Result<[f64; 2]> {
    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = labels.len() - positives;
    ensure!(positives > 0 && negatives > 0, Error::SingleClass);
    let n = labels.len() as f64;
    Ok([n / (2.0 * negatives as f64), n / (2.0 * positives as f64)])
}
