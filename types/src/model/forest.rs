use eyre::{ensure, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::tree::{DecisionTree, TreeParams};
use crate::model::{balanced_class_weights, Classifier};
use crate::table::FeatureMatrix;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Reweight classes inversely to their frequency.
    pub balanced: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            balanced: true,
            seed: 42,
        }
    }
}

/// Bagged decision trees; the forest probability is the mean tree probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
    pub feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn fit(features: &FeatureMatrix, labels: &[u8], params: &ForestParams) -> Result<Self> {
        ensure!(features.width() > 0, Error::NoNumericFeatures);
        ensure!(
            features.height() == labels.len(),
            "{} rows but {} labels",
            features.height(),
            labels.len()
        );
        ensure!(!labels.is_empty(), "no training rows");
        ensure!(params.n_estimators > 0, "n_estimators must be positive");

        let class_weights = if params.balanced {
            balanced_class_weights(labels)?
        } else {
            [1.0, 1.0]
        };
        let weights: Vec<f64> = labels
            .iter()
            .map(|&y| class_weights[usize::from(y)])
            .collect();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            max_features: ((features.width() as f64).sqrt() as usize).max(1),
        };

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = features.height();
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut importances = vec![0.0; features.width()];

        for t in 0..params.n_estimators {
            let mut tree_rng = StdRng::seed_from_u64(rng.gen());
            let bootstrap: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
            let (tree, raw) = DecisionTree::fit(
                features,
                labels,
                &weights,
                bootstrap,
                &tree_params,
                &mut tree_rng,
            );
            let total: f64 = raw.iter().sum();
            if total > 0.0 {
                for (acc, value) in importances.iter_mut().zip(&raw) {
                    *acc += value / total;
                }
            }
            debug!("tree {} grown: {} nodes", t + 1, tree.nodes.len());
            if (t + 1) % 10 == 0 {
                info!("grown {}/{} trees", t + 1, params.n_estimators);
            }
            trees.push(tree);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        Ok(RandomForest {
            feature_names: features.names.clone(),
            trees,
            feature_importances: importances,
        })
    }
}

impl Classifier for RandomForest {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.check_schema(features)?;
        let n_trees = self.trees.len() as f64;
        Ok(features
            .values
            .rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        Some(&self.feature_importances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::separable;

    fn small() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_forest_learns_separable_data() -> Result<()> {
        let (features, labels) = separable();
        let forest = RandomForest::fit(&features, &labels, &small())?;
        let predicted = forest.predict(&features)?;
        let correct = predicted.iter().zip(&labels).filter(|(p, y)| p == y).count();
        assert!(correct >= 57, "only {} of 60 correct", correct);
        Ok(())
    }

    #[test]
    fn test_importances_are_normalized_and_rank_signal_first() -> Result<()> {
        let (features, labels) = separable();
        let forest = RandomForest::fit(&features, &labels, &small())?;
        let importances = forest.feature_importances().unwrap();
        let total: f64 = importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);
        Ok(())
    }

    #[test]
    fn test_same_seed_same_forest() -> Result<()> {
        let (features, labels) = separable();
        let a = RandomForest::fit(&features, &labels, &small())?;
        let b = RandomForest::fit(&features, &labels, &small())?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_labels_agree_with_probabilities() -> Result<()> {
        let (features, labels) = separable();
        let forest = RandomForest::fit(&features, &labels, &small())?;
        let proba = forest.predict_proba(&features)?;
        let predicted = forest.predict(&features)?;
        for (p, label) in proba.iter().zip(predicted) {
            assert!((0.0..=1.0).contains(p));
            assert_eq!(label, u8::from(*p > 0.5));
        }
        Ok(())
    }

    #[test]
    fn test_reordered_columns_are_a_mismatch() -> Result<()> {
        let (features, labels) = separable();
        let forest = RandomForest::fit(&features, &labels, &small())?;
        let swapped = features.select_columns(&[1, 0]);
        let err = forest.predict_proba(&swapped).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::FeatureMismatch { .. })
        ));
        Ok(())
    }
}
