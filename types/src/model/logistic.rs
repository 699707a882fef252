use eyre::{ensure, Result};
use log::info;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{balanced_class_weights, Classifier};
use crate::table::FeatureMatrix;

#[derive(Debug, Clone)]
pub struct LogisticParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    pub balanced: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        LogisticParams {
            epochs: 300,
            learning_rate: 0.5,
            l2: 1e-4,
            balanced: true,
        }
    }
}

/// Logistic regression on standardized features, fitted by batch gradient
/// descent. Has no notion of feature importance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    pub fn fit(features: &FeatureMatrix, labels: &[u8], params: &LogisticParams) -> Result<Self> {
        ensure!(features.width() > 0, Error::NoNumericFeatures);
        ensure!(
            features.height() == labels.len(),
            "{} rows but {} labels",
            features.height(),
            labels.len()
        );
        ensure!(!labels.is_empty(), "no training rows");

        let class_weights = if params.balanced {
            balanced_class_weights(labels)?
        } else {
            [1.0, 1.0]
        };
        let n = features.height() as f64;
        let width = features.width();

        let mut means = vec![0.0; width];
        let mut scales = vec![0.0; width];
        for j in 0..width {
            let column = features.column(j);
            let mean = column.sum() / n;
            let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            means[j] = mean;
            scales[j] = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        }

        let mut model = LogisticRegression {
            feature_names: features.names.clone(),
            means,
            scales,
            coefficients: vec![0.0; width],
            intercept: 0.0,
        };
        let standardized: Vec<Vec<f64>> = features
            .values
            .rows()
            .into_iter()
            .map(|row| model.standardize(row))
            .collect();
        let total_weight: f64 = labels.iter().map(|&y| class_weights[usize::from(y)]).sum();

        for epoch in 0..params.epochs {
            let mut gradient = vec![0.0; width];
            let mut gradient_intercept = 0.0;
            for (row, &label) in standardized.iter().zip(labels) {
                let weight = class_weights[usize::from(label)];
                let error = weight * (model.score(row) - f64::from(label));
                gradient_intercept += error;
                for (g, x) in gradient.iter_mut().zip(row) {
                    *g += error * x;
                }
            }
            for (coefficient, g) in model.coefficients.iter_mut().zip(&gradient) {
                *coefficient -=
                    params.learning_rate * (g / total_weight + params.l2 * *coefficient);
            }
            model.intercept -= params.learning_rate * gradient_intercept / total_weight;
            if (epoch + 1) % 100 == 0 {
                info!("logistic regression epoch {}/{}", epoch + 1, params.epochs);
            }
        }
        Ok(model)
    }

    fn standardize(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }

    fn score(&self, standardized: &[f64]) -> f64 {
        let z: f64 = self
            .coefficients
            .iter()
            .zip(standardized)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }
}

impl Classifier for LogisticRegression {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.check_schema(features)?;
        Ok(features
            .values
            .rows()
            .into_iter()
            .map(|row| self.score(&self.standardize(row)))
            .collect())
    }
}
