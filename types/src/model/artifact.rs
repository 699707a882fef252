use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use eyre::{Result, WrapErr};
use log::info;
use serde::{Deserialize, Serialize};

use crate::model::{Classifier, LogisticRegression, RandomForest};
use crate::table::FeatureMatrix;

/// The serialized model file shared by the trainer and the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl ModelArtifact {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .wrap_err_with(|| format!("Failed to open model artifact {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("Failed to decode model artifact {}", path.display()))?;
        info!(
            "loaded {} model from {} ({} features)",
            artifact.kind(),
            path.display(),
            artifact.feature_names().len()
        );
        Ok(artifact)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = File::create(path)
            .wrap_err_with(|| format!("Failed to create model artifact {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        info!("saved {} model to {}", self.kind(), path.display());
        Ok(())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::RandomForest(_) => "random_forest",
            ModelArtifact::LogisticRegression(_) => "logistic_regression",
        }
    }

    fn classifier(&self) -> &dyn Classifier {
        match self {
            ModelArtifact::RandomForest(model) => model,
            ModelArtifact::LogisticRegression(model) => model,
        }
    }
}

impl Classifier for ModelArtifact {
    fn feature_names(&self) -> &[String] {
        self.classifier().feature_names()
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.classifier().predict_proba(features)
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u8>> {
        self.classifier().predict(features)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.classifier().feature_importances()
    }
}

impl From<RandomForest> for ModelArtifact {
    fn from(model: RandomForest) -> Self {
        ModelArtifact::RandomForest(model)
    }
}

impl From<LogisticRegression> for ModelArtifact {
    fn from(model: LogisticRegression) -> Self {
        ModelArtifact::LogisticRegression(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::separable;
    use crate::model::{ForestParams, LogisticParams};

    #[test]
    fn test_saved_artifact_loads_and_predicts_the_same() -> Result<()> {
        let (features, labels) = separable();
        let params = ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        };
        let artifact = ModelArtifact::from(RandomForest::fit(&features, &labels, &params)?);

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model").join("fraud_model.json");
        artifact.save(&path)?;
        let loaded = ModelArtifact::load(&path)?;

        assert_eq!(loaded.kind(), "random_forest");
        assert_eq!(loaded.feature_names(), artifact.feature_names());
        assert_eq!(loaded.predict(&features)?, artifact.predict(&features)?);
        assert!(loaded.feature_importances().is_some());
        Ok(())
    }

    #[test]
    fn test_logistic_artifact_is_tagged() -> Result<()> {
        let (features, labels) = separable();
        let artifact = ModelArtifact::from(LogisticRegression::fit(
            &features,
            &labels,
            &LogisticParams::default(),
        )?);
        let json = serde_json::to_value(&artifact)?;
        assert_eq!(json["kind"], "logistic_regression");
        assert!(artifact.feature_importances().is_none());
        Ok(())
    }

    #[test]
    fn test_missing_artifact_is_an_error() {
        assert!(ModelArtifact::load("does/not/exist.json").is_err());
    }
}
