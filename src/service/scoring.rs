use eyre::{ensure, Result};
use log::debug;

use types::error::Error;
use types::model::Classifier;
use types::table::{FeatureMatrix, Table};

/// Ground-truth column; never shown to the model.
pub const LABEL_COLUMN: &str = "Class";
pub const PROBABILITY_COLUMN: &str = "fraud_probability";
pub const PREDICTION_COLUMN: &str = "predicted_fraud";

#[derive(Debug, Clone)]
pub struct ScoredUpload {
    /// The uploaded table with the two prediction columns appended.
    pub table: Table,
    /// Exactly what the model saw.
    pub features: FeatureMatrix,
    pub probabilities: Vec<f64>,
    pub predictions: Vec<u8>,
}

/// Drops the label, zero-fills missing cells, keeps numeric columns, scores
/// them, and appends the results to a copy of the upload.
pub fn score<C: Classifier + ?Sized>(upload: &Table, model: &C) -> Result<ScoredUpload> {
    ensure!(upload.width() > 0 && upload.height() > 0, Error::EmptyUpload);

    let features = upload.feature_matrix(LABEL_COLUMN);
    model.check_schema(&features)?;
    debug!(
        "scoring {} rows over {} features",
        features.height(),
        features.width()
    );

    let probabilities = model.predict_proba(&features)?;
    let predictions = model.predict(&features)?;

    let mut table = upload.clone();
    table.push_column(
        PROBABILITY_COLUMN,
        probabilities.iter().map(|p| p.to_string()).collect(),
    )?;
    table.push_column(
        PREDICTION_COLUMN,
        predictions.iter().map(|p| p.to_string()).collect(),
    )?;

    Ok(ScoredUpload {
        table,
        features,
        probabilities,
        predictions,
    })
}
