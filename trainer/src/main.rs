//! Offline training for the fraud scan service.
//!
//! Reads a labeled transactions CSV, holds out a stratified test split, fits a
//! classifier on the rest, prints a classification report for the held-out
//! rows, and writes the model artifact the service loads at startup.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use eyre::{Result, WrapErr};
use log::info;

use types::model::{
    Classifier, ForestParams, LogisticParams, LogisticRegression, ModelArtifact, RandomForest,
};
use types::table::Table;

use crate::evaluation::ClassificationReport;
use crate::split::stratified_split;

mod evaluation;
mod split;

const LABEL_COLUMN: &str = "Class";

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum ModelKind {
    /// Random forest with feature importances
    Forest,
    /// Logistic regression, no feature importances
    Logistic,
}

/// Train the fraud classifier and save it for the service
#[derive(Parser, Debug)]
#[command(name = "trainer", version, about, long_about = None)]
struct Cli {
    /// Labeled dataset with a 0/1 `Class` column
    #[arg(long, default_value = "dataset/creditcard.csv")]
    dataset: PathBuf,
    /// Where to write the model artifact
    #[arg(long, env = "FRAUD_MODEL_PATH", default_value = "model/fraud_model.json")]
    output: PathBuf,
    #[arg(long, value_enum, default_value_t = ModelKind::Forest)]
    model: ModelKind,
    /// Share of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    trees: usize,
    /// Maximum tree depth; unlimited when omitted
    #[arg(long)]
    max_depth: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let report = train(&cli)?;
    println!("Classification Report:\n{}", report);
    println!("Model saved to {}", cli.output.display());
    Ok(())
}

fn fit(cli: &Cli, table: &Table) -> Result<(ModelArtifact, ClassificationReport)> {
    let features = table.feature_matrix(LABEL_COLUMN);
    let labels = table.binary_column(LABEL_COLUMN)?;
    let split = stratified_split(&labels, cli.test_fraction, cli.seed)?;
    info!(
        "{} training rows, {} test rows, {} features",
        split.train.len(),
        split.test.len(),
        features.width()
    );

    let train_features = features.select_rows(&split.train);
    let train_labels: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();
    let model: ModelArtifact = match cli.model {
        ModelKind::Forest => {
            let params = ForestParams {
                n_estimators: cli.trees,
                max_depth: cli.max_depth,
                seed: cli.seed,
                ..ForestParams::default()
            };
            RandomForest::fit(&train_features, &train_labels, &params)?.into()
        }
        ModelKind::Logistic => {
            LogisticRegression::fit(&train_features, &train_labels, &LogisticParams::default())?
                .into()
        }
    };
    info!("{} model trained", model.kind());

    let test_labels: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();
    let predicted = model.predict(&features.select_rows(&split.test))?;
    Ok((model, ClassificationReport::new(&test_labels, &predicted)))
}

fn train(cli: &Cli) -> Result<ClassificationReport> {
    let table = Table::from_path(&cli.dataset)
        .wrap_err_with(|| format!("Failed to load dataset {}", cli.dataset.display()))?;
    info!(
        "dataset loaded: {} rows x {} columns",
        table.height(),
        table.width()
    );
    let (model, report) = fit(cli, &table)?;
    model.save(&cli.output)?;
    Ok(report)
}
