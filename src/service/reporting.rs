use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use eyre::Result;
use itertools::Itertools;

use types::model::Classifier;
use types::table::{FeatureMatrix, Table};

use crate::domain::report::{
    Charts, ClassCount, CorrelationHeatmap, Download, FeatureImportance, Report, TablePreview,
};
use crate::service::charts;
use crate::service::scoring::{ScoredUpload, PREDICTION_COLUMN, PROBABILITY_COLUMN};

pub const TOP_N: usize = 10;
pub const PREVIEW_ROWS: usize = 5;
pub const DOWNLOAD_FILE_NAME: &str = "fraud_output.csv";
pub const NO_IMPORTANCE_NOTICE: &str =
    "Model does not support feature importances (e.g., Logistic Regression).";

/// Count and share per distinct predicted label, ascending by label.
pub fn class_counts(predictions: &[u8]) -> Vec<ClassCount> {
    let total = predictions.len() as f64;
    predictions
        .iter()
        .counts()
        .into_iter()
        .sorted_by_key(|(label, _)| **label)
        .map(|(label, count)| ClassCount {
            label: *label,
            count,
            share: count as f64 / total,
        })
        .collect()
}

/// Pairwise correlations of the `TOP_N` columns with the largest summed
/// absolute correlation. `None` below `TOP_N` columns.
pub fn top_correlations(features: &FeatureMatrix) -> Option<CorrelationHeatmap> {
    if features.width() < TOP_N {
        return None;
    }
    let full = features.correlation();
    let scores: Vec<f64> = full
        .rows()
        .into_iter()
        .map(|row| row.iter().filter(|r| !r.is_nan()).map(|r| r.abs()).sum())
        .collect();
    let top: Vec<usize> = (0..features.width())
        .sorted_by(|&a, &b| scores[b].total_cmp(&scores[a]))
        .take(TOP_N)
        .collect();

    Some(CorrelationHeatmap {
        columns: top.iter().map(|&i| features.names[i].clone()).collect(),
        matrix: top
            .iter()
            .map(|&a| {
                top.iter()
                    .map(|&b| Some(full[[a, b]]).filter(|r| !r.is_nan()))
                    .collect()
            })
            .collect(),
    })
}

/// Top `TOP_N` features by importance, descending.
pub fn top_importances<C: Classifier + ?Sized>(model: &C) -> Option<Vec<FeatureImportance>> {
    let importances = model.feature_importances()?;
    Some(
        model
            .feature_names()
            .iter()
            .zip(importances)
            .sorted_by(|a, b| b.1.total_cmp(a.1))
            .take(TOP_N)
            .map(|(feature, importance)| FeatureImportance {
                feature: feature.clone(),
                importance: *importance,
            })
            .collect(),
    )
}

pub fn download_link(table: &Table) -> Result<Download> {
    let encoded = STANDARD.encode(table.to_csv_bytes()?);
    Ok(Download {
        file_name: DOWNLOAD_FILE_NAME.to_string(),
        href: format!("data:file/csv;base64,{}", encoded),
    })
}

pub fn build_report<C: Classifier + ?Sized>(
    upload: &Table,
    scored: &ScoredUpload,
    model: &C,
) -> Result<Report> {
    let class_counts = class_counts(&scored.predictions);
    let correlation = top_correlations(&scored.features);
    let importances = top_importances(model);

    let mut notices = Vec::new();
    if importances.is_none() {
        notices.push(NO_IMPORTANCE_NOTICE.to_string());
    }

    let charts = Charts {
        histogram: charts::class_histogram(&class_counts)?,
        pie: charts::class_pie(&class_counts)?,
        heatmap: correlation
            .as_ref()
            .map(charts::correlation_heatmap)
            .transpose()?,
        importance: importances
            .as_deref()
            .map(charts::importance_bars)
            .transpose()?,
    };

    let predictions = scored
        .table
        .select(&[PROBABILITY_COLUMN, PREDICTION_COLUMN])?;

    Ok(Report {
        uploaded: TablePreview::of(upload, PREVIEW_ROWS),
        predictions: TablePreview::of(&predictions, PREVIEW_ROWS),
        class_counts,
        correlation,
        importances,
        notices,
        charts,
        download: download_link(&scored.table)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::service::scoring::score;
    use crate::service::scoring::tests::RecordingModel;

    /// `width` numeric columns named `f0..`, each a different function of the row index.
    fn wide_upload(width: usize, rows: usize) -> Table {
        let columns = (0..width).map(|j| format!("f{}", j)).collect();
        let rows = (0..rows)
            .map(|i| {
                (0..width)
                    .map(|j| (((i * (j + 3)) % (j + 7)) as f64 + i as f64 * 0.1).to_string())
                    .collect()
            })
            .collect();
        Table::new(columns, rows).unwrap()
    }

    struct RankedModel {
        names: Vec<String>,
        importances: Vec<f64>,
    }

    impl Classifier for RankedModel {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
            Ok(vec![0.25; features.height()])
        }

        fn feature_importances(&self) -> Option<&[f64]> {
            Some(&self.importances)
        }
    }

    #[rstest]
    #[case(9, false)]
    #[case(10, true)]
    #[case(12, true)]
    fn test_heatmap_needs_ten_features(#[case] width: usize, #[case] expected: bool) -> Result<()> {
        let upload = wide_upload(width, 30);
        let names: Vec<String> = upload.columns.clone();
        let model = RecordingModel::new(&names.iter().map(String::as_str).collect::<Vec<_>>());
        let scored = score(&upload, &model)?;
        let report = build_report(&upload, &scored, &model)?;

        assert_eq!(report.correlation.is_some(), expected);
        assert_eq!(report.charts.heatmap.is_some(), expected);
        if let Some(heatmap) = report.correlation {
            assert_eq!(heatmap.columns.len(), TOP_N);
            assert_eq!(heatmap.matrix.len(), TOP_N);
            assert!(heatmap.matrix.iter().all(|row| row.len() == TOP_N));
        }
        Ok(())
    }

    #[test]
    fn test_top_correlations_pick_highest_summed_scores() {
        // f10 and f11 are constant, so they score lowest and are left out.
        let mut rows = Vec::new();
        for i in 0..20 {
            let x = i as f64;
            let mut row: Vec<f64> = (0..10).map(|j| x * (j + 1) as f64 + ((i * j) % 3) as f64).collect();
            row.push(1.0);
            row.push(1.0);
            rows.push(row);
        }
        let names = (0..12).map(|j| format!("f{}", j)).collect();
        let features = FeatureMatrix::new(names, rows).unwrap();

        let heatmap = top_correlations(&features).unwrap();
        assert!(!heatmap.columns.contains(&"f10".to_string()));
        assert!(!heatmap.columns.contains(&"f11".to_string()));
        for (i, row) in heatmap.matrix.iter().enumerate() {
            assert_eq!(row[i], Some(1.0));
        }
    }

    #[test]
    fn test_constant_column_correlations_are_none() {
        let mut rows = Vec::new();
        for i in 0..5 {
            let mut row: Vec<f64> = (0..10).map(|j| (i * (j + 1)) as f64).collect();
            row[9] = 3.0;
            rows.push(row);
        }
        let names = (0..10).map(|j| format!("f{}", j)).collect();
        let heatmap = top_correlations(&FeatureMatrix::new(names, rows).unwrap()).unwrap();
        let constant = heatmap.columns.iter().position(|c| c == "f9").unwrap();
        assert!(heatmap.matrix[constant].iter().all(Option::is_none));
    }

    #[test]
    fn test_class_counts_ascending_with_shares() {
        let counts = class_counts(&[1, 0, 0, 1, 0]);
        assert_eq!(
            counts,
            vec![
                ClassCount {
                    label: 0,
                    count: 3,
                    share: 0.6
                },
                ClassCount {
                    label: 1,
                    count: 2,
                    share: 0.4
                },
            ]
        );
    }

    #[test]
    fn test_importances_are_top_ten_descending() {
        let names: Vec<String> = (0..12).map(|j| format!("f{}", j)).collect();
        let importances: Vec<f64> = (0..12).map(|j| j as f64 / 66.0).collect();
        let model = RankedModel {
            names,
            importances,
        };
        let ranked = top_importances(&model).unwrap();
        assert_eq!(ranked.len(), TOP_N);
        assert_eq!(ranked[0].feature, "f11");
        assert_eq!(ranked[9].feature, "f2");
        assert!(ranked
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.importance >= b.importance));
    }

    #[test]
    fn test_model_without_importances_adds_notice() -> Result<()> {
        let upload = wide_upload(3, 8);
        let model = RecordingModel::new(&["f0", "f1", "f2"]);
        let scored = score(&upload, &model)?;
        let report = build_report(&upload, &scored, &model)?;
        assert!(report.importances.is_none());
        assert!(report.charts.importance.is_none());
        assert_eq!(report.notices, vec![NO_IMPORTANCE_NOTICE.to_string()]);
        Ok(())
    }

    #[test]
    fn test_model_with_importances_has_bar_chart() -> Result<()> {
        let upload = wide_upload(3, 8);
        let model = RankedModel {
            names: upload.columns.clone(),
            importances: vec![0.2, 0.5, 0.3],
        };
        let scored = score(&upload, &model)?;
        let report = build_report(&upload, &scored, &model)?;
        assert!(report.notices.is_empty());
        assert!(report.charts.importance.is_some());
        assert_eq!(report.importances.unwrap()[0].feature, "f1");
        Ok(())
    }

    #[test]
    fn test_previews_and_download() -> Result<()> {
        let upload = wide_upload(3, 8);
        let model = RecordingModel::new(&["f0", "f1", "f2"]);
        let scored = score(&upload, &model)?;
        let report = build_report(&upload, &scored, &model)?;

        assert_eq!(report.uploaded.rows.len(), PREVIEW_ROWS);
        assert_eq!(report.uploaded.row_count, 8);
        assert_eq!(
            report.predictions.columns,
            vec![PROBABILITY_COLUMN, PREDICTION_COLUMN]
        );
        assert_eq!(report.download.file_name, DOWNLOAD_FILE_NAME);

        let encoded = report
            .download
            .href
            .strip_prefix("data:file/csv;base64,")
            .unwrap();
        let decoded = Table::from_reader(STANDARD.decode(encoded)?.as_slice())?;
        assert_eq!(decoded, scored.table);
        Ok(())
    }
}
