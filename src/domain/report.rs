use serde::{Deserialize, Serialize};

use types::table::Table;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
}

impl TablePreview {
    pub fn of(table: &Table, rows: usize) -> Self {
        let head = table.head(rows);
        TablePreview {
            columns: head.columns,
            rows: head.rows,
            row_count: table.height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub label: u8,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationHeatmap {
    pub columns: Vec<String>,
    /// `None` where a column is constant.
    pub matrix: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Rendered SVG documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charts {
    pub histogram: String,
    pub pie: String,
    pub heatmap: Option<String>,
    pub importance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub file_name: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub uploaded: TablePreview,
    pub predictions: TablePreview,
    pub class_counts: Vec<ClassCount>,
    pub correlation: Option<CorrelationHeatmap>,
    pub importances: Option<Vec<FeatureImportance>>,
    pub notices: Vec<String>,
    pub charts: Charts,
    pub download: Download,
}
