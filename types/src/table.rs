use std::fs::File;
use std::io::Read;
use std::path::Path;

use eyre::{ensure, eyre, Result, WrapErr};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Cell spellings read as a missing value, the same set pandas recognizes.
pub const MISSING_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A CSV table with every cell kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

fn malformed(e: csv::Error) -> Error {
    Error::MalformedCsv(e.to_string())
}

pub fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

/// Numeric value of a cell. Missing cells, and spellings that parse to NaN
/// or an infinity (`NAN`, `inf`, `-Infinity`), count as zero.
pub fn numeric_value(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return Some(0.0);
    }
    let value = cell.trim().parse::<f64>().ok()?;
    Some(if value.is_finite() { value } else { 0.0 })
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == columns.len(),
                Error::MalformedCsv(format!(
                    "row {} has {} fields, header has {}",
                    i + 1,
                    row.len(),
                    columns.len()
                ))
            );
        }
        Ok(Table { columns, rows })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let columns: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(malformed)
            })
            .collect::<std::result::Result<Vec<Vec<String>>, Error>>()?;
        Ok(Table { columns, rows })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).wrap_err_with(|| format!("Failed to open {}", path.display()))?;
        Self::from_reader(file)
    }

    /// CSV encoding of the whole table, header first, no index column.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        if self.columns.is_empty() {
            return Ok(Vec::new());
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| eyre!("Failed to flush CSV: {}", e.error()))
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_csv_bytes()?;
        std::fs::write(path, bytes).wrap_err_with(|| format!("Failed to write {}", path.display()))
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// A column is numeric when every non-missing cell parses as a float.
    pub fn column_kind(&self, index: usize) -> ColumnKind {
        let numeric = self
            .rows
            .iter()
            .all(|row| numeric_value(&row[index]).is_some());
        if numeric {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }

    /// Numeric columns other than `exclude`, with missing cells filled with zero.
    pub fn feature_matrix(&self, exclude: &str) -> FeatureMatrix {
        let indices: Vec<usize> = (0..self.width())
            .filter(|&i| self.columns[i] != exclude)
            .filter(|&i| self.column_kind(i) == ColumnKind::Numeric)
            .collect();
        let names = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let values = Array2::from_shape_fn((self.height(), indices.len()), |(r, c)| {
            numeric_value(&self.rows[r][indices[c]]).unwrap_or(0.0)
        });
        FeatureMatrix { names, values }
    }

    /// Reads `name` as a 0/1 label column; any non-zero value is the positive class.
    pub fn binary_column(&self, name: &str) -> Result<Vec<u8>> {
        let values = self
            .column_values(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
        values
            .into_iter()
            .enumerate()
            .map(|(i, cell)| {
                let value = numeric_value(cell).ok_or_else(|| {
                    eyre!("Row {} of {} is not numeric: {:?}", i + 1, name, cell)
                })?;
                Ok(u8::from(value != 0.0))
            })
            .collect()
    }

    /// Appends a column, replacing any existing column with the same name.
    pub fn push_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        ensure!(
            values.len() == self.height(),
            "Column {} has {} values for {} rows",
            name,
            values.len(),
            self.height()
        );
        match self.column_index(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| Error::ColumnNotFound(name.to_string()).into())
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }
}

/// Numeric matrix handed to a classifier, one row per transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|row| row.len() != names.len()) {
            return Err(Error::RaggedFeatures {
                expected: names.len(),
                found: row.len(),
            }
            .into());
        }
        let shape = (rows.len(), names.len());
        let values = Array2::from_shape_vec(shape, rows.into_iter().flatten().collect())
            .wrap_err("Failed to shape feature matrix")?;
        Ok(FeatureMatrix { names, values })
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.column(index)
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[[row, column]]
    }

    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            names: self.names.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    pub fn select_columns(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            names: indices.iter().map(|&i| self.names[i].clone()).collect(),
            values: self.values.select(Axis(1), indices),
        }
    }

    /// Pairwise Pearson correlation. Pairs involving a constant column are NaN.
    pub fn correlation(&self) -> Array2<f64> {
        let width = self.width();
        let mut matrix = Array2::from_elem((width, width), f64::NAN);
        let Some(mean) = self.values.mean_axis(Axis(0)).filter(|_| self.height() >= 2) else {
            return matrix;
        };
        let centered = &self.values - &mean;
        let norms: Vec<f64> = centered
            .columns()
            .into_iter()
            .map(|c| c.dot(&c).sqrt())
            .collect();

        for a in 0..width {
            for b in a..width {
                if norms[a] == 0.0 || norms[b] == 0.0 {
                    continue;
                }
                let r = if a == b {
                    1.0
                } else {
                    let dot = centered.column(a).dot(&centered.column(b));
                    (dot / (norms[a] * norms[b])).clamp(-1.0, 1.0)
                };
                matrix[[a, b]] = r;
                matrix[[b, a]] = r;
            }
        }
        matrix
    }
}
