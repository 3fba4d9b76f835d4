use crate::structs::{AssocError, CsvData, Result};
use csv::ReaderBuilder;
use std::path::Path;

impl CsvData {
    /// Parse a CSV or TSV file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid CSV
    pub fn from_file(path: &Path, is_tsv: bool) -> Result<Self> {
        let delimiter = if is_tsv { b'\t' } else { b',' };

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(ToString::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Get a column as numbers, one entry per row
    ///
    /// Empty or unparsable cells become NaN so that positions stay aligned
    /// with subjects across columns.
    #[must_use]
    pub fn numeric_column(&self, index: usize) -> Option<Vec<f64>> {
        self.column(index)
            .map(|col| col.iter().map(|s| parse_cell(s)).collect())
    }

    /// Numeric column looked up by header name
    ///
    /// # Errors
    /// Returns `Config` error if no such column exists
    pub fn numeric_column_by_name(&self, name: &str) -> Result<Vec<f64>> {
        self.column_index(name)
            .and_then(|i| self.numeric_column(i))
            .ok_or_else(|| AssocError::Config(format!("column not found: {name}")))
    }

    /// Text column looked up by header name
    ///
    /// # Errors
    /// Returns `Config` error if no such column exists
    pub fn text_column_by_name(&self, name: &str) -> Result<Vec<&str>> {
        self.column_index(name)
            .and_then(|i| self.column(i))
            .ok_or_else(|| AssocError::Config(format!("column not found: {name}")))
    }
}

fn parse_cell(s: &str) -> f64 {
    match s {
        "" | "NA" | "NaN" | "nan" | "NULL" => f64::NAN,
        _ => s.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// Replace a missing-value sentinel and out-of-range scores with NaN
///
/// A value equal to `missing_code`, or with magnitude above
/// `outlier_threshold`, is treated as missing.
#[must_use]
pub fn mask_invalid_scores(
    values: &[f64],
    missing_code: Option<f64>,
    outlier_threshold: Option<f64>,
) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            let is_code = missing_code.is_some_and(|code| v == code);
            let is_outlier = outlier_threshold.is_some_and(|t| v.abs() > t);
            if is_code || is_outlier {
                f64::NAN
            } else {
                v
            }
        })
        .collect()
}
