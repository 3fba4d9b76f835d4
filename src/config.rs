//! Analysis configuration loaded from a JSON file
//!
//! Holds what the analysis needs to know about the data set: which columns
//! are outcome scores, which variables form each FDR family, and the
//! statistical thresholds.

use crate::error::check_level;
use crate::stats::batch::BatchSettings;
use crate::structs::{AssocError, Result, VariableBatch};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Full analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Subject identifier column; names the rows that entered the PCA
    #[serde(default)]
    pub id_column: Option<String>,
    /// Outcome-score columns every batch is correlated against
    pub outcomes: Vec<String>,
    /// Variable batches, one FDR family each
    pub batches: Vec<VariableBatch>,
    #[serde(default = "default_min_n")]
    pub min_n: usize,
    #[serde(default = "default_level")]
    pub fdr_q: f64,
    #[serde(default = "default_level")]
    pub alpha: f64,
    /// Outcome value meaning "missing"
    #[serde(default = "default_missing_code")]
    pub missing_code: Option<f64>,
    /// Outcome values with a larger magnitude are treated as missing
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: Option<f64>,
    /// Grouping column (e.g. diagnosis) for group comparisons
    #[serde(default)]
    pub group_column: Option<String>,
    /// Pooled-variance t-tests in group comparisons instead of Welch
    #[serde(default)]
    pub equal_variances: bool,
    #[serde(default)]
    pub interaction: Option<InteractionConfig>,
    #[serde(default)]
    pub pca: Option<PcaConfig>,
    #[serde(default = "default_min_pca_samples")]
    pub min_pca_samples: usize,
    /// Display labels for variables
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Which variables enter the principal-component decomposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaConfig {
    pub variables: Vec<String>,
    /// 0 = auto
    #[serde(default)]
    pub components: usize,
}

/// Variable-by-covariate interaction models (e.g. age moderating an
/// association with the outcome)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    pub covariate: String,
    /// Empty = every variable of every batch
    #[serde(default)]
    pub variables: Vec<String>,
}

impl InteractionConfig {
    /// Variables to model, in batch order without duplicates when none are
    /// listed explicitly
    #[must_use]
    pub fn resolve_variables<'a>(&'a self, batches: &'a [VariableBatch]) -> Vec<&'a str> {
        if !self.variables.is_empty() {
            return self.variables.iter().map(String::as_str).collect();
        }
        let mut out: Vec<&str> = Vec::new();
        for v in batches.iter().flat_map(|b| &b.variables) {
            if !out.contains(&v.as_str()) {
                out.push(v);
            }
        }
        out
    }
}

const fn default_min_n() -> usize {
    30
}

const fn default_level() -> f64 {
    0.05
}

#[allow(clippy::unnecessary_wraps)]
const fn default_missing_code() -> Option<f64> {
    Some(99.0)
}

#[allow(clippy::unnecessary_wraps)]
const fn default_outlier_threshold() -> Option<f64> {
    Some(10.0)
}

const fn default_min_pca_samples() -> usize {
    20
}

impl AnalysisConfig {
    /// Load and validate a configuration file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, is not valid JSON, or fails
    /// validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for caller mistakes
    ///
    /// # Errors
    /// Returns `Config` error describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.outcomes.is_empty() {
            return Err(AssocError::Config("no outcome columns configured".into()));
        }
        if self.batches.is_empty() {
            return Err(AssocError::Config("no variable batches configured".into()));
        }
        if let Some(batch) = self.batches.iter().find(|b| b.variables.is_empty()) {
            return Err(AssocError::Config(format!(
                "batch {} has no variables",
                batch.name
            )));
        }
        if self.min_n < 3 {
            return Err(AssocError::Config(format!(
                "min_n must be at least 3, got {}",
                self.min_n
            )));
        }
        check_level("fdr_q", self.fdr_q).map_err(|e| AssocError::Config(e.to_string()))?;
        check_level("alpha", self.alpha).map_err(|e| AssocError::Config(e.to_string()))?;
        if let Some(pca) = &self.pca {
            if pca.variables.len() < 2 {
                return Err(AssocError::Config(
                    "pca needs at least 2 variables".into(),
                ));
            }
        }
        if let Some(interaction) = &self.interaction {
            if interaction.covariate.is_empty() {
                return Err(AssocError::Config(
                    "interaction covariate must be named".into(),
                ));
            }
        }
        Ok(())
    }

    /// Settings handed to the batch runner
    #[must_use]
    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            min_n: self.min_n,
            q: self.fdr_q,
            alpha: self.alpha,
        }
    }

    /// Display label for a variable, falling back to its column name
    #[must_use]
    pub fn label<'a>(&'a self, variable: &'a str) -> &'a str {
        self.labels.get(variable).map_or(variable, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"{
        "outcomes": ["score"],
        "batches": [{ "name": "symptoms", "variables": ["ids_total", "panic"] }]
    }"#;

    #[test]
    fn test_defaults() {
        let config: AnalysisConfig = serde_json::from_str(MINIMAL).expect("parse");
        config.validate().expect("valid");

        assert_eq!(config.min_n, 30);
        assert!((config.fdr_q - 0.05).abs() < f64::EPSILON);
        assert!((config.alpha - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.missing_code, Some(99.0));
        assert_eq!(config.outlier_threshold, Some(10.0));
        assert_eq!(config.min_pca_samples, 20);
        assert!(config.group_column.is_none());
        assert!(!config.equal_variances);
        assert!(config.interaction.is_none());
        assert_eq!(config.batch_settings(), BatchSettings::default());
    }

    #[test]
    fn test_from_file_with_overrides() {
        let content = r#"{
            "outcomes": ["score_a", "score_b"],
            "batches": [{ "name": "b1", "variables": ["x"] }],
            "min_n": 10,
            "fdr_q": 0.1,
            "missing_code": null,
            "labels": { "x": "Age at onset" }
        }"#;
        let mut file = NamedTempFile::new().expect("create");
        file.write_all(content.as_bytes()).expect("write");

        let config = AnalysisConfig::from_file(file.path()).expect("load");
        assert_eq!(config.min_n, 10);
        assert!((config.fdr_q - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.missing_code, None);
        assert_eq!(config.label("x"), "Age at onset");
        assert_eq!(config.label("y"), "y");
    }

    #[test]
    fn test_validation_failures() {
        let base: AnalysisConfig = serde_json::from_str(MINIMAL).expect("parse");

        let mut c = base.clone();
        c.outcomes.clear();
        assert!(matches!(c.validate(), Err(AssocError::Config(_))));

        let mut c = base.clone();
        c.batches[0].variables.clear();
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.fdr_q = 1.2;
        assert!(c.validate().is_err());

        let mut c = base.clone();
        c.min_n = 2;
        assert!(c.validate().is_err());

        let mut c = base;
        c.pca = Some(PcaConfig {
            variables: vec!["x".into()],
            components: 0,
        });
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_interaction_variables() {
        let content = r#"{
            "outcomes": ["score"],
            "batches": [
                { "name": "b1", "variables": ["x", "y"] },
                { "name": "b2", "variables": ["y", "z"] }
            ],
            "interaction": { "covariate": "age" }
        }"#;
        let config: AnalysisConfig = serde_json::from_str(content).expect("parse");
        config.validate().expect("valid");
        let interaction = config.interaction.as_ref().expect("interaction");
        assert_eq!(interaction.resolve_variables(&config.batches), vec!["x", "y", "z"]);

        let explicit = InteractionConfig {
            covariate: "age".into(),
            variables: vec!["z".into()],
        };
        assert_eq!(explicit.resolve_variables(&config.batches), vec!["z"]);

        let mut bad = config.clone();
        bad.interaction = Some(InteractionConfig {
            covariate: String::new(),
            variables: Vec::new(),
        });
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_invalid_json() {
        let mut file = NamedTempFile::new().expect("create");
        file.write_all(b"{ not json").expect("write");
        assert!(matches!(
            AnalysisConfig::from_file(file.path()),
            Err(AssocError::Json(_))
        ));
    }
}
