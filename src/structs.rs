//! Consolidated public types for the clinassoc crate
//!
//! This module contains the data model shared by the statistics core, the
//! orchestration pipeline and the output writers. Behaviour lives next to the
//! computation that produces each type (see `stats::*`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use crate::error::{AssocError, Result};

// ============================================================================
// CSV Types
// ============================================================================

/// Represents a parsed CSV/TSV file with headers and rows
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvData {
    /// Get number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.headers.len()
    }

    /// Get column index by name
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Get a column as one string cell per row (missing cells are empty)
    #[must_use]
    pub fn column(&self, index: usize) -> Option<Vec<&str>> {
        if index >= self.headers.len() {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map_or("", String::as_str))
                .collect(),
        )
    }
}

// ============================================================================
// Correlation Types
// ============================================================================

/// Paired observations left after pairwise deletion of missing values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidPair {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ValidPair {
    /// Number of complete pairs
    #[must_use]
    pub fn n(&self) -> usize {
        self.x.len()
    }
}

/// Pearson correlation with its p-value and Fisher-Z confidence interval
///
/// All of `r`, `p` and `ci` are NaN when the statistic is undefined
/// (fewer than 3 complete pairs, or a constant series).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CorrelationResult {
    pub r: f64,
    pub ci: (f64, f64),
    pub p: f64,
    pub n_valid: usize,
}

impl CorrelationResult {
    /// Result carrying only the sample size
    #[must_use]
    pub const fn undefined(n_valid: usize) -> Self {
        Self {
            r: f64::NAN,
            ci: (f64::NAN, f64::NAN),
            p: f64::NAN,
            n_valid,
        }
    }

    #[must_use]
    pub fn is_defined(&self) -> bool {
        !self.r.is_nan()
    }
}

// ============================================================================
// FDR Types
// ============================================================================

/// Benjamini-Hochberg outcome for one family of tests, aligned with the input
#[derive(Debug, Clone, Serialize)]
pub struct FdrResult {
    pub significant: Vec<bool>,
    /// Largest p-value still called significant; `0.0` when nothing survives,
    /// NaN when the family had no valid p-values
    pub critical_p: f64,
    pub adjusted_p: Vec<f64>,
}

impl FdrResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.significant.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.significant.is_empty()
    }

    /// Number of tests flagged significant
    #[must_use]
    pub fn discoveries(&self) -> usize {
        self.significant.iter().filter(|&&s| s).count()
    }

    /// Critical p-value, or `None` if no test survived correction
    #[must_use]
    pub fn critical(&self) -> Option<f64> {
        if self.discoveries() == 0 {
            None
        } else {
            Some(self.critical_p)
        }
    }
}

// ============================================================================
// Batch Types
// ============================================================================

/// A named list of variables forming one FDR family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableBatch {
    pub name: String,
    pub variables: Vec<String>,
}

/// One variable's row in a batch table
#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    pub name: String,
    pub r: f64,
    pub p: f64,
    pub n: usize,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub p_fdr: f64,
    pub fdr_significant: bool,
}

/// Correlation table for one batch against one outcome score
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch: String,
    pub outcome: String,
    pub rows: Vec<BatchRow>,
    /// Number of variables that entered the FDR family
    pub family_size: usize,
    pub critical_p: f64,
}

impl BatchResult {
    /// Rows that survived FDR correction
    pub fn significant_rows(&self) -> impl Iterator<Item = &BatchRow> {
        self.rows.iter().filter(|r| r.fdr_significant)
    }

    #[must_use]
    pub fn n_significant(&self) -> usize {
        self.significant_rows().count()
    }
}

// ============================================================================
// Effect Size Types
// ============================================================================

/// Which family of thresholds an effect size is judged against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Correlation coefficient r
    Correlation,
    /// Standardized mean difference (Cohen's d)
    MeanDifference,
}

impl FromStr for EffectKind {
    type Err = AssocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "correlation" | "r" => Ok(Self::Correlation),
            "mean_difference" | "d" => Ok(Self::MeanDifference),
            other => Err(AssocError::InvalidInput(format!(
                "unknown effect kind: {other:?}"
            ))),
        }
    }
}

/// Qualitative magnitude of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    Negligible,
    Small,
    Medium,
    Large,
    /// Only reachable for correlations
    VeryLarge,
}

impl EffectMagnitude {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Negligible => "negligible",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::VeryLarge => "very large",
        }
    }
}

impl fmt::Display for EffectMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Descriptive / Group Types
// ============================================================================

/// Descriptive statistics for a numeric column (missing values skipped)
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
}

impl ColumnStats {
    /// Format as a summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: n={} (missing {}), mean={:.3}, sd={:.3}, min={:.3}, Q1={:.3}, median={:.3}, Q3={:.3}, max={:.3}",
            self.name,
            self.count,
            self.missing,
            self.mean,
            self.std_dev,
            self.min,
            self.q1,
            self.median,
            self.q3,
            self.max
        )
    }
}

/// One-way ANOVA across groups
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnovaResult {
    pub f_statistic: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub p: f64,
    pub eta_squared: f64,
}

/// Cohen's d between two groups
#[derive(Debug, Clone, Serialize)]
pub struct PairwiseComparison {
    pub group_a: String,
    pub group_b: String,
    pub n_a: usize,
    pub n_b: usize,
    pub mean_a: f64,
    pub mean_b: f64,
    pub cohens_d: f64,
    pub magnitude: Option<EffectMagnitude>,
    /// `None` when either group has fewer than two values or both are constant
    pub t_test: Option<TTestResult>,
}

/// Two-sample t-test of group A against group B
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TTestResult {
    pub t_statistic: f64,
    /// Welch-Satterthwaite df, or `n_a + n_b - 2` with pooled variance
    pub df: f64,
    pub p: f64,
    pub equal_variances: bool,
}

/// Outcome score compared across the levels of a grouping column
#[derive(Debug, Clone, Serialize)]
pub struct GroupComparison {
    pub outcome: String,
    pub groups: Vec<ColumnStats>,
    pub anova: Option<AnovaResult>,
    pub pairs: Vec<PairwiseComparison>,
}

// ============================================================================
// PCA Types
// ============================================================================

/// Complete-case feature matrix
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Feature names (column headers)
    pub names: Vec<String>,
    /// Row data as feature vectors
    pub data: Vec<Vec<f64>>,
    /// Original row indices (for mapping back)
    pub row_indices: Vec<usize>,
}

impl FeatureMatrix {
    /// Get number of samples (rows)
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.len()
    }

    /// Get number of features (columns)
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Get a feature column by index
    #[must_use]
    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.n_features() {
            return None;
        }
        Some(self.data.iter().map(|row| row[index]).collect())
    }
}

/// Z-standardized feature matrix with its scaling parameters
#[derive(Debug, Clone)]
pub struct StandardizedFeatures {
    pub names: Vec<String>,
    pub data: Vec<Vec<f64>>,
    pub row_indices: Vec<usize>,
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
}

impl StandardizedFeatures {
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Convert to flat `Vec<f64>` (row-major)
    #[must_use]
    pub fn to_flat(&self) -> Vec<f64> {
        self.data.iter().flatten().copied().collect()
    }
}

/// Principal-component decomposition summary
#[derive(Debug, Clone, Serialize)]
pub struct PcaResult {
    pub variables: Vec<String>,
    pub n_samples: usize,
    pub n_components: usize,
    /// Share of retained variance per component
    pub explained_variance_ratio: Vec<f64>,
    pub cumulative_variance: Vec<f64>,
    /// Per-variable centering and scaling applied before the fit
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
    /// Ids of the complete rows that entered the fit, when an id column is
    /// configured
    pub subjects: Vec<String>,
}

// ============================================================================
// Regression Types
// ============================================================================

/// One coefficient of a least-squares fit
#[derive(Debug, Clone, Serialize)]
pub struct RegressionTerm {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_statistic: f64,
    pub p: f64,
}

/// Ordinary least-squares fit with an intercept
#[derive(Debug, Clone, Serialize)]
pub struct RegressionFit {
    /// Complete rows used
    pub n: usize,
    pub df_residual: usize,
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    /// Intercept first, then predictors in input order
    pub terms: Vec<RegressionTerm>,
}

impl RegressionFit {
    /// Look up a term by name
    #[must_use]
    pub fn term(&self, name: &str) -> Option<&RegressionTerm> {
        self.terms.iter().find(|t| t.name == name)
    }
}

/// `outcome ~ variable + covariate + variable:covariate`
#[derive(Debug, Clone, Serialize)]
pub struct InteractionModel {
    pub outcome: String,
    pub variable: String,
    pub covariate: String,
    pub fit: RegressionFit,
    /// BH-adjusted p of the interaction term across the variables modelled
    /// for this outcome
    pub interaction_p_fdr: f64,
    pub interaction_significant: bool,
}

impl InteractionModel {
    /// The `variable:covariate` term
    #[must_use]
    pub fn interaction(&self) -> Option<&RegressionTerm> {
        self.fit.terms.last()
    }
}

// ============================================================================
// Pipeline Types
// ============================================================================

/// Everything one `analyze` run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub outcome_stats: Vec<ColumnStats>,
    pub batches: Vec<BatchResult>,
    pub group_comparisons: Vec<GroupComparison>,
    pub interactions: Vec<InteractionModel>,
    pub pca: Option<PcaResult>,
}
