//! PCA on complete cases using linfa-reduction

use crate::stats::descriptive::{mean, sample_variance};
use crate::structs::{AssocError, FeatureMatrix, PcaResult, Result, StandardizedFeatures};
use linfa::traits::Fit;
use linfa::DatasetBase;
use linfa_reduction::Pca;
use ndarray::Array2;

impl FeatureMatrix {
    /// Build a matrix from aligned columns, keeping only rows where every
    /// column has a value
    ///
    /// # Errors
    /// Returns error if columns differ in length or no complete row exists
    pub fn from_columns(names: &[&str], columns: &[&[f64]]) -> Result<Self> {
        if names.len() != columns.len() || columns.is_empty() {
            return Err(AssocError::InvalidInput(
                "need one name per feature column and at least one column".into(),
            ));
        }
        let n_rows = columns[0].len();
        if columns.iter().any(|c| c.len() != n_rows) {
            return Err(AssocError::InvalidInput(
                "feature columns must have the same length".into(),
            ));
        }

        let mut data = Vec::new();
        let mut row_indices = Vec::new();
        for row_idx in 0..n_rows {
            let row: Vec<f64> = columns.iter().map(|c| c[row_idx]).collect();
            if row.iter().all(|v| v.is_finite()) {
                data.push(row);
                row_indices.push(row_idx);
            }
        }

        if data.is_empty() {
            return Err(AssocError::Ml("No complete rows for the requested features".into()));
        }

        Ok(Self {
            names: names.iter().map(ToString::to_string).collect(),
            data,
            row_indices,
        })
    }

    /// Center each feature and scale it to unit sample SD
    ///
    /// Constant features become all zeros.
    #[must_use]
    pub fn standardize(&self) -> StandardizedFeatures {
        let columns: Vec<Vec<f64>> = (0..self.n_features())
            .filter_map(|i| self.column(i))
            .collect();
        let means: Vec<f64> = columns.iter().map(|c| mean(c)).collect();
        let std_devs: Vec<f64> = columns
            .iter()
            .map(|c| {
                let sd = sample_variance(c).sqrt();
                if sd.is_finite() { sd } else { 0.0 }
            })
            .collect();

        let data = self
            .data
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, &val)| {
                        if std_devs[i] == 0.0 {
                            0.0
                        } else {
                            (val - means[i]) / std_devs[i]
                        }
                    })
                    .collect()
            })
            .collect();

        StandardizedFeatures {
            names: self.names.clone(),
            data,
            row_indices: self.row_indices.clone(),
            means,
            std_devs,
        }
    }
}

/// Run PCA on standardized features
///
/// `n_components == 0` picks `min(features, samples - 1, 5)`.
///
/// # Errors
/// Returns error if PCA computation fails (e.g., too few samples)
pub fn run_pca(features: &StandardizedFeatures, n_components: usize) -> Result<PcaResult> {
    let n_samples = features.n_samples();
    let n_features = features.n_features();

    if n_features < 2 {
        return Err(AssocError::Ml("PCA requires at least 2 features".into()));
    }
    if n_samples < 2 {
        return Err(AssocError::Ml("PCA requires at least 2 samples".into()));
    }

    let n_components = if n_components == 0 {
        n_features.min(n_samples - 1).min(5)
    } else {
        n_components.min(n_features).min(n_samples - 1)
    };

    let array = Array2::from_shape_vec((n_samples, n_features), features.to_flat())
        .map_err(|e| AssocError::Ml(format!("Failed to create array for PCA: {e}")))?;
    let dataset = DatasetBase::from(array);

    let pca = Pca::params(n_components)
        .fit(&dataset)
        .map_err(|e| AssocError::Ml(format!("PCA failed: {e}")))?;

    let singular_values = pca.singular_values();
    let retained: f64 = singular_values.iter().map(|s| s * s).sum();

    let explained_variance_ratio: Vec<f64> = if retained > 0.0 {
        singular_values.iter().map(|s| (s * s) / retained).collect()
    } else {
        vec![0.0; n_components]
    };

    let cumulative_variance = explained_variance_ratio
        .iter()
        .scan(0.0, |running, &ratio| {
            *running += ratio;
            Some(*running)
        })
        .collect();

    Ok(PcaResult {
        variables: features.names.clone(),
        n_samples,
        n_components,
        explained_variance_ratio,
        cumulative_variance,
        means: features.means.clone(),
        std_devs: features.std_devs.clone(),
        subjects: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn correlated_columns(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|v| 2.0 * v + (v * 0.9).sin()).collect();
        let c: Vec<f64> = a.iter().map(|v| (v * 1.3).cos() * 5.0).collect();
        (a, b, c)
    }

    #[test]
    fn test_from_columns_listwise() {
        let a = vec![1.0, f64::NAN, 3.0, 4.0];
        let b = vec![2.0, 3.0, f64::NAN, 5.0];
        let features = FeatureMatrix::from_columns(&["a", "b"], &[&a, &b]).expect("features");

        assert_eq!(features.n_samples(), 2);
        assert_eq!(features.row_indices, vec![0, 3]);
        assert_eq!(features.column(1), Some(vec![2.0, 5.0]));
    }

    #[test]
    fn test_from_columns_errors() {
        let a = vec![1.0, 2.0];
        let short = vec![1.0];
        assert!(FeatureMatrix::from_columns(&["a", "b"], &[&a, &short]).is_err());
        assert!(FeatureMatrix::from_columns(&["a"], &[&a, &a]).is_err());
        assert!(FeatureMatrix::from_columns(&["a"], &[&[f64::NAN]]).is_err());
    }

    #[test]
    fn test_standardize() {
        let a = vec![1.0, 2.0, 3.0];
        let c = vec![7.0, 7.0, 7.0];
        let features = FeatureMatrix::from_columns(&["a", "c"], &[&a, &c]).expect("features");
        let z = features.standardize();

        assert!((z.data[0][0] + 1.0).abs() < 1e-12);
        assert!(z.data[1][0].abs() < 1e-12);
        assert!((z.data[2][0] - 1.0).abs() < 1e-12);
        assert!(z.data.iter().all(|row| row[1] == 0.0));
        assert!((z.means[1] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_run_pca() {
        let (a, b, c) = correlated_columns(30);
        let features =
            FeatureMatrix::from_columns(&["a", "b", "c"], &[&a, &b, &c]).expect("features");
        let result = run_pca(&features.standardize(), 0).expect("pca");

        assert_eq!(result.n_components, 3);
        assert_eq!(result.n_samples, 30);
        assert_eq!(result.explained_variance_ratio.len(), 3);
        for w in result.cumulative_variance.windows(2) {
            assert!(w[1] >= w[0]);
        }
        let total: f64 = result.explained_variance_ratio.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(result.means.len(), 3);
        assert!((result.means[0] - 14.5).abs() < 1e-12);
        assert!(result.std_devs.iter().all(|&sd| sd > 0.0));
    }

    #[test]
    fn test_pca_too_few_features() {
        let a = vec![1.0, 2.0, 3.0];
        let features = FeatureMatrix::from_columns(&["a"], &[&a]).expect("features");
        assert!(run_pca(&features.standardize(), 0).is_err());
    }
}
