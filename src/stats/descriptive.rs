use crate::structs::{AssocError, ColumnStats, Result};

impl ColumnStats {
    /// Calculate statistics over the non-missing values
    ///
    /// # Errors
    /// Returns error if there are no non-missing values
    pub fn calculate(name: &str, values: &[f64]) -> Result<Self> {
        let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if present.is_empty() {
            return Err(AssocError::Stats(format!(
                "Cannot calculate stats for {name}: no non-missing values"
            )));
        }

        present.sort_by(f64::total_cmp);

        let count = present.len();
        let q1 = percentile(&present, 25.0);
        let q3 = percentile(&present, 75.0);

        Ok(Self {
            name: name.to_string(),
            count,
            missing: values.len() - count,
            mean: mean(&present),
            std_dev: sample_variance(&present).sqrt(),
            min: present[0],
            max: present[count - 1],
            q1,
            median: percentile(&present, 50.0),
            q3,
            iqr: q3 - q1,
        })
    }
}

/// Arithmetic mean; NaN for an empty slice
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased (n - 1) variance; NaN with fewer than two values
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Calculate percentile using linear interpolation
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let k = (p / 100.0) * (sorted.len() - 1) as f64;
    let f = k.floor() as usize;
    let c = k.ceil() as usize;

    if f == c {
        sorted[f]
    } else {
        let d0 = sorted[f] * (c as f64 - k);
        let d1 = sorted[c] * (k - f as f64);
        d0 + d1
    }
}
