//! Pearson correlation with p-value and Fisher-Z confidence interval

use crate::error::check_level;
use crate::structs::{AssocError, CorrelationResult, Result, ValidPair};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Fewest complete pairs for which a correlation is reported
pub const MIN_PAIRS: usize = 3;

/// Drop every position where either value is missing
///
/// # Errors
/// Returns `InvalidInput` if `x` and `y` differ in length
pub fn pairwise_complete(x: &[f64], y: &[f64]) -> Result<ValidPair> {
    if x.len() != y.len() {
        return Err(AssocError::InvalidInput(format!(
            "paired samples must have the same length ({} vs {})",
            x.len(),
            y.len()
        )));
    }

    let (x, y) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .unzip();

    Ok(ValidPair { x, y })
}

/// Correlate `x` with `y` after pairwise deletion
///
/// Fewer than three complete pairs, or a constant series, gives an undefined
/// (all-NaN) result rather than an error. At `|r| == 1` the interval
/// collapses to `(r, r)`.
///
/// # Errors
/// Returns `InvalidInput` for mismatched lengths or `alpha` outside (0, 1)
pub fn estimate(x: &[f64], y: &[f64], alpha: f64) -> Result<CorrelationResult> {
    check_level("alpha", alpha)?;
    let valid = pairwise_complete(x, y)?;
    let n = valid.n();

    if n < MIN_PAIRS {
        return Ok(CorrelationResult::undefined(n));
    }
    let Some(r) = pearson(&valid.x, &valid.y) else {
        return Ok(CorrelationResult::undefined(n));
    };

    Ok(CorrelationResult {
        r,
        ci: fisher_ci(r, n, alpha)?,
        p: correlation_p_value(r, n)?,
        n_valid: n,
    })
}

/// Pearson product-moment correlation of two complete, equal-length series
///
/// Returns `None` when either series has zero variance.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = var_x.sqrt() * var_y.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }

    Some((cov / denom).clamp(-1.0, 1.0))
}

/// Two-tailed p-value of `r` via the t statistic with `n - 2` df
#[allow(clippy::cast_precision_loss)]
fn correlation_p_value(r: f64, n: usize) -> Result<f64> {
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AssocError::Stats(format!("t distribution with {df} df: {e}")))?;

    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Two-tailed standard-normal critical value for `alpha`
///
/// # Errors
/// Returns `InvalidInput` if `alpha` is outside (0, 1)
pub fn z_critical(alpha: f64) -> Result<f64> {
    check_level("alpha", alpha)?;
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AssocError::Stats(format!("standard normal: {e}")))?;
    Ok(normal.inverse_cdf(1.0 - alpha / 2.0))
}

/// Fisher-Z confidence interval for a correlation from `n` pairs
///
/// With exactly three pairs the standard error is infinite and the interval
/// spans `(-1, 1)`.
///
/// # Errors
/// Returns `InvalidInput` if `alpha` is outside (0, 1)
#[allow(clippy::cast_precision_loss)]
pub fn fisher_ci(r: f64, n: usize, alpha: f64) -> Result<(f64, f64)> {
    if r.abs() >= 1.0 {
        return Ok((r, r));
    }
    if n < MIN_PAIRS || r.is_nan() {
        return Ok((f64::NAN, f64::NAN));
    }

    let z = r.atanh();
    let half_width = z_critical(alpha)? / ((n - 3) as f64).sqrt();

    Ok(((z - half_width).tanh(), (z + half_width).tanh()))
}
