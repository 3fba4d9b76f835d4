//! Ordinary least squares with coefficient tests, and the
//! variable-by-covariate interaction model built on it

use crate::structs::{AssocError, InteractionModel, RegressionFit, RegressionTerm, Result};
use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Relative pivot size below which `X'X` is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Fit `y ~ 1 + predictors` by least squares on the complete rows
///
/// Rows where `y` or any predictor is missing are dropped. Returns `None`
/// when fewer than `predictors + 2` complete rows remain or the design is
/// singular (e.g. a constant predictor).
///
/// # Errors
/// Returns `InvalidInput` if names and predictors do not pair up or lengths
/// differ, `Stats` if the t distribution cannot be built
#[allow(clippy::cast_precision_loss)]
pub fn ols(names: &[&str], predictors: &[&[f64]], y: &[f64]) -> Result<Option<RegressionFit>> {
    if names.len() != predictors.len() || predictors.is_empty() {
        return Err(AssocError::InvalidInput(
            "need one name per predictor and at least one predictor".into(),
        ));
    }
    if let Some((name, _)) = names
        .iter()
        .zip(predictors)
        .find(|(_, p)| p.len() != y.len())
    {
        return Err(AssocError::InvalidInput(format!(
            "predictor {name} has a different length than the response"
        )));
    }

    let rows: Vec<usize> = (0..y.len())
        .filter(|&i| y[i].is_finite() && predictors.iter().all(|p| p[i].is_finite()))
        .collect();
    let n = rows.len();
    let n_cols = predictors.len() + 1;
    if n < n_cols + 1 {
        return Ok(None);
    }

    let design = Array2::from_shape_fn((n, n_cols), |(r, c)| {
        if c == 0 {
            1.0
        } else {
            predictors[c - 1][rows[r]]
        }
    });
    let response: Array1<f64> = rows.iter().map(|&i| y[i]).collect();

    let xtx = design.t().dot(&design);
    let Some(xtx_inv) = invert(&xtx) else {
        return Ok(None);
    };
    let coefficients = xtx_inv.dot(&design.t().dot(&response));

    let residuals = &response - &design.dot(&coefficients);
    let ss_res = residuals.dot(&residuals);
    let y_mean = response.mean().unwrap_or(f64::NAN);
    let ss_tot = response.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>();

    let df_residual = n - n_cols;
    let df = df_residual as f64;
    let mse = ss_res / df;
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 1.0 };
    let adjusted_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df;

    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AssocError::Stats(format!("t distribution with {df} df: {e}")))?;

    let terms = std::iter::once("(Intercept)")
        .chain(names.iter().copied())
        .enumerate()
        .map(|(j, name)| {
            let estimate = coefficients[j];
            let std_error = (xtx_inv[[j, j]] * mse).sqrt();
            let (t_statistic, p) = if std_error > 0.0 {
                let t = estimate / std_error;
                (t, (2.0 * t_dist.sf(t.abs())).clamp(0.0, 1.0))
            } else {
                (f64::INFINITY.copysign(estimate), 0.0)
            };
            RegressionTerm {
                name: name.to_string(),
                estimate,
                std_error,
                t_statistic,
                p,
            }
        })
        .collect();

    Ok(Some(RegressionFit {
        n,
        df_residual,
        r_squared,
        adjusted_r_squared,
        terms,
    }))
}

/// Gauss-Jordan inverse with partial pivoting
fn invert(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let size = matrix.nrows();
    let scale = matrix.diag().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }

    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(size);
    for col in 0..size {
        let pivot_row = (col..size).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        let pivot = a[[pivot_row, col]];
        if pivot.abs() <= scale * SINGULAR_TOLERANCE {
            return None;
        }
        if pivot_row != col {
            for k in 0..size {
                a.swap([pivot_row, k], [col, k]);
                inv.swap([pivot_row, k], [col, k]);
            }
        }
        for k in 0..size {
            a[[col, k]] /= pivot;
            inv[[col, k]] /= pivot;
        }
        for row in 0..size {
            let factor = a[[row, col]];
            if row == col || factor == 0.0 {
                continue;
            }
            for k in 0..size {
                a[[row, k]] -= factor * a[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }
    Some(inv)
}

/// Fit `outcome ~ variable + covariate + variable:covariate`
///
/// The FDR fields are left at NaN/false; the caller fills them once the
/// whole family of models is known.
///
/// # Errors
/// Returns `InvalidInput` if the three series differ in length
pub fn interaction_model(
    outcome_name: &str,
    outcome: &[f64],
    variable_name: &str,
    variable: &[f64],
    covariate_name: &str,
    covariate: &[f64],
) -> Result<Option<InteractionModel>> {
    let product: Vec<f64> = variable.iter().zip(covariate).map(|(v, c)| v * c).collect();
    let interaction_name = format!("{variable_name}:{covariate_name}");

    let fit = ols(
        &[variable_name, covariate_name, &interaction_name],
        &[variable, covariate, &product],
        outcome,
    )?;

    Ok(fit.map(|fit| InteractionModel {
        outcome: outcome_name.to_string(),
        variable: variable_name.to_string(),
        covariate: covariate_name.to_string(),
        fit,
        interaction_p_fdr: f64::NAN,
        interaction_significant: false,
    }))
}
