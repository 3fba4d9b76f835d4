//! Benjamini-Hochberg false discovery rate correction
//!
//! NaN p-values keep their position in the output but take no part in the
//! ranking or in the family size.

use crate::error::check_level;
use crate::structs::{AssocError, FdrResult, Result};

/// Apply the Benjamini-Hochberg step-up procedure at level `q`
///
/// Returns per-test significance flags, the critical p-value and the
/// monotone adjusted p-values (q-values), all aligned with `pvals`.
///
/// # Errors
/// Returns `InvalidInput` if `q` is outside (0, 1) or a non-NaN p-value is
/// outside [0, 1]
#[allow(clippy::cast_precision_loss)]
pub fn correct(pvals: &[f64], q: f64) -> Result<FdrResult> {
    check_level("q", q)?;
    validate_p_values(pvals)?;

    let m = pvals.len();
    let mut order: Vec<usize> = (0..m).filter(|&i| !pvals[i].is_nan()).collect();
    let m_valid = order.len();

    if m_valid == 0 {
        return Ok(FdrResult {
            significant: vec![false; m],
            critical_p: f64::NAN,
            adjusted_p: vec![f64::NAN; m],
        });
    }

    order.sort_by(|&a, &b| pvals[a].total_cmp(&pvals[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| pvals[i]).collect();
    let m_f = m_valid as f64;

    // largest rank whose p-value is within its threshold (rank / m) * q
    let last_pass = sorted
        .iter()
        .enumerate()
        .rev()
        .find(|&(i, &p)| p <= ((i + 1) as f64 / m_f) * q)
        .map(|(i, _)| i);
    let critical_p = last_pass.map_or(0.0, |i| sorted[i]);

    let mut adjusted_sorted = vec![0.0; m_valid];
    adjusted_sorted[m_valid - 1] = sorted[m_valid - 1];
    for i in (0..m_valid - 1).rev() {
        let scaled = (m_f / (i + 1) as f64) * sorted[i];
        adjusted_sorted[i] = scaled.min(adjusted_sorted[i + 1]).min(1.0);
    }

    let mut significant = vec![false; m];
    let mut adjusted_p = vec![f64::NAN; m];
    for (rank, &idx) in order.iter().enumerate() {
        adjusted_p[idx] = adjusted_sorted[rank];
        significant[idx] = last_pass.is_some() && sorted[rank] <= critical_p;
    }

    Ok(FdrResult {
        significant,
        critical_p,
        adjusted_p,
    })
}

fn validate_p_values(pvals: &[f64]) -> Result<()> {
    for (i, &p) in pvals.iter().enumerate() {
        if !p.is_nan() && !(0.0..=1.0).contains(&p) {
            return Err(AssocError::InvalidInput(format!(
                "p-value at index {i} is out of range [0, 1]: {p}"
            )));
        }
    }
    Ok(())
}
