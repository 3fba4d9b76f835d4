//! Correlate a batch of variables against one outcome score and apply FDR
//! correction across the batch

use crate::error::check_level;
use crate::stats::correlation::estimate;
use crate::stats::fdr::correct;
use crate::structs::{AssocError, BatchResult, BatchRow, CorrelationResult, Result};
use rayon::prelude::*;
use tracing::debug;

/// Knobs for one batch run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSettings {
    /// Variables with fewer complete pairs are reported as undefined and kept
    /// out of the FDR family
    pub min_n: usize,
    /// FDR level
    pub q: f64,
    /// CI alpha
    pub alpha: f64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            min_n: 30,
            q: 0.05,
            alpha: 0.05,
        }
    }
}

/// Run every variable in `variables` against `outcome`
///
/// Rows come back in input order. Only variables that pass the sample-size
/// gate and have a defined correlation count towards the FDR family size.
///
/// # Errors
/// Returns `InvalidInput` if a variable's length differs from the outcome's,
/// or if `q`/`alpha` are outside (0, 1)
pub fn run_batch(
    batch: &str,
    outcome_name: &str,
    outcome: &[f64],
    variables: &[(&str, &[f64])],
    settings: &BatchSettings,
) -> Result<BatchResult> {
    check_level("alpha", settings.alpha)?;
    check_level("q", settings.q)?;
    if let Some((name, values)) = variables.iter().find(|(_, v)| v.len() != outcome.len()) {
        return Err(AssocError::InvalidInput(format!(
            "variable {name} has {} values but outcome {outcome_name} has {}",
            values.len(),
            outcome.len()
        )));
    }

    let estimates: Vec<CorrelationResult> = variables
        .par_iter()
        .map(|(_, values)| estimate(values, outcome, settings.alpha))
        .collect::<Result<_>>()?;

    let gated: Vec<CorrelationResult> = estimates
        .into_iter()
        .zip(variables)
        .map(|(est, (name, _))| {
            if est.n_valid < settings.min_n {
                debug!(
                    batch,
                    variable = name,
                    n = est.n_valid,
                    min_n = settings.min_n,
                    "excluded by sample-size gate"
                );
                CorrelationResult::undefined(est.n_valid)
            } else {
                est
            }
        })
        .collect();

    let pvals: Vec<f64> = gated.iter().map(|c| c.p).collect();
    let fdr = correct(&pvals, settings.q)?;
    let family_size = pvals.iter().filter(|p| !p.is_nan()).count();

    debug!(
        batch,
        outcome = outcome_name,
        variables = variables.len(),
        family_size,
        discoveries = fdr.discoveries(),
        "batch corrected"
    );

    let rows = variables
        .iter()
        .zip(&gated)
        .enumerate()
        .map(|(i, ((name, _), est))| BatchRow {
            name: (*name).to_string(),
            r: est.r,
            p: est.p,
            n: est.n_valid,
            ci_lower: est.ci.0,
            ci_upper: est.ci.1,
            p_fdr: fdr.adjusted_p[i],
            fdr_significant: fdr.significant[i],
        })
        .collect();

    Ok(BatchResult {
        batch: batch.to_string(),
        outcome: outcome_name.to_string(),
        rows,
        family_size,
        critical_p: fdr.critical_p,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn outcome(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.37).sin() * 3.0 + i as f64 * 0.05).collect()
    }

    fn strong(y: &[f64]) -> Vec<f64> {
        y.iter().map(|v| v * 2.0 + 1.0).collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn unrelated(n: usize) -> Vec<f64> {
        (0..n).map(|i| ((i * 7919) % 101) as f64).collect()
    }

    #[test]
    fn test_rows_in_input_order() {
        let y = outcome(60);
        let a = strong(&y);
        let b = unrelated(60);
        let vars: Vec<(&str, &[f64])> =
            vec![("noise", b.as_slice()), ("severity", a.as_slice())];

        let result = run_batch("symptoms", "score", &y, &vars, &BatchSettings::default())
            .expect("batch");

        assert_eq!(result.batch, "symptoms");
        assert_eq!(result.outcome, "score");
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].name, "noise");
        assert_eq!(result.rows[1].name, "severity");
        assert_eq!(result.family_size, 2);

        let severity = &result.rows[1];
        assert!((severity.r - 1.0).abs() < 1e-9);
        assert!(severity.fdr_significant);
        assert!(severity.p_fdr <= 0.05);
        assert_eq!(severity.n, 60);
    }

    #[test]
    fn test_min_sample_gate_excludes_from_family() {
        let y = outcome(40);
        let a = strong(&y);
        let b = unrelated(40);
        let mut sparse: Vec<f64> = y.iter().map(|v| v + 0.5).collect();
        for v in sparse.iter_mut().take(11) {
            *v = f64::NAN;
        }

        let settings = BatchSettings::default();
        let with_sparse: Vec<(&str, &[f64])> = vec![
            ("a", a.as_slice()),
            ("sparse", sparse.as_slice()),
            ("b", b.as_slice()),
        ];
        let without: Vec<(&str, &[f64])> = vec![("a", a.as_slice()), ("b", b.as_slice())];

        let gated = run_batch("batch", "score", &y, &with_sparse, &settings).expect("batch");
        let reference = run_batch("batch", "score", &y, &without, &settings).expect("batch");

        let row = &gated.rows[1];
        assert_eq!(row.n, 29);
        assert!(row.r.is_nan() && row.p.is_nan());
        assert!(row.ci_lower.is_nan() && row.ci_upper.is_nan());
        assert!(row.p_fdr.is_nan());
        assert!(!row.fdr_significant);

        assert_eq!(gated.family_size, 2);
        assert_eq!(gated.rows[0].p_fdr.to_bits(), reference.rows[0].p_fdr.to_bits());
        assert_eq!(gated.rows[2].p_fdr.to_bits(), reference.rows[1].p_fdr.to_bits());
    }

    #[test]
    fn test_gate_threshold_is_inclusive() {
        let y = outcome(30);
        let a = strong(&y);
        let vars: Vec<(&str, &[f64])> = vec![("a", a.as_slice())];
        let result = run_batch("batch", "score", &y, &vars, &BatchSettings::default())
            .expect("batch");

        assert_eq!(result.rows[0].n, 30);
        assert!(!result.rows[0].r.is_nan());
        assert_eq!(result.family_size, 1);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let y = outcome(40);
        let short = vec![1.0; 39];
        let vars: Vec<(&str, &[f64])> = vec![("short", short.as_slice())];

        let err = run_batch("batch", "score", &y, &vars, &BatchSettings::default())
            .expect_err("mismatch");
        assert!(matches!(err, AssocError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_batch() {
        let y = outcome(40);
        let result = run_batch("empty", "score", &y, &[], &BatchSettings::default())
            .expect("batch");

        assert!(result.rows.is_empty());
        assert_eq!(result.family_size, 0);
        assert!(result.critical_p.is_nan());
        assert_eq!(result.n_significant(), 0);
    }

    #[test]
    fn test_all_gated_batch() {
        let y = outcome(20);
        let a = strong(&y);
        let vars: Vec<(&str, &[f64])> = vec![("a", a.as_slice())];
        let result = run_batch("batch", "score", &y, &vars, &BatchSettings::default())
            .expect("batch");

        assert_eq!(result.family_size, 0);
        assert!(result.critical_p.is_nan());
        assert!(!result.rows[0].fdr_significant);
    }

    #[test]
    fn test_invalid_levels() {
        let y = outcome(40);
        let a = strong(&y);
        let vars: Vec<(&str, &[f64])> = vec![("a", a.as_slice())];
        let bad_q = BatchSettings {
            q: 0.0,
            ..BatchSettings::default()
        };
        let bad_alpha = BatchSettings {
            alpha: 1.0,
            ..BatchSettings::default()
        };

        assert!(run_batch("batch", "score", &y, &vars, &bad_q).is_err());
        assert!(run_batch("batch", "score", &y, &vars, &bad_alpha).is_err());
    }

    #[test]
    fn test_invalid_levels_with_no_variables() {
        let y = outcome(40);
        let bad_alpha = BatchSettings {
            alpha: 1.5,
            ..BatchSettings::default()
        };
        let bad_q = BatchSettings {
            q: f64::NAN,
            ..BatchSettings::default()
        };

        assert!(matches!(
            run_batch("empty", "score", &y, &[], &bad_alpha),
            Err(AssocError::InvalidInput(_))
        ));
        assert!(run_batch("empty", "score", &y, &[], &bad_q).is_err());
    }
}
