//! Outcome comparisons across groups: one-way ANOVA, pairwise t-tests and
//! Cohen's d

use crate::stats::descriptive::{mean, sample_variance};
use crate::stats::effect::{cohens_d, interpret};
use crate::structs::{
    AnovaResult, AssocError, ColumnStats, EffectKind, GroupComparison, PairwiseComparison, Result,
    TTestResult,
};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use std::collections::BTreeMap;

/// One-way ANOVA over the non-missing values of each group
///
/// Empty groups are ignored. Returns `None` when fewer than two groups
/// remain, there are no within-group degrees of freedom, or every value is
/// identical.
///
/// # Errors
/// Returns error if the F distribution cannot be constructed
#[allow(clippy::cast_precision_loss)]
pub fn one_way_anova(groups: &[&[f64]]) -> Result<Option<AnovaResult>> {
    let groups: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| g.iter().copied().filter(|v| !v.is_nan()).collect::<Vec<_>>())
        .filter(|g| !g.is_empty())
        .collect();

    let k = groups.len();
    let n: usize = groups.iter().map(Vec::len).sum();
    if k < 2 || n <= k {
        return Ok(None);
    }

    let grand_mean = groups.iter().flatten().sum::<f64>() / n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in &groups {
        let m = mean(g);
        ss_between += g.len() as f64 * (m - grand_mean).powi(2);
        ss_within += g.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }

    let ss_total = ss_between + ss_within;
    if ss_total == 0.0 {
        return Ok(None);
    }

    let df_between = k - 1;
    let df_within = n - k;
    let f_statistic = (ss_between / df_between as f64) / (ss_within / df_within as f64);
    let p = if f_statistic.is_infinite() {
        0.0
    } else {
        FisherSnedecor::new(df_between as f64, df_within as f64)
            .map_err(|e| AssocError::Stats(format!("F({df_between}, {df_within}): {e}")))?
            .sf(f_statistic)
            .clamp(0.0, 1.0)
    };

    Ok(Some(AnovaResult {
        f_statistic,
        df_between,
        df_within,
        p,
        eta_squared: ss_between / ss_total,
    }))
}

/// Two-sided two-sample t-test of `a` against `b`
///
/// Welch's unequal-variance test unless `equal_variances` is set, in which
/// case the pooled-variance Student test is used. NaN entries are skipped.
/// Returns `None` when either group has fewer than two values or the
/// standard error is zero.
///
/// # Errors
/// Returns error if the t distribution cannot be constructed
#[allow(clippy::cast_precision_loss)]
pub fn two_sample_t_test(a: &[f64], b: &[f64], equal_variances: bool) -> Result<Option<TTestResult>> {
    let a: Vec<f64> = a.iter().copied().filter(|v| !v.is_nan()).collect();
    let b: Vec<f64> = b.iter().copied().filter(|v| !v.is_nan()).collect();
    if a.len() < 2 || b.len() < 2 {
        return Ok(None);
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (var_a, var_b) = (sample_variance(&a), sample_variance(&b));

    let (std_error, df) = if equal_variances {
        let pooled = ((n_a - 1.0) * var_a + (n_b - 1.0) * var_b) / (n_a + n_b - 2.0);
        ((pooled * (1.0 / n_a + 1.0 / n_b)).sqrt(), n_a + n_b - 2.0)
    } else {
        let (sa, sb) = (var_a / n_a, var_b / n_b);
        let welch_df = (sa + sb).powi(2) / (sa.powi(2) / (n_a - 1.0) + sb.powi(2) / (n_b - 1.0));
        ((sa + sb).sqrt(), welch_df)
    };
    if std_error == 0.0 || !std_error.is_finite() {
        return Ok(None);
    }

    let t_statistic = (mean(&a) - mean(&b)) / std_error;
    let p = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AssocError::Stats(format!("t distribution with {df} df: {e}")))?
        .sf(t_statistic.abs());

    Ok(Some(TTestResult {
        t_statistic,
        df,
        p: (2.0 * p).clamp(0.0, 1.0),
        equal_variances,
    }))
}

/// Compare `values` across the levels of `labels`
///
/// Rows with an empty label or a missing value are skipped. Groups are
/// reported in sorted label order, and every pair gets a Cohen's d with its
/// magnitude plus a two-sample t-test.
///
/// # Errors
/// Returns `InvalidInput` if `labels` and `values` differ in length
pub fn compare_groups(
    outcome: &str,
    labels: &[&str],
    values: &[f64],
    equal_variances: bool,
) -> Result<GroupComparison> {
    if labels.len() != values.len() {
        return Err(AssocError::InvalidInput(format!(
            "group labels ({}) and {outcome} values ({}) differ in length",
            labels.len(),
            values.len()
        )));
    }

    let mut by_group: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (&label, &value) in labels.iter().zip(values) {
        if label.is_empty() || value.is_nan() {
            continue;
        }
        by_group.entry(label).or_default().push(value);
    }

    let groups = by_group
        .iter()
        .map(|(label, vals)| ColumnStats::calculate(label, vals))
        .collect::<Result<Vec<_>>>()?;

    let slices: Vec<&[f64]> = by_group.values().map(Vec::as_slice).collect();
    let anova = one_way_anova(&slices)?;

    let entries: Vec<(&str, &Vec<f64>)> = by_group.iter().map(|(k, v)| (*k, v)).collect();
    let mut pairs = Vec::new();
    for (i, (name_a, a)) in entries.iter().enumerate() {
        for (name_b, b) in &entries[i + 1..] {
            let d = cohens_d(a, b);
            pairs.push(PairwiseComparison {
                group_a: (*name_a).to_string(),
                group_b: (*name_b).to_string(),
                n_a: a.len(),
                n_b: b.len(),
                mean_a: mean(a),
                mean_b: mean(b),
                cohens_d: d,
                magnitude: (!d.is_nan()).then(|| interpret(d, EffectKind::MeanDifference)),
                t_test: two_sample_t_test(a, b, equal_variances)?,
            });
        }
    }

    Ok(GroupComparison {
        outcome: outcome.to_string(),
        groups,
        anova,
        pairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::EffectMagnitude;

    #[test]
    fn test_anova_known_value() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 3.0, 4.0];
        let c = [5.0, 6.0, 7.0];
        let result = one_way_anova(&[&a, &b, &c])
            .expect("anova")
            .expect("defined");

        assert!((result.f_statistic - 13.0).abs() < 1e-9);
        assert_eq!(result.df_between, 2);
        assert_eq!(result.df_within, 6);
        assert!((result.p - 0.006_591_796_875).abs() < 1e-6);
        assert!((result.eta_squared - 0.8125).abs() < 1e-9);
    }

    #[test]
    fn test_anova_degenerate() {
        let a = [1.0, 2.0];
        assert!(one_way_anova(&[&a]).expect("anova").is_none());
        assert!(one_way_anova(&[&a, &[]]).expect("anova").is_none());
        assert!(one_way_anova(&[&[1.0], &[2.0]]).expect("anova").is_none());
        assert!(one_way_anova(&[&[3.0, 3.0], &[3.0, 3.0]])
            .expect("anova")
            .is_none());
    }

    #[test]
    fn test_anova_no_within_variance() {
        let result = one_way_anova(&[&[1.0, 1.0], &[2.0, 2.0]])
            .expect("anova")
            .expect("defined");
        assert!(result.f_statistic.is_infinite());
        assert_eq!(result.p, 0.0);
    }

    #[test]
    fn test_compare_groups() {
        let labels = ["HC", "MDD", "HC", "MDD", "HC", "MDD", "", "BD", "BD"];
        let values = [1.0, 2.0, 2.0, 3.0, 3.0, f64::NAN, 9.0, 5.0, 6.0];
        let result = compare_groups("score", &labels, &values, false).expect("compare");

        let names: Vec<&str> = result.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["BD", "HC", "MDD"]);
        assert_eq!(result.groups[2].count, 2);
        assert_eq!(result.pairs.len(), 3);

        let hc_mdd = &result.pairs[2];
        assert_eq!(hc_mdd.group_a, "HC");
        assert_eq!(hc_mdd.group_b, "MDD");
        assert!(hc_mdd.cohens_d < 0.0);
        assert_eq!(hc_mdd.magnitude, Some(EffectMagnitude::Medium));
        let t_test = hc_mdd.t_test.expect("t-test defined");
        assert!(t_test.t_statistic < 0.0);
        assert!(!t_test.equal_variances);
        assert!(result.anova.is_some());
    }

    #[test]
    fn test_welch_t_test_known_value() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 3.0, 4.0, 5.0];
        let result = two_sample_t_test(&a, &b, false)
            .expect("t-test")
            .expect("defined");

        assert!((result.t_statistic + 1.732_050_807_568_877).abs() < 1e-9);
        assert!((result.df - 4.959_183_673_469_388).abs() < 1e-9);
        assert!((result.p - 0.144_293_043_083_944).abs() < 1e-5);
        assert!(!result.equal_variances);
    }

    #[test]
    fn test_student_t_test_known_value() {
        let a = [1.0, 2.0, 3.0, f64::NAN];
        let b = [2.0, 3.0, 4.0, 5.0];
        let result = two_sample_t_test(&a, &b, true)
            .expect("t-test")
            .expect("defined");

        assert!((result.t_statistic + 1.659_850_005_517_464).abs() < 1e-9);
        assert!((result.df - 5.0).abs() < f64::EPSILON);
        assert!((result.p - 0.157_838_810_631_696).abs() < 1e-5);
    }

    #[test]
    fn test_t_test_degenerate() {
        assert!(two_sample_t_test(&[1.0], &[2.0, 3.0], false)
            .expect("t-test")
            .is_none());
        assert!(two_sample_t_test(&[4.0, 4.0], &[4.0, 4.0, 4.0], true)
            .expect("t-test")
            .is_none());
    }

    #[test]
    fn test_compare_groups_length_mismatch() {
        assert!(compare_groups("score", &["a"], &[1.0, 2.0], false).is_err());
    }
}
