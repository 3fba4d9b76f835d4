//! Output file writers for the analyze command

use crate::config::AnalysisConfig;
use crate::stats::effect::interpret;
use crate::stats::select::select;
use crate::structs::{
    AnalysisResult, BatchResult, CsvData, EffectKind, GroupComparison, InteractionModel, Result,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// One row of a univariate correlation table, in the exported column layout
#[derive(Serialize)]
struct CorrelationCsvRow<'a> {
    #[serde(rename = "Variable")]
    variable: &'a str,
    r: f64,
    p_uncorrected: f64,
    n: usize,
    #[serde(rename = "CI_lower")]
    ci_lower: f64,
    #[serde(rename = "CI_upper")]
    ci_upper: f64,
    #[serde(rename = "p_FDR")]
    p_fdr: f64,
    #[serde(rename = "FDR_significant")]
    fdr_significant: u8,
}

#[derive(Serialize)]
struct GroupCsvRow<'a> {
    #[serde(rename = "Group_A")]
    group_a: &'a str,
    #[serde(rename = "Group_B")]
    group_b: &'a str,
    #[serde(rename = "n_A")]
    n_a: usize,
    #[serde(rename = "n_B")]
    n_b: usize,
    #[serde(rename = "mean_A")]
    mean_a: f64,
    #[serde(rename = "mean_B")]
    mean_b: f64,
    cohens_d: f64,
    magnitude: &'a str,
    t: f64,
    df: f64,
    p_t: f64,
}

#[derive(Serialize)]
struct InteractionCsvRow<'a> {
    #[serde(rename = "Variable")]
    variable: &'a str,
    n: usize,
    beta_variable: f64,
    beta_covariate: f64,
    beta_interaction: f64,
    se_interaction: f64,
    t_interaction: f64,
    p_interaction: f64,
    #[serde(rename = "p_FDR")]
    p_fdr: f64,
    #[serde(rename = "FDR_significant")]
    fdr_significant: u8,
    #[serde(rename = "R2")]
    r_squared: f64,
}

/// Keep file names portable
fn file_component(name: &str) -> String {
    name.chars()
        .map(|c| select(c.is_ascii_alphanumeric() || c == '-', c, '_'))
        .collect()
}

/// Write `Univariate_Correlations_<batch>_<outcome>.csv`
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_correlations(
    output_dir: &Path,
    batch: &BatchResult,
    config: &AnalysisConfig,
) -> Result<PathBuf> {
    let path = output_dir.join(format!(
        "Univariate_Correlations_{}_{}.csv",
        file_component(&batch.batch),
        file_component(&batch.outcome)
    ));

    let mut writer = csv::Writer::from_path(&path)?;
    for row in &batch.rows {
        writer.serialize(CorrelationCsvRow {
            variable: config.label(&row.name),
            r: row.r,
            p_uncorrected: row.p,
            n: row.n,
            ci_lower: row.ci_lower,
            ci_upper: row.ci_upper,
            p_fdr: row.p_fdr,
            fdr_significant: select(row.fdr_significant, 1, 0),
        })?;
    }
    writer.flush()?;

    Ok(path)
}

/// Write `Group_Comparisons_<outcome>.csv`
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_group_comparisons(output_dir: &Path, comparison: &GroupComparison) -> Result<PathBuf> {
    let path = output_dir.join(format!(
        "Group_Comparisons_{}.csv",
        file_component(&comparison.outcome)
    ));

    let mut writer = csv::Writer::from_path(&path)?;
    for pair in &comparison.pairs {
        writer.serialize(GroupCsvRow {
            group_a: &pair.group_a,
            group_b: &pair.group_b,
            n_a: pair.n_a,
            n_b: pair.n_b,
            mean_a: pair.mean_a,
            mean_b: pair.mean_b,
            cohens_d: pair.cohens_d,
            magnitude: pair.magnitude.map_or("", |m| m.label()),
            t: pair.t_test.map_or(f64::NAN, |t| t.t_statistic),
            df: pair.t_test.map_or(f64::NAN, |t| t.df),
            p_t: pair.t_test.map_or(f64::NAN, |t| t.p),
        })?;
    }
    writer.flush()?;

    Ok(path)
}

/// Write `Interaction_<covariate>_<outcome>.csv` for every outcome that has
/// interaction models
///
/// # Errors
/// Returns error if a file cannot be written
pub fn write_interactions(
    output_dir: &Path,
    models: &[InteractionModel],
    config: &AnalysisConfig,
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut start = 0;
    while start < models.len() {
        let first = &models[start];
        let end = models[start..]
            .iter()
            .position(|m| m.outcome != first.outcome)
            .map_or(models.len(), |offset| start + offset);

        let path = output_dir.join(format!(
            "Interaction_{}_{}.csv",
            file_component(&first.covariate),
            file_component(&first.outcome)
        ));
        let mut writer = csv::Writer::from_path(&path)?;
        for model in &models[start..end] {
            let coef = |i: usize| model.fit.terms.get(i).map_or(f64::NAN, |t| t.estimate);
            let inter = model.interaction();
            writer.serialize(InteractionCsvRow {
                variable: config.label(&model.variable),
                n: model.fit.n,
                beta_variable: coef(1),
                beta_covariate: coef(2),
                beta_interaction: coef(3),
                se_interaction: inter.map_or(f64::NAN, |t| t.std_error),
                t_interaction: inter.map_or(f64::NAN, |t| t.t_statistic),
                p_interaction: inter.map_or(f64::NAN, |t| t.p),
                p_fdr: model.interaction_p_fdr,
                fdr_significant: select(model.interaction_significant, 1, 0),
                r_squared: model.fit.r_squared,
            })?;
        }
        writer.flush()?;
        paths.push(path);
        start = end;
    }
    Ok(paths)
}

/// Build the human-readable `summary.txt` content
#[must_use]
pub fn build_summary(
    data_path: &Path,
    data: &CsvData,
    result: &AnalysisResult,
    config: &AnalysisConfig,
) -> String {
    let mut s = format!(
        "Clinical association analysis\nData: {} ({} rows x {} columns)\n",
        data_path.display(),
        data.row_count(),
        data.col_count()
    );
    let _ = writeln!(
        s,
        "FDR q = {}, CI level = {:.0}%, minimum n = {}",
        config.fdr_q,
        (1.0 - config.alpha) * 100.0,
        config.min_n
    );

    if !result.outcome_stats.is_empty() {
        s.push_str("\nOutcome scores\n");
        for stats in &result.outcome_stats {
            let _ = writeln!(s, "  {}", stats.summary());
        }
    }

    s.push_str("\nUnivariate correlations\n");
    for batch in &result.batches {
        let critical = if batch.n_significant() > 0 {
            format!("{:.4}", batch.critical_p)
        } else {
            "none".to_string()
        };
        let _ = writeln!(
            s,
            "  [{}] vs {}: {} of {} tested variables FDR-significant (critical p: {critical})",
            batch.batch,
            batch.outcome,
            batch.n_significant(),
            batch.family_size
        );
        for row in batch.significant_rows() {
            let _ = writeln!(
                s,
                "    {} r={:.3} [{:.3}, {:.3}] q={:.4} n={} ({})",
                config.label(&row.name),
                row.r,
                row.ci_lower,
                row.ci_upper,
                row.p_fdr,
                row.n,
                interpret(row.r, EffectKind::Correlation)
            );
        }
    }

    for comparison in &result.group_comparisons {
        let _ = writeln!(s, "\nGroup comparison: {}", comparison.outcome);
        if let Some(anova) = &comparison.anova {
            let _ = writeln!(
                s,
                "  ANOVA F({}, {}) = {:.3}, p = {:.4}{}, eta^2 = {:.3}",
                anova.df_between,
                anova.df_within,
                anova.f_statistic,
                anova.p,
                select(anova.p < config.alpha, " *", ""),
                anova.eta_squared
            );
        }
        for pair in &comparison.pairs {
            let t_test = pair.t_test.map_or_else(String::new, |t| {
                format!(
                    ", t({:.1}) = {:.3}, p = {:.4}{}",
                    t.df,
                    t.t_statistic,
                    t.p,
                    select(t.p < config.alpha, " *", "")
                )
            });
            let _ = writeln!(
                s,
                "  {} vs {}: d = {:.3} ({}){t_test}",
                pair.group_a,
                pair.group_b,
                pair.cohens_d,
                pair.magnitude.map_or("undefined", |m| m.label())
            );
        }
    }

    if let Some(first) = result.interactions.first() {
        let _ = writeln!(s, "\nInteraction models (variable x {})", first.covariate);
        for model in &result.interactions {
            if let Some(term) = model.interaction() {
                let _ = writeln!(
                    s,
                    "  {} ~ {}: b = {:.4}, p = {:.4}, q = {:.4}{} (n={}, R2={:.3})",
                    model.outcome,
                    term.name,
                    term.estimate,
                    term.p,
                    model.interaction_p_fdr,
                    select(model.interaction_significant, " *", ""),
                    model.fit.n,
                    model.fit.r_squared
                );
            }
        }
    }

    if let Some(pca) = &result.pca {
        let _ = writeln!(
            s,
            "\nPCA on {} complete rows ({} components)",
            pca.n_samples, pca.n_components
        );
        for (i, (ratio, cumulative)) in pca
            .explained_variance_ratio
            .iter()
            .zip(&pca.cumulative_variance)
            .enumerate()
        {
            let _ = writeln!(
                s,
                "  PC{}: {:.1}% (cumulative {:.1}%)",
                i + 1,
                ratio * 100.0,
                cumulative * 100.0
            );
        }
    }

    s
}

/// Write `summary.txt`
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_summary(output_dir: &Path, content: &str) -> Result<()> {
    fs::write(output_dir.join("summary.txt"), content)?;
    Ok(())
}

/// Write `stats.json` - machine-readable results (undefined numbers as null)
///
/// # Errors
/// Returns error if file cannot be written
pub fn write_stats_json(output_dir: &Path, result: &AnalysisResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    fs::write(output_dir.join("stats.json"), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::run_pipeline;
    use crate::pipeline::tests::{create_test_csv, test_config};
    use crate::structs::BatchRow;
    use tempfile::TempDir;

    fn sample_batch() -> BatchResult {
        BatchResult {
            batch: "Clinical Symptoms".into(),
            outcome: "score".into(),
            rows: vec![
                BatchRow {
                    name: "ids_total".into(),
                    r: 0.42,
                    p: 0.001,
                    n: 120,
                    ci_lower: 0.26,
                    ci_upper: 0.56,
                    p_fdr: 0.002,
                    fdr_significant: true,
                },
                BatchRow {
                    name: "panic".into(),
                    r: f64::NAN,
                    p: f64::NAN,
                    n: 12,
                    ci_lower: f64::NAN,
                    ci_upper: f64::NAN,
                    p_fdr: f64::NAN,
                    fdr_significant: false,
                },
            ],
            family_size: 1,
            critical_p: 0.001,
        }
    }

    #[test]
    fn test_write_correlations() {
        let dir = TempDir::new().expect("create temp dir");
        let mut config = test_config();
        config.labels.insert("ids_total".into(), "IDS total".into());

        let path = write_correlations(dir.path(), &sample_batch(), &config).expect("write");
        assert!(path.ends_with("Univariate_Correlations_Clinical_Symptoms_score.csv"));

        let content = fs::read_to_string(&path).expect("read");
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("Variable,r,p_uncorrected,n,CI_lower,CI_upper,p_FDR,FDR_significant")
        );
        assert_eq!(lines.next(), Some("IDS total,0.42,0.001,120,0.26,0.56,0.002,1"));
        assert_eq!(lines.next(), Some("panic,NaN,NaN,12,NaN,NaN,NaN,0"));
    }

    #[test]
    fn test_file_component() {
        assert_eq!(file_component("OOCV-7 score"), "OOCV-7_score");
        assert_eq!(file_component("a/b"), "a_b");
    }

    #[test]
    fn test_outputs_from_pipeline() {
        let dir = TempDir::new().expect("create temp dir");
        let csv = create_test_csv();
        let config = test_config();
        let result = run_pipeline(&csv, &config).expect("pipeline");

        let summary = build_summary(Path::new("cohort.csv"), &csv, &result, &config);
        assert!(summary.contains("cohort.csv (48 rows x 7 columns)"));
        assert!(summary.contains("[symptoms] vs score: 1 of 2 tested variables FDR-significant"));
        assert!(summary.contains("severity r="));
        assert!(summary.contains("very large"));
        assert!(summary.contains("ANOVA F(2, 43)"));
        assert!(summary.contains("PC1:"));
        assert!(summary.contains("Interaction models (variable x age)"));
        assert!(summary.contains("score ~ severity:age"));

        write_summary(dir.path(), &summary).expect("summary");
        write_stats_json(dir.path(), &result).expect("json");
        let path =
            write_group_comparisons(dir.path(), &result.group_comparisons[0]).expect("groups");

        let json: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("stats.json")).expect("read"),
        )
        .expect("valid json");
        assert_eq!(json["batches"][0]["family_size"], 2);
        assert!(json["batches"][0]["rows"][2]["r"].is_null());

        let groups = fs::read_to_string(path).expect("read");
        assert!(groups
            .starts_with("Group_A,Group_B,n_A,n_B,mean_A,mean_B,cohens_d,magnitude,t,df,p_t"));
        assert_eq!(groups.lines().count(), 4);

        let paths =
            write_interactions(dir.path(), &result.interactions, &config).expect("interactions");
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("Interaction_age_score.csv"));
        let table = fs::read_to_string(&paths[0]).expect("read");
        let mut lines = table.lines();
        assert_eq!(
            lines.next(),
            Some("Variable,n,beta_variable,beta_covariate,beta_interaction,se_interaction,t_interaction,p_interaction,p_FDR,FDR_significant,R2")
        );
        assert!(lines.next().is_some_and(|l| l.starts_with("severity,46,")));
        assert_eq!(json["interactions"].as_array().map(Vec::len), Some(3));
        assert!(json["pca"]["subjects"][0] == "S2");
    }
}
