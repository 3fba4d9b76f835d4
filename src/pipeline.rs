//! Analysis pipeline that runs every configured batch against every outcome

use crate::config::AnalysisConfig;
use crate::csv_reader::mask_invalid_scores;
use crate::stats::batch::run_batch;
use crate::stats::fdr::correct;
use crate::stats::group::compare_groups;
use crate::stats::reduction::run_pca;
use crate::stats::regression::interaction_model;
use crate::structs::{
    AnalysisResult, ColumnStats, CsvData, FeatureMatrix, GroupComparison, InteractionModel,
    PcaResult, Result,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Run the full analysis pipeline
///
/// # Errors
/// Returns error if a configured column is missing or a batch run fails.
/// Group comparison, interaction model and PCA failures are non-fatal
/// (logged and left out).
pub fn run_pipeline(data: &CsvData, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let settings = config.batch_settings();

    let mut outcomes = Vec::with_capacity(config.outcomes.len());
    let mut outcome_stats = Vec::new();
    for name in &config.outcomes {
        let raw = data.numeric_column_by_name(name)?;
        let cleaned = mask_invalid_scores(&raw, config.missing_code, config.outlier_threshold);
        match ColumnStats::calculate(name, &cleaned) {
            Ok(stats) => {
                info!(outcome = %name, valid = stats.count, masked = stats.missing, "outcome loaded");
                outcome_stats.push(stats);
            }
            Err(e) => warn!(outcome = %name, "no usable outcome values: {e}"),
        }
        outcomes.push((name.as_str(), cleaned));
    }

    let mut columns: HashMap<&str, Vec<f64>> = HashMap::new();
    for variable in config.batches.iter().flat_map(|b| &b.variables) {
        if !columns.contains_key(variable.as_str()) {
            columns.insert(variable, data.numeric_column_by_name(variable)?);
        }
    }

    let mut batches = Vec::new();
    for batch in &config.batches {
        let variables: Vec<(&str, &[f64])> = batch
            .variables
            .iter()
            .map(|v| (v.as_str(), columns[v.as_str()].as_slice()))
            .collect();

        for (outcome_name, outcome) in &outcomes {
            let result = run_batch(&batch.name, outcome_name, outcome, &variables, &settings)?;
            info!(
                batch = %batch.name,
                outcome = %outcome_name,
                family_size = result.family_size,
                significant = result.n_significant(),
                "batch complete"
            );
            batches.push(result);
        }
    }

    let group_comparisons = config
        .group_column
        .as_deref()
        .map(|column| run_group_comparisons(data, column, &outcomes, config.equal_variances))
        .unwrap_or_default();

    let interactions = run_interactions(data, config, &outcomes, &columns);

    let pca = config.pca.as_ref().and_then(|pca_config| {
        run_pca_safe(
            data,
            &outcomes,
            &pca_config.variables,
            pca_config.components,
            config.min_pca_samples,
            config.id_column.as_deref(),
        )
    });

    Ok(AnalysisResult {
        outcome_stats,
        batches,
        group_comparisons,
        interactions,
        pca,
    })
}

/// Compare each outcome across the groups of `column`. Non-fatal.
fn run_group_comparisons(
    data: &CsvData,
    column: &str,
    outcomes: &[(&str, Vec<f64>)],
    equal_variances: bool,
) -> Vec<GroupComparison> {
    let labels = match data.text_column_by_name(column) {
        Ok(labels) => labels,
        Err(e) => {
            warn!("group comparison skipped: {e}");
            return Vec::new();
        }
    };

    outcomes
        .iter()
        .filter_map(|(name, values)| match compare_groups(name, &labels, values, equal_variances) {
            Ok(comparison) => Some(comparison),
            Err(e) => {
                warn!(outcome = %name, "group comparison failed: {e}");
                None
            }
        })
        .collect()
}

/// Run PCA on the complete cases of `variables`. Non-fatal.
///
/// Outcome columns enter with their invalid scores already masked.
fn run_pca_safe(
    data: &CsvData,
    outcomes: &[(&str, Vec<f64>)],
    variables: &[String],
    components: usize,
    min_samples: usize,
    id_column: Option<&str>,
) -> Option<PcaResult> {
    let columns = match variables
        .iter()
        .map(|v| match outcomes.iter().find(|(name, _)| *name == v.as_str()) {
            Some((_, cleaned)) => Ok(cleaned.clone()),
            None => data.numeric_column_by_name(v),
        })
        .collect::<Result<Vec<_>>>()
    {
        Ok(columns) => columns,
        Err(e) => {
            warn!("PCA skipped: {e}");
            return None;
        }
    };

    let names: Vec<&str> = variables.iter().map(String::as_str).collect();
    let slices: Vec<&[f64]> = columns.iter().map(Vec::as_slice).collect();
    let features = match FeatureMatrix::from_columns(&names, &slices) {
        Ok(features) => features,
        Err(e) => {
            warn!("PCA skipped: {e}");
            return None;
        }
    };

    if features.n_samples() < min_samples {
        warn!(
            complete_rows = features.n_samples(),
            min_samples, "PCA skipped: too few complete rows"
        );
        return None;
    }

    let standardized = features.standardize();
    let mut result = match run_pca(&standardized, components) {
        Ok(result) => result,
        Err(e) => {
            warn!("PCA failed: {e}");
            return None;
        }
    };

    if let Some(id_column) = id_column {
        match data.text_column_by_name(id_column) {
            Ok(ids) => {
                result.subjects = standardized
                    .row_indices
                    .iter()
                    .map(|&row| ids[row].to_string())
                    .collect();
            }
            Err(e) => warn!("PCA subject ids not reported: {e}"),
        }
    }

    Some(result)
}

/// Fit the interaction model for every configured variable against every
/// outcome, then BH-correct the interaction p-values per outcome. Non-fatal.
fn run_interactions(
    data: &CsvData,
    config: &AnalysisConfig,
    outcomes: &[(&str, Vec<f64>)],
    columns: &HashMap<&str, Vec<f64>>,
) -> Vec<InteractionModel> {
    let Some(interaction) = &config.interaction else {
        return Vec::new();
    };

    let covariate = match data.numeric_column_by_name(&interaction.covariate) {
        Ok(values) => values,
        Err(e) => {
            warn!("interaction models skipped: {e}");
            return Vec::new();
        }
    };

    let mut variables: Vec<(&str, Vec<f64>)> = Vec::new();
    for name in interaction.resolve_variables(&config.batches) {
        match columns.get(name) {
            Some(values) => variables.push((name, values.clone())),
            None => match data.numeric_column_by_name(name) {
                Ok(values) => variables.push((name, values)),
                Err(e) => warn!("interaction model skipped: {e}"),
            },
        }
    }

    let mut models = Vec::new();
    for (outcome_name, outcome) in outcomes {
        let mut family: Vec<InteractionModel> = variables
            .iter()
            .filter_map(|(name, values)| {
                match interaction_model(
                    outcome_name,
                    outcome,
                    name,
                    values,
                    &interaction.covariate,
                    &covariate,
                ) {
                    Ok(Some(model)) => Some(model),
                    Ok(None) => {
                        debug!(outcome = %outcome_name, variable = %name, "interaction model not estimable");
                        None
                    }
                    Err(e) => {
                        warn!(outcome = %outcome_name, variable = %name, "interaction model failed: {e}");
                        None
                    }
                }
            })
            .collect();

        let pvals: Vec<f64> = family
            .iter()
            .map(|m| m.interaction().map_or(f64::NAN, |t| t.p))
            .collect();
        match correct(&pvals, config.fdr_q) {
            Ok(fdr) => {
                for (i, model) in family.iter_mut().enumerate() {
                    model.interaction_p_fdr = fdr.adjusted_p[i];
                    model.interaction_significant = fdr.significant[i];
                }
                info!(
                    outcome = %outcome_name,
                    covariate = %interaction.covariate,
                    models = family.len(),
                    significant = fdr.discoveries(),
                    "interaction models complete"
                );
            }
            Err(e) => warn!(outcome = %outcome_name, "interaction FDR failed: {e}"),
        }
        models.extend(family);
    }

    models
}
