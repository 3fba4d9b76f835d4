#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use clinassoc::error::check_level;
use clinassoc::stats::effect::interpret;
use clinassoc::stats::fdr;
use clinassoc::stats::select::select;
use clinassoc::structs::{CsvData, EffectKind};
use clinassoc::{output, pipeline, AnalysisConfig, AssocError, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

/// clinassoc - FDR-corrected correlation analysis for clinical data
#[derive(Parser, Debug)]
#[command(name = "clinassoc")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// More log output (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the batch correlation analysis on a data file
    Analyze {
        /// Input CSV/TSV file, one row per subject
        #[arg(short, long)]
        data: PathBuf,

        /// JSON analysis configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory for result files
        #[arg(short, long, default_value = "./clinassoc_output")]
        output_dir: PathBuf,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,

        /// FDR level (overrides config)
        #[arg(long)]
        q: Option<f64>,

        /// CI significance level (overrides config)
        #[arg(long)]
        alpha: Option<f64>,

        /// Minimum complete pairs per test (overrides config)
        #[arg(long)]
        min_n: Option<usize>,
    },

    /// Benjamini-Hochberg correction of a list of p-values
    Fdr {
        /// FDR level
        #[arg(long, default_value = "0.05")]
        q: f64,

        /// p-values; `nan` marks an undefined test
        #[arg(required = true)]
        pvalues: Vec<f64>,
    },

    /// Classify an effect size
    Effect {
        /// `correlation` (r) or `mean_difference` (d)
        #[arg(short, long, default_value = "correlation")]
        kind: String,

        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
}

fn main() {
    let args = Args::parse();

    let level = select(
        args.verbose,
        Level::DEBUG,
        select(args.quiet, Level::WARN, Level::INFO),
    );
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Option<Commands>) -> Result<()> {
    match command {
        Some(Commands::Analyze {
            data,
            config,
            output_dir,
            tsv,
            q,
            alpha,
            min_n,
        }) => {
            let mut config = load_config(&config)?;
            if let Some(q) = q {
                config.fdr_q = q;
            }
            if let Some(alpha) = alpha {
                config.alpha = alpha;
            }
            if let Some(min_n) = min_n {
                config.min_n = min_n;
            }
            config.validate()?;
            run_analyze(&data, &output_dir, &config, tsv)
        }

        Some(Commands::Fdr { q, pvalues }) => {
            print!("{}", fdr_report(&pvalues, q)?);
            Ok(())
        }

        Some(Commands::Effect { kind, value }) => {
            println!("{}", effect_report(&kind, value)?);
            Ok(())
        }

        None => {
            eprintln!("No subcommand provided. Use 'clinassoc analyze' or 'clinassoc fdr'.");
            eprintln!("Run 'clinassoc --help' for usage information.");
            std::process::exit(1);
        }
    }
}

fn load_config(path: &Path) -> Result<AnalysisConfig> {
    if !path.exists() {
        return Err(AssocError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    AnalysisConfig::from_file(path)
}

/// Run the analysis and write every result file
fn run_analyze(
    data_path: &Path,
    output_dir: &Path,
    config: &AnalysisConfig,
    tsv: bool,
) -> Result<()> {
    if !data_path.exists() {
        return Err(AssocError::Config(format!(
            "Data file not found: {}",
            data_path.display()
        )));
    }

    std::fs::create_dir_all(output_dir)?;

    info!("Analyzing: {}", data_path.display());
    let data = CsvData::from_file(data_path, tsv)?;
    info!(
        "Loaded {} rows x {} columns",
        data.row_count(),
        data.col_count()
    );

    let result = pipeline::run_pipeline(&data, config)?;

    let mut written = Vec::new();
    for batch in &result.batches {
        written.push(output::write_correlations(output_dir, batch, config)?);
    }
    for comparison in &result.group_comparisons {
        written.push(output::write_group_comparisons(output_dir, comparison)?);
    }
    written.extend(output::write_interactions(
        output_dir,
        &result.interactions,
        config,
    )?);

    let summary = output::build_summary(data_path, &data, &result, config);
    output::write_summary(output_dir, &summary)?;
    output::write_stats_json(output_dir, &result)?;

    info!("Output written to {}", output_dir.display());
    for path in &written {
        if let Some(name) = path.file_name() {
            info!("  - {}", name.to_string_lossy());
        }
    }
    info!("  - summary.txt");
    info!("  - stats.json");

    Ok(())
}

/// One line per p-value (p, q-value, flag), then the critical p
fn fdr_report(pvalues: &[f64], q: f64) -> Result<String> {
    check_level("q", q)?;
    let result = fdr::correct(pvalues, q)?;

    let mut report = String::from("p\tq_value\tsignificant\n");
    for ((p, adjusted), significant) in pvalues
        .iter()
        .zip(&result.adjusted_p)
        .zip(&result.significant)
    {
        let _ = writeln!(
            report,
            "{p}\t{adjusted:.6}\t{}",
            select(*significant, "yes", "no")
        );
    }

    let _ = match result.critical() {
        Some(critical) => writeln!(
            report,
            "critical p = {critical} ({} of {} significant at q = {q})",
            result.discoveries(),
            result.len()
        ),
        None => writeln!(
            report,
            "critical p = none (0 of {} significant at q = {q})",
            result.len()
        ),
    };

    Ok(report)
}

fn effect_report(kind: &str, value: f64) -> Result<String> {
    let kind: EffectKind = kind.parse()?;
    Ok(format!("{value}: {}", interpret(value, kind)))
}
