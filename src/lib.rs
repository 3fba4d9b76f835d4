#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args)]

//! Multiple-comparison-corrected association testing for clinical cohorts.
//!
//! Correlates batches of clinical variables against outcome scores with
//! Fisher-Z confidence intervals, gates each test on its sample size, and
//! controls the false discovery rate per batch with Benjamini-Hochberg.

pub mod config;
pub mod csv_reader;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod structs;

pub use config::AnalysisConfig;
pub use structs::{AssocError, Result};
