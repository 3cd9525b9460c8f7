// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aggregate;
mod config;
mod csv_io;
mod dedup;
mod pipeline;
mod rate;
mod reconcile;
mod records;


use config::{Cli, EnvConfig, Settings};
use pipeline::{Pipeline, PipelineReport};

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing input: {0}")]
    MissingInput(String),
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Invalid row in {} at line {line}: {message}", .path.display())]
    InvalidRow {
        path: PathBuf,
        line: u64,
        message: String,
    },
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Environment configuration error: {0}")]
    Env(#[from] envy::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid shift date '{0}': expected YYYY-MM-DD or 'yesterday'")]
    InvalidShiftDate(String),
}

// --- Run ---

/// Loads both inputs, runs the pipeline and writes the output relation.
pub fn run(settings: &Settings) -> Result<PipelineReport, AppError> {
    let employees = csv_io::read_employees(&settings.employees_path, settings.delimiter)?;
    let timesheets = csv_io::read_timesheets(&settings.timesheets_path, settings.delimiter)?;

    let output = Pipeline::new()
        .with_shift_date_filter(settings.shift_date)
        .run(employees, timesheets);

    csv_io::write_rates(
        settings.output_path.as_deref(),
        settings.output_format,
        &settings.table_name,
        &output.rates,
    )?;

    Ok(output.report)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        // stdout may carry the report itself
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let env_config = EnvConfig::from_env().context("Reading PAYRATE_ environment failed")?;
    let settings = Settings::resolve(&cli, env_config).context("Invalid configuration")?;
    info!(
        "Computing salary per hour | employees={} timesheets={} format={:?}",
        settings.employees_path.display(),
        settings.timesheets_path.display(),
        settings.output_format
    );

    match run(&settings) {
        Ok(report) => {
            if let Ok(json) = serde_json::to_string(&report) {
                debug!("Run report: {}", json);
            }
            info!(
                "Salary per hour written for {} branch-months from {} attendance days (dropped {} shifts after resignation)",
                report.buckets, report.attendance_days, report.dropped_after_resignation
            );
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Err(e).context("Salary per hour run failed")
        }
    }
}
