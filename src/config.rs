// src/config.rs
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

use crate::csv_io::{OutputFormat, DEFAULT_TABLE_NAME};
use crate::pipeline::ShiftDateFilter;
use crate::AppError;

pub const ENV_PREFIX: &str = "PAYRATE_";

// --- Command line ---

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "payrate-core",
    version,
    about = "Computes salary per hour by branch and month from employee and timesheet exports"
)]
pub struct Cli {
    /// Employees CSV (employee_id, branch_id, salary, join_date, resign_date)
    #[arg(long)]
    pub employees: Option<PathBuf>,

    /// Timesheets CSV (timesheet_id, employee_id, date, checkin, checkout)
    #[arg(long)]
    pub timesheets: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Field delimiter of the input files (single character, or "tab")
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Target table for --format sql
    #[arg(long)]
    pub table: Option<String>,

    /// Only process shifts of this day: YYYY-MM-DD or "yesterday"
    #[arg(long)]
    pub shift_date: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

// --- Environment ---

/// `PAYRATE_`-prefixed environment variables, e.g. `PAYRATE_EMPLOYEES_PATH`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvConfig {
    pub employees_path: Option<PathBuf>,
    pub timesheets_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
    pub delimiter: Option<String>,
    pub table_name: Option<String>,
    pub shift_date: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        Ok(envy::prefixed(ENV_PREFIX).from_env::<EnvConfig>()?)
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter::<_, EnvConfig>(vars)?)
    }
}

// --- Resolved settings ---

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub employees_path: PathBuf,
    pub timesheets_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub delimiter: u8,
    pub table_name: String,
    pub shift_date: Option<ShiftDateFilter>,
}

impl Settings {
    /// Command line values win over environment values.
    pub fn resolve(cli: &Cli, env: EnvConfig) -> Result<Self, AppError> {
        let employees_path = cli
            .employees
            .clone()
            .or(env.employees_path)
            .ok_or_else(|| AppError::MissingInput("employees file (--employees or PAYRATE_EMPLOYEES_PATH)".to_string()))?;
        let timesheets_path = cli
            .timesheets
            .clone()
            .or(env.timesheets_path)
            .ok_or_else(|| AppError::MissingInput("timesheets file (--timesheets or PAYRATE_TIMESHEETS_PATH)".to_string()))?;

        let delimiter = match cli.delimiter.as_deref().or(env.delimiter.as_deref()) {
            Some(raw) => parse_delimiter(raw)?,
            None => b',',
        };

        let table_name = cli
            .table
            .clone()
            .or(env.table_name)
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());
        validate_table_name(&table_name)?;

        let shift_date = cli
            .shift_date
            .as_deref()
            .or(env.shift_date.as_deref())
            .map(str::parse::<ShiftDateFilter>)
            .transpose()?;

        Ok(Self {
            employees_path,
            timesheets_path,
            output_path: cli.output.clone().or(env.output_path),
            output_format: cli.format.or(env.output_format).unwrap_or_default(),
            delimiter,
            table_name,
            shift_date,
        })
    }
}

pub fn parse_delimiter(raw: &str) -> Result<u8, AppError> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(AppError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                raw
            ))),
        },
    }
}

/// Table names end up verbatim in the INSERT statement.
pub fn validate_table_name(name: &str) -> Result<(), AppError> {
    let valid = name.split('.').all(|part| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
    if valid {
        Ok(())
    } else {
        Err(AppError::Config(format!("invalid table name '{}'", name)))
    }
}
