// src/csv_io.rs
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};
use tracing::{debug, info};

use crate::records::{EmployeeRecord, RecordId, SalaryPerHourRecord, TimesheetRecord};
use crate::AppError;

pub const OUTPUT_HEADER: [&str; 4] = ["year", "month", "branch_id", "salary_per_hour"];
pub const DEFAULT_TABLE_NAME: &str = "branch_hourly_salary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Sql,
}

// --- Reading ---

/// Reads every record of a delimited file, pairing each with its 1-based line.
fn read_records<T: DeserializeOwned>(path: &Path, delimiter: u8) -> Result<Vec<(u64, T)>, AppError> {
    let csv_error = |source: csv::Error| AppError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut rows = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_error)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row = record
            .deserialize::<T>(Some(&headers))
            .map_err(|e| AppError::InvalidRow {
                path: path.to_path_buf(),
                line,
                message: e.to_string(),
            })?;
        rows.push((line, row));
    }
    Ok(rows)
}

pub fn read_employees(path: &Path, delimiter: u8) -> Result<Vec<EmployeeRecord>, AppError> {
    let rows = read_records::<EmployeeRecord>(path, delimiter)?;
    let mut employees = Vec::with_capacity(rows.len());
    for (line, employee) in rows {
        if employee.salary < 0 {
            return Err(AppError::InvalidRow {
                path: path.to_path_buf(),
                line,
                message: format!(
                    "negative salary {} for employee {}",
                    employee.salary, employee.employee_id
                ),
            });
        }
        employees.push(employee);
    }
    info!("Loaded {} employee rows from {}", employees.len(), path.display());
    Ok(employees)
}

pub fn read_timesheets(path: &Path, delimiter: u8) -> Result<Vec<TimesheetRecord>, AppError> {
    let timesheets: Vec<TimesheetRecord> = read_records::<TimesheetRecord>(path, delimiter)?
        .into_iter()
        .map(|(_, timesheet)| timesheet)
        .collect();
    info!("Loaded {} timesheet rows from {}", timesheets.len(), path.display());
    Ok(timesheets)
}

// --- Writing ---

/// JSON view of an output row: the rate is written as a number, not a string.
#[derive(Debug, Serialize)]
struct JsonRate<'a> {
    year: i32,
    month: u32,
    branch_id: &'a RecordId,
    #[serde(with = "rust_decimal::serde::float")]
    salary_per_hour: Decimal,
}

impl<'a> From<&'a SalaryPerHourRecord> for JsonRate<'a> {
    fn from(rate: &'a SalaryPerHourRecord) -> Self {
        JsonRate {
            year: rate.year,
            month: rate.month,
            branch_id: &rate.branch_id,
            salary_per_hour: rate.salary_per_hour,
        }
    }
}

fn sql_branch_literal(branch_id: &RecordId) -> String {
    match branch_id.numeric_value() {
        Some(value) => value.to_string(),
        None => format!("'{}'", branch_id.as_str().replace('\'', "''")),
    }
}

/// A single multi-row INSERT for `table`, or a comment when there is nothing
/// to insert.
pub fn insert_statement(table: &str, rates: &[SalaryPerHourRecord]) -> String {
    if rates.is_empty() {
        return format!("-- no rows to insert into {}\n", table);
    }
    let values: Vec<String> = rates
        .iter()
        .map(|rate| {
            format!(
                "({}, {}, {}, {})",
                rate.year,
                rate.month,
                sql_branch_literal(&rate.branch_id),
                rate.salary_per_hour
            )
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES {};\n",
        table,
        OUTPUT_HEADER.join(", "),
        values.join(", ")
    )
}

pub fn write_rates_to<W: Write>(
    writer: W,
    format: OutputFormat,
    table: &str,
    rates: &[SalaryPerHourRecord],
) -> Result<(), AppError> {
    match format {
        OutputFormat::Csv => {
            let mut csv_writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer);
            let csv_error = |source: csv::Error| AppError::Csv {
                path: "<output>".into(),
                source,
            };
            csv_writer.write_record(OUTPUT_HEADER).map_err(csv_error)?;
            for rate in rates {
                csv_writer.serialize(rate).map_err(csv_error)?;
            }
            csv_writer.flush()?;
        }
        OutputFormat::Json => {
            let mut writer = writer;
            let rows: Vec<JsonRate<'_>> = rates.iter().map(JsonRate::from).collect();
            serde_json::to_writer_pretty(&mut writer, &rows)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        OutputFormat::Sql => {
            let mut writer = writer;
            writer.write_all(insert_statement(table, rates).as_bytes())?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Writes the output relation to `path`, or stdout when no path is given.
pub fn write_rates(
    path: Option<&Path>,
    format: OutputFormat,
    table: &str,
    rates: &[SalaryPerHourRecord],
) -> Result<(), AppError> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            write_rates_to(BufWriter::new(file), format, table, rates)?;
            debug!("Wrote {} rows as {:?} to {}", rates.len(), format, path.display());
        }
        None => {
            let stdout = std::io::stdout();
            write_rates_to(stdout.lock(), format, table, rates)?;
        }
    }
    Ok(())
}
