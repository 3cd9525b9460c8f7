// src/pipeline.rs
use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::str::FromStr;
use tracing::{debug, info};

use crate::aggregate::{derive_work_hours, sum_salaries, sum_work_hours};
use crate::dedup::{dedup_employees, dedup_timesheets};
use crate::rate::{calculate_salary_per_hour, join_totals};
use crate::reconcile::reconcile;
use crate::records::{EmployeeRecord, SalaryPerHourRecord, TimesheetRecord};
use crate::AppError;

// --- Shift date filter ---

/// Restricts the run to timesheets of a single day, the way the daily job
/// only looks at yesterday's shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDateFilter {
    Yesterday,
    On(NaiveDate),
}

impl ShiftDateFilter {
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            ShiftDateFilter::Yesterday => today - Duration::days(1),
            ShiftDateFilter::On(date) => *date,
        }
    }
}

impl FromStr for ShiftDateFilter {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("yesterday") {
            return Ok(ShiftDateFilter::Yesterday);
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(ShiftDateFilter::On)
            .map_err(|_| AppError::InvalidShiftDate(trimmed.to_string()))
    }
}

// --- Run report ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub raw_employees: usize,
    pub deduplicated_employees: usize,
    pub raw_timesheets: usize,
    pub filtered_timesheets: usize,
    pub deduplicated_timesheets: usize,
    pub reconciled_shifts: usize,
    pub dropped_after_resignation: usize,
    pub unmatched_timesheets: usize,
    pub unattributed_shifts: usize,
    /// Shifts counted across all output buckets, zero-hour shifts included.
    pub attendance_days: usize,
    pub buckets: usize,
    /// SHA-256 over the canonical output rows; equal inputs give equal digests.
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub rates: Vec<SalaryPerHourRecord>,
    pub report: PipelineReport,
}

/// Hex SHA-256 of the output rows in their output order.
pub fn fingerprint(rates: &[SalaryPerHourRecord]) -> String {
    let mut hasher = Sha256::new();
    for rate in rates {
        hasher.update(
            format!(
                "{}|{}|{}|{}\n",
                rate.year, rate.month, rate.branch_id, rate.salary_per_hour
            )
            .as_bytes(),
        );
    }
    hex::encode(hasher.finalize())
}

// --- Pipeline ---

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    shift_date: Option<NaiveDate>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only timesheets dated `date` enter the timesheet deduplicator.
    pub fn with_shift_date(mut self, date: NaiveDate) -> Self {
        self.shift_date = Some(date);
        self
    }

    /// Resolves `filter` against the local calendar date.
    pub fn with_shift_date_filter(self, filter: Option<ShiftDateFilter>) -> Self {
        match filter {
            Some(filter) => self.with_shift_date(filter.resolve(Local::now().date_naive())),
            None => self,
        }
    }

    pub fn run(&self, employees: Vec<EmployeeRecord>, timesheets: Vec<TimesheetRecord>) -> PipelineOutput {
        let mut report = PipelineReport {
            raw_employees: employees.len(),
            raw_timesheets: timesheets.len(),
            ..Default::default()
        };

        // Stages 1 and 2 are independent.
        let employees = dedup_employees(employees);
        report.deduplicated_employees = employees.len();

        let timesheets: Vec<TimesheetRecord> = match self.shift_date {
            Some(date) => {
                debug!("Restricting timesheets to shifts on {}", date);
                timesheets.into_iter().filter(|t| t.date == date).collect()
            }
            None => timesheets,
        };
        report.filtered_timesheets = timesheets.len();
        let timesheets = dedup_timesheets(timesheets);
        report.deduplicated_timesheets = timesheets.len();

        // Stage 3
        let reconciliation = reconcile(&timesheets, &employees);
        report.reconciled_shifts = reconciliation.shifts.len();
        report.dropped_after_resignation = reconciliation.dropped_after_resignation;
        report.unmatched_timesheets = reconciliation.unmatched_timesheets;

        // Stage 4
        let (work_hour_records, unattributed) = derive_work_hours(&reconciliation.shifts);
        report.unattributed_shifts = unattributed;
        let work_hours = sum_work_hours(&work_hour_records);
        let salaries = sum_salaries(&reconciliation.shifts);

        // Stage 5
        let aggregates = join_totals(&work_hours, &salaries);
        report.attendance_days = aggregates.iter().map(|agg| agg.shift_count).sum();
        let rates = calculate_salary_per_hour(&aggregates);
        report.buckets = rates.len();
        report.fingerprint = fingerprint(&rates);

        info!(
            "Pipeline finished | employees={}->{} timesheets={}->{} shifts={} dropped_after_resign={} unattributed={} attendance_days={} buckets={} fingerprint={}",
            report.raw_employees,
            report.deduplicated_employees,
            report.raw_timesheets,
            report.deduplicated_timesheets,
            report.reconciled_shifts,
            report.dropped_after_resignation,
            report.unattributed_shifts,
            report.attendance_days,
            report.buckets,
            &report.fingerprint[..12]
        );

        PipelineOutput { rates, report }
    }
}
