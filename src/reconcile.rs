// src/reconcile.rs
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::records::{EmployeeRecord, ReconciledShift, TimesheetRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub shifts: Vec<ReconciledShift>,
    /// Timesheets dated after the resignation of the employee row they joined.
    pub dropped_after_resignation: usize,
    /// Timesheets whose employee id matched no employee row.
    pub unmatched_timesheets: usize,
    /// Timesheets whose employee id matched more than one employee row.
    pub ambiguous_timesheets: usize,
}

/// A joined row is kept when the employee has not resigned, or the shift falls
/// on or before the resignation date. Unresolved employees have no resign
/// date and are kept.
pub fn is_within_employment(shift: &ReconciledShift) -> bool {
    match shift.resign_date {
        None => true,
        Some(resign_date) => shift.date <= resign_date,
    }
}

fn join_row(timesheet: &TimesheetRecord, employee: Option<&EmployeeRecord>) -> ReconciledShift {
    ReconciledShift {
        timesheet_id: timesheet.timesheet_id.clone(),
        employee_id: timesheet.employee_id.clone(),
        date: timesheet.date,
        checkin: timesheet.checkin,
        checkout: timesheet.checkout,
        branch_id: employee.map(|e| e.branch_id.clone()),
        salary: employee.map(|e| e.salary),
        join_date: employee.map(|e| e.join_date),
        resign_date: employee.and_then(|e| e.resign_date),
    }
}

/// Whether `date` falls inside the employee's [join_date, resign_date] window.
fn covers(employee: &EmployeeRecord, date: NaiveDate) -> bool {
    employee.join_date <= date && employee.resign_date.map_or(true, |resign| date <= resign)
}

/// Picks the single employee row a shift belongs to when one employee id has
/// several rows (re-hires, transfers).
///
/// Preference order: a row whose employment window contains the shift date,
/// then the latest join date, then the row still employed (or resigning
/// latest), then the smallest branch id.
pub fn select_employee<'a>(matches: &[&'a EmployeeRecord], date: NaiveDate) -> Option<&'a EmployeeRecord> {
    matches.iter().copied().max_by(|a, b| {
        covers(a, date)
            .cmp(&covers(b, date))
            .then(a.join_date.cmp(&b.join_date))
            .then(
                a.resign_date
                    .unwrap_or(NaiveDate::MAX)
                    .cmp(&b.resign_date.unwrap_or(NaiveDate::MAX)),
            )
            .then(b.branch_id.cmp(&a.branch_id))
    })
}

/// Left-joins timesheets to employees on employee_id and drops post-resignation
/// rows. Every timesheet is joined to at most one employee row.
pub fn reconcile(timesheets: &[TimesheetRecord], employees: &[EmployeeRecord]) -> Reconciliation {
    let mut by_employee: HashMap<&str, Vec<&EmployeeRecord>> = HashMap::new();
    for employee in employees {
        by_employee
            .entry(employee.employee_id.as_str())
            .or_default()
            .push(employee);
    }

    let mut outcome = Reconciliation::default();

    for timesheet in timesheets {
        let employee = match by_employee.get(timesheet.employee_id.as_str()) {
            Some(matches) => {
                if matches.len() > 1 {
                    outcome.ambiguous_timesheets += 1;
                }
                select_employee(matches, timesheet.date)
            }
            None => {
                outcome.unmatched_timesheets += 1;
                None
            }
        };

        let shift = join_row(timesheet, employee);
        if is_within_employment(&shift) {
            outcome.shifts.push(shift);
        } else {
            debug!(
                "Dropping timesheet {} for {} on {}: after resignation on {:?}",
                shift.timesheet_id, shift.employee_id, shift.date, shift.resign_date
            );
            outcome.dropped_after_resignation += 1;
        }
    }

    if outcome.ambiguous_timesheets > 0 {
        warn!(
            "{} timesheets matched more than one employee row; each was joined to the row covering its date",
            outcome.ambiguous_timesheets
        );
    }
    debug!(
        "Reconciliation: {} shifts kept, {} dropped after resignation, {} unmatched",
        outcome.shifts.len(),
        outcome.dropped_after_resignation,
        outcome.unmatched_timesheets
    );

    outcome
}
