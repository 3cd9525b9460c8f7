// src/dedup.rs
use chrono::NaiveDate;
use std::{
    cmp::Ordering,
    collections::{btree_map::Entry, BTreeMap},
};
use tracing::debug;

use crate::records::{EmployeeRecord, RecordId, TimesheetRecord};

type EmployeeKey = (String, RecordId, NaiveDate, Option<NaiveDate>);
type TimesheetKey = (String, NaiveDate);

/// Keeps one record per key: the one that ranks highest under `rank`.
///
/// A later record only replaces the kept one when it ranks strictly higher, so
/// on ties the earliest record in input order is authoritative. Output is
/// ordered by key.
pub fn keep_extremum_by<T, K, F, R>(records: Vec<T>, key_of: F, rank: R) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
    R: Fn(&T, &T) -> Ordering,
{
    let mut kept: BTreeMap<K, T> = BTreeMap::new();

    for record in records {
        match kept.entry(key_of(&record)) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if rank(&record, slot.get()) == Ordering::Greater {
                    slot.insert(record);
                }
            }
        }
    }

    kept.into_values().collect()
}

/// Collapses employee rows sharing (employee_id, branch_id, join_date,
/// resign_date) into the row with the highest salary.
pub fn dedup_employees(employees: Vec<EmployeeRecord>) -> Vec<EmployeeRecord> {
    let raw_count = employees.len();
    let kept = keep_extremum_by(
        employees,
        |e| -> EmployeeKey {
            (
                e.employee_id.clone(),
                e.branch_id.clone(),
                e.join_date,
                e.resign_date,
            )
        },
        |candidate, current| candidate.salary.cmp(&current.salary),
    );
    debug!(
        "Employee dedup: {} raw rows -> {} authoritative rows",
        raw_count,
        kept.len()
    );
    kept
}

/// Collapses timesheet rows sharing (employee_id, date) into the row with the
/// smallest timesheet id, i.e. the earliest created entry for that day.
pub fn dedup_timesheets(timesheets: Vec<TimesheetRecord>) -> Vec<TimesheetRecord> {
    let raw_count = timesheets.len();
    let kept = keep_extremum_by(
        timesheets,
        |t| -> TimesheetKey { (t.employee_id.clone(), t.date) },
        // Smaller id ranks higher.
        |candidate, current| current.timesheet_id.cmp(&candidate.timesheet_id),
    );
    debug!(
        "Timesheet dedup: {} raw rows -> {} authoritative rows",
        raw_count,
        kept.len()
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn employee(id: &str, branch: &str, salary: i64, join: &str, resign: Option<&str>) -> EmployeeRecord {
        EmployeeRecord {
            employee_id: id.to_string(),
            branch_id: RecordId::from(branch),
            salary,
            join_date: d(join),
            resign_date: resign.map(d),
        }
    }

    fn timesheet(id: &str, employee_id: &str, date: &str) -> TimesheetRecord {
        TimesheetRecord {
            timesheet_id: RecordId::from(id),
            employee_id: employee_id.to_string(),
            date: d(date),
            checkin: None,
            checkout: None,
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(dedup_employees(Vec::new()).is_empty());
        assert!(dedup_timesheets(Vec::new()).is_empty());
    }

    #[test]
    fn duplicate_employee_keeps_highest_salary() {
        let kept = dedup_employees(vec![
            employee("E1", "B1", 5000, "2024-01-01", None),
            employee("E1", "B1", 6000, "2024-01-01", None),
            employee("E1", "B1", 5500, "2024-01-01", None),
        ]);
        assert_eq!(kept, vec![employee("E1", "B1", 6000, "2024-01-01", None)]);
    }

    #[test]
    fn employee_rows_with_different_tenure_are_not_merged() {
        let kept = dedup_employees(vec![
            employee("E1", "B1", 5000, "2023-01-01", Some("2023-06-30")),
            employee("E1", "B1", 7000, "2024-01-01", None),
            employee("E1", "B2", 6000, "2023-01-01", Some("2023-06-30")),
        ]);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn salary_tie_keeps_first_row_in_input_order() {
        let rows = vec![
            employee("E1", "B1", 5000, "2024-01-01", None),
            employee("E1", "B1", 5000, "2024-01-01", None),
        ];
        let kept = dedup_employees(rows.clone());
        assert_eq!(kept, vec![rows[0].clone()]);
    }

    #[test]
    fn duplicate_timesheet_keeps_smallest_id() {
        let kept = dedup_timesheets(vec![
            timesheet("T2", "E1", "2024-01-05"),
            timesheet("T1", "E1", "2024-01-05"),
            timesheet("T3", "E1", "2024-01-06"),
        ]);
        let ids: Vec<&str> = kept.iter().map(|t| t.timesheet_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T3"]);
    }

    #[test]
    fn numeric_timesheet_ids_use_numeric_order() {
        let kept = dedup_timesheets(vec![
            timesheet("10", "E1", "2024-01-05"),
            timesheet("9", "E1", "2024-01-05"),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].timesheet_id.as_str(), "9");
    }

    #[test]
    fn same_day_for_different_employees_is_not_a_duplicate() {
        let kept = dedup_timesheets(vec![
            timesheet("T1", "E1", "2024-01-05"),
            timesheet("T2", "E2", "2024-01-05"),
        ]);
        assert_eq!(kept.len(), 2);
    }
}
