// src/aggregate.rs
use chrono::{Datelike, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::debug;

use crate::records::{BucketKey, ReconciledShift, RecordId, WorkHourRecord};

const NANOS_PER_HOUR: Decimal = dec!(3600000000000);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkHourTotal {
    pub total_work_hour: Decimal,
    pub shift_count: usize,
}

pub type WorkHourTotals = BTreeMap<BucketKey, WorkHourTotal>;
pub type SalaryTotals = BTreeMap<BucketKey, Decimal>;

/// Hours worked in one shift.
///
/// Missing check-in or check-out, or a check-out before check-in, counts as
/// zero hours. Equal times also give zero.
pub fn work_hour(checkin: Option<NaiveTime>, checkout: Option<NaiveTime>) -> Decimal {
    match (checkin, checkout) {
        (Some(start), Some(end)) if start <= end => {
            // A time-of-day span is under a day, so it always fits in i64 nanoseconds.
            (end - start)
                .num_nanoseconds()
                .map_or(Decimal::ZERO, |nanos| Decimal::from(nanos) / NANOS_PER_HOUR)
        }
        _ => Decimal::ZERO,
    }
}

pub fn bucket_key(date: NaiveDate, branch_id: &RecordId) -> BucketKey {
    BucketKey {
        year: date.year(),
        month: date.month(),
        branch_id: branch_id.clone(),
    }
}

/// Derives worked hours for every shift that can be attributed to a branch.
///
/// Returns the records and the number of shifts skipped because their
/// employee (and so their branch) is unknown.
pub fn derive_work_hours(shifts: &[ReconciledShift]) -> (Vec<WorkHourRecord>, usize) {
    let mut unattributed = 0;
    let records = shifts
        .iter()
        .filter_map(|shift| match &shift.branch_id {
            Some(branch_id) => Some(WorkHourRecord {
                employee_id: shift.employee_id.clone(),
                branch_id: branch_id.clone(),
                date: shift.date,
                work_hour: work_hour(shift.checkin, shift.checkout),
            }),
            None => {
                unattributed += 1;
                None
            }
        })
        .collect();
    (records, unattributed)
}

/// Total worked hours and attendance days per (year, month, branch).
pub fn sum_work_hours(records: &[WorkHourRecord]) -> WorkHourTotals {
    let mut totals = WorkHourTotals::new();
    for record in records {
        let entry = totals
            .entry(bucket_key(record.date, &record.branch_id))
            .or_default();
        entry.total_work_hour += record.work_hour;
        entry.shift_count += 1;
    }
    debug!("Work hours summed into {} buckets", totals.len());
    totals
}

/// Highest salary seen per employee within each (year, month, branch).
pub fn max_salary_per_employee(shifts: &[ReconciledShift]) -> BTreeMap<(BucketKey, String), i64> {
    let mut peaks: BTreeMap<(BucketKey, String), i64> = BTreeMap::new();
    for shift in shifts {
        let (Some(branch_id), Some(salary)) = (&shift.branch_id, shift.salary) else {
            continue;
        };
        let key = (bucket_key(shift.date, branch_id), shift.employee_id.clone());
        peaks
            .entry(key)
            .and_modify(|peak| *peak = (*peak).max(salary))
            .or_insert(salary);
    }
    peaks
}

/// Salary cost per (year, month, branch): each employee contributes their
/// peak salary in the bucket once, however many shifts they logged.
pub fn sum_salaries(shifts: &[ReconciledShift]) -> SalaryTotals {
    let mut totals = SalaryTotals::new();
    for ((bucket, _employee_id), salary) in max_salary_per_employee(shifts) {
        *totals.entry(bucket).or_insert(Decimal::ZERO) += Decimal::from(salary);
    }
    debug!("Salaries summed into {} buckets", totals.len());
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn t(time_str: &str) -> Option<NaiveTime> {
        Some(NaiveTime::parse_from_str(time_str, "%H:%M").unwrap())
    }

    fn shift(
        id: &str,
        employee_id: &str,
        branch: Option<&str>,
        salary: i64,
        date: &str,
        checkin: Option<NaiveTime>,
        checkout: Option<NaiveTime>,
    ) -> ReconciledShift {
        ReconciledShift {
            timesheet_id: RecordId::from(id),
            employee_id: employee_id.to_string(),
            date: d(date),
            checkin,
            checkout,
            branch_id: branch.map(RecordId::from),
            salary: branch.map(|_| salary),
            join_date: branch.map(|_| d("2020-01-01")),
            resign_date: None,
        }
    }

    fn key(year: i32, month: u32, branch: &str) -> BucketKey {
        BucketKey {
            year,
            month,
            branch_id: RecordId::from(branch),
        }
    }

    #[test]
    fn regular_shift_hours() {
        assert_eq!(work_hour(t("08:00"), t("17:00")), dec!(9));
        assert_eq!(work_hour(t("08:00"), t("08:30")), dec!(0.5));
    }

    #[test]
    fn reversed_equal_or_missing_times_give_zero() {
        assert_eq!(work_hour(t("17:00"), t("08:00")), Decimal::ZERO);
        assert_eq!(work_hour(t("08:00"), t("08:00")), Decimal::ZERO);
        assert_eq!(work_hour(None, t("17:00")), Decimal::ZERO);
        assert_eq!(work_hour(t("08:00"), None), Decimal::ZERO);
        assert_eq!(work_hour(None, None), Decimal::ZERO);
    }

    #[test]
    fn fractional_seconds_are_counted() {
        let start = NaiveTime::from_hms_milli_opt(8, 0, 0, 0);
        let end = NaiveTime::from_hms_milli_opt(8, 0, 36, 0);
        assert_eq!(work_hour(start, end), dec!(0.01));
    }

    #[test]
    fn sub_millisecond_spans_are_not_truncated() {
        let start = NaiveTime::from_hms_opt(8, 0, 0);
        let end = NaiveTime::from_hms_micro_opt(8, 0, 0, 500);
        let hours = work_hour(start, end);
        assert!(hours > Decimal::ZERO);
        assert_eq!(hours, dec!(500000) / NANOS_PER_HOUR);
    }

    #[test]
    fn zero_hour_shift_still_counts_as_attendance() {
        let shifts = vec![
            shift("T1", "E1", Some("B1"), 5000, "2024-01-05", t("17:00"), t("08:00")),
            shift("T2", "E1", Some("B1"), 5000, "2024-01-06", t("08:00"), t("16:00")),
        ];
        let (records, unattributed) = derive_work_hours(&shifts);
        assert_eq!(unattributed, 0);
        let totals = sum_work_hours(&records);
        assert_eq!(
            totals.get(&key(2024, 1, "B1")),
            Some(&WorkHourTotal {
                total_work_hour: dec!(8),
                shift_count: 2,
            })
        );
    }

    #[test]
    fn shifts_without_branch_are_not_attributed() {
        let shifts = vec![
            shift("T1", "GHOST", None, 0, "2024-01-05", t("08:00"), t("17:00")),
            shift("T2", "E1", Some("B1"), 5000, "2024-01-05", t("08:00"), t("17:00")),
        ];
        let (records, unattributed) = derive_work_hours(&shifts);
        assert_eq!(unattributed, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(sum_salaries(&shifts).len(), 1);
    }

    #[test]
    fn buckets_split_by_month_and_branch() {
        let shifts = vec![
            shift("T1", "E1", Some("B1"), 5000, "2024-01-31", t("08:00"), t("10:00")),
            shift("T2", "E1", Some("B1"), 5000, "2024-02-01", t("08:00"), t("11:00")),
            shift("T3", "E2", Some("B2"), 4000, "2024-01-31", t("08:00"), t("12:00")),
        ];
        let (records, _) = derive_work_hours(&shifts);
        let totals = sum_work_hours(&records);
        let hours: Vec<(BucketKey, Decimal)> = totals
            .into_iter()
            .map(|(k, v)| (k, v.total_work_hour))
            .collect();
        assert_eq!(
            hours,
            vec![
                (key(2024, 1, "B1"), dec!(2)),
                (key(2024, 1, "B2"), dec!(4)),
                (key(2024, 2, "B1"), dec!(3)),
            ]
        );
    }

    #[test]
    fn salary_counted_once_per_employee_per_bucket() {
        let shifts = vec![
            shift("T1", "E1", Some("B1"), 5000, "2024-01-05", t("08:00"), t("17:00")),
            shift("T2", "E1", Some("B1"), 5000, "2024-01-06", t("08:00"), t("17:00")),
            shift("T3", "E1", Some("B1"), 6000, "2024-01-07", t("08:00"), t("17:00")),
            shift("T4", "E2", Some("B1"), 4000, "2024-01-07", t("08:00"), t("17:00")),
        ];
        let totals = sum_salaries(&shifts);
        assert_eq!(totals.get(&key(2024, 1, "B1")), Some(&dec!(10000)));
    }

    #[test]
    fn salary_peak_is_per_month() {
        let shifts = vec![
            shift("T1", "E1", Some("B1"), 5000, "2024-01-05", t("08:00"), t("17:00")),
            shift("T2", "E1", Some("B1"), 6000, "2024-02-05", t("08:00"), t("17:00")),
        ];
        let peaks = max_salary_per_employee(&shifts);
        assert_eq!(peaks.get(&(key(2024, 1, "B1"), "E1".to_string())), Some(&5000));
        assert_eq!(peaks.get(&(key(2024, 2, "B1"), "E1".to_string())), Some(&6000));
    }
}
