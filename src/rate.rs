// src/rate.rs
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::aggregate::{SalaryTotals, WorkHourTotals};
use crate::records::{BranchMonthAggregate, SalaryPerHourRecord};

pub const RATE_DECIMAL_PLACES: u32 = 2;

/// Left-joins work-hour totals to salary totals on (year, month, branch).
/// A bucket with hours but no salary total gets a salary of zero.
pub fn join_totals(work_hours: &WorkHourTotals, salaries: &SalaryTotals) -> Vec<BranchMonthAggregate> {
    work_hours
        .iter()
        .map(|(bucket, hours)| BranchMonthAggregate {
            year: bucket.year,
            month: bucket.month,
            branch_id: bucket.branch_id.clone(),
            total_work_hour: hours.total_work_hour,
            total_salary: salaries.get(bucket).copied().unwrap_or(Decimal::ZERO),
            shift_count: hours.shift_count,
        })
        .collect()
}

/// `total_salary / total_work_hour`, rounded half-to-even to two places.
/// Zero whenever the bucket has no worked hours.
pub fn salary_per_hour(total_salary: Decimal, total_work_hour: Decimal) -> Decimal {
    if total_work_hour.is_zero() {
        return Decimal::new(0, RATE_DECIMAL_PLACES);
    }
    let mut rate = (total_salary / total_work_hour)
        .round_dp_with_strategy(RATE_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven);
    rate.rescale(RATE_DECIMAL_PLACES);
    rate
}

/// Final output relation, ordered by (year, month, branch_id).
pub fn calculate_salary_per_hour(aggregates: &[BranchMonthAggregate]) -> Vec<SalaryPerHourRecord> {
    let mut rates: Vec<SalaryPerHourRecord> = aggregates
        .iter()
        .map(|agg| {
            debug!(
                "Branch {} {}-{:02}: {} shifts, {} hours, salary {}",
                agg.branch_id, agg.year, agg.month, agg.shift_count, agg.total_work_hour, agg.total_salary
            );
            if agg.total_work_hour.is_zero() && !agg.total_salary.is_zero() {
                debug!(
                    "Branch {} {}-{:02} has salary {} but no worked hours; rate set to 0",
                    agg.branch_id, agg.year, agg.month, agg.total_salary
                );
            }
            SalaryPerHourRecord {
                year: agg.year,
                month: agg.month,
                branch_id: agg.branch_id.clone(),
                salary_per_hour: salary_per_hour(agg.total_salary, agg.total_work_hour),
            }
        })
        .collect();

    rates.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then(a.month.cmp(&b.month))
            .then(a.branch_id.cmp(&b.branch_id))
    });
    rates
}
