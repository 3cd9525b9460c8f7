// src/records.rs
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{cmp::Ordering, fmt};

// --- Identifiers ---

/// Identifier as it appears in the source exports.
///
/// Ordering is "natural": identifiers that are plain unsigned integers compare
/// numerically (`"9" < "10"`), with the raw text as a tie-break (`"007"` vs
/// `"7"`). Numeric identifiers sort before non-numeric ones, and non-numeric
/// identifiers compare lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the identifier, if it is a plain unsigned integer.
    pub fn numeric_value(&self) -> Option<u128> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse::<u128>().ok()
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_value(), other.numeric_value()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// --- Input relations ---

/// One row of the `employees` export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    // Older exports carry the misspelled column name.
    #[serde(alias = "employe_id")]
    pub employee_id: String,
    pub branch_id: RecordId,
    pub salary: i64,
    pub join_date: NaiveDate,
    pub resign_date: Option<NaiveDate>,
}

/// One row of the `timesheets` export. A row is a single shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetRecord {
    pub timesheet_id: RecordId,
    pub employee_id: String,
    pub date: NaiveDate,
    #[serde(default, with = "optional_time")]
    pub checkin: Option<NaiveTime>,
    #[serde(default, with = "optional_time")]
    pub checkout: Option<NaiveTime>,
}

// --- Intermediate relations ---

/// A deduplicated timesheet joined with its employee row.
///
/// Employee attributes are `None` when the timesheet's employee id could not
/// be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledShift {
    pub timesheet_id: RecordId,
    pub employee_id: String,
    pub date: NaiveDate,
    pub checkin: Option<NaiveTime>,
    pub checkout: Option<NaiveTime>,
    pub branch_id: Option<RecordId>,
    pub salary: Option<i64>,
    pub join_date: Option<NaiveDate>,
    pub resign_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkHourRecord {
    pub employee_id: String,
    pub branch_id: RecordId,
    pub date: NaiveDate,
    pub work_hour: Decimal,
}

/// Aggregation group. Field order gives the output ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub year: i32,
    pub month: u32,
    pub branch_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchMonthAggregate {
    pub year: i32,
    pub month: u32,
    pub branch_id: RecordId,
    pub total_work_hour: Decimal,
    pub total_salary: Decimal,
    /// Attendance days in the bucket, zero-hour shifts included.
    pub shift_count: usize,
}

// --- Output relation ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalaryPerHourRecord {
    pub year: i32,
    pub month: u32,
    pub branch_id: RecordId,
    pub salary_per_hour: Decimal,
}

// --- Time-of-day parsing ---

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// Parses a check-in/check-out cell. Accepts `HH:MM:SS[.fff]` and `HH:MM`.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, String> {
    let trimmed = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| format!("invalid time of day '{}'", trimmed))
}

pub(crate) mod optional_time {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_time_of_day(value)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format("%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }
}
