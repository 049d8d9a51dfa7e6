use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Number of days in each month of a non-leap year.
pub const DAYS_IN_MONTH: [u16; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Simulated period: a whole year or a single calendar month (1-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Annual,
    Month(u8),
}

impl Period {
    /// Creates a monthly period, validating the month number.
    pub fn month(month: u8) -> Result<Self, ValidationError> {
        if (1..=12).contains(&month) {
            Ok(Period::Month(month))
        } else {
            Err(ValidationError::Month(month))
        }
    }

    /// All twelve months in calendar order.
    pub fn months() -> impl Iterator<Item = Period> {
        (1..=12u8).map(Period::Month)
    }

    /// Number of days covered by the period.
    pub fn days(&self) -> f64 {
        match self {
            Period::Annual => 365.0,
            Period::Month(m) => DAYS_IN_MONTH[(*m as usize).clamp(1, 12) - 1] as f64,
        }
    }

    /// Number of hours covered by the period (8760 for a year).
    pub fn duration_hours(&self) -> f64 {
        self.days() * 24.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Annual => f.write_str("annual period"),
            Period::Month(m) => match MONTH_NAMES.get((*m as usize).wrapping_sub(1)) {
                Some(name) => f.write_str(name),
                None => write!(f, "month {m}"),
            },
        }
    }
}
