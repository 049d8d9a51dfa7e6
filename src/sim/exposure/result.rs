use serde::{Deserialize, Serialize};

use super::dli::DliClass;
use super::period::Period;

/// Per-point output of one simulated period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodResult {
    pub period: Period,
    /// Aggregate irradiance per sample point (kWh/m² over the period).
    pub irradiance: Vec<f64>,
    /// DLI per sample point (mol/m²/day) after rounding.
    pub dli: Vec<f64>,
    pub classes: Vec<DliClass>,
}

impl PeriodResult {
    pub fn len(&self) -> usize {
        self.irradiance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.irradiance.is_empty()
    }

    pub fn mean_dli(&self) -> f64 {
        crate::vecutils::mean(&self.dli)
    }
}

/// Output of a complete run. Periods are in simulation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureResult {
    pub point_count: usize,
    pub direction_count: usize,
    /// Ray queries that failed and were treated as unoccluded.
    pub intersection_failures: usize,
    pub periods: Vec<PeriodResult>,
}

impl ExposureResult {
    pub fn period(&self, period: Period) -> Option<&PeriodResult> {
        self.periods.iter().find(|p| p.period == period)
    }

    pub fn annual(&self) -> Option<&PeriodResult> {
        self.period(Period::Annual)
    }
}
