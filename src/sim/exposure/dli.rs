//! Daily Light Integral (DLI) conversion and suitability classes.
//!
//! Irradiance (kWh/m² over a period) is converted to mol/m²/day:
//!
//! ```text
//! dli = irradiance / days / daylight_hours * 1000  (W/m² during daylight)
//!       [/ or *] PAR_FACTOR                         (PAR, µmol/m²/s)
//!       * 0.0864                                    (mol/m²/day)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::period::Period;

/// Conversion factor between W/m² and µmol/m²/s of photosynthetically active radiation.
pub const PAR_FACTOR: f64 = 2.02;

/// µmol/m²/s -> mol/m²/day (86400 s / 1e6).
pub const SECONDS_PER_DAY_MOL: f64 = 0.0864;

pub const DEFAULT_DAYLIGHT_HOURS: f64 = 12.0;

/// DLI used as the upper end of the highest class in [`class_range`].
pub const MAX_CLASS_CEILING: u32 = 60;

/// How the PAR factor is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Divide by [`PAR_FACTOR`].
    #[default]
    DividePar,
    /// Multiply by [`PAR_FACTOR`].
    MultiplyPar,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round to the nearest integer, halves away from zero.
    #[default]
    HalfAwayFromZero,
    /// Keep the fractional value.
    None,
}

impl RoundingPolicy {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            RoundingPolicy::HalfAwayFromZero => value.round(),
            RoundingPolicy::None => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DliSettings {
    pub daylight_hours: f64,
    pub mode: ConversionMode,
    pub rounding: RoundingPolicy,
}

impl Default for DliSettings {
    fn default() -> Self {
        Self {
            daylight_hours: DEFAULT_DAYLIGHT_HOURS,
            mode: ConversionMode::default(),
            rounding: RoundingPolicy::default(),
        }
    }
}

impl DliSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.daylight_hours.is_finite() && self.daylight_hours > 0.0) {
            return Err(ValidationError::Parameter {
                name: "daylight_hours",
                value: self.daylight_hours,
            });
        }
        Ok(())
    }

    /// Unrounded DLI for irradiance accumulated over `period`.
    ///
    /// Negative irradiance is converted as is.
    pub fn convert(&self, irradiance: f64, period: Period) -> f64 {
        let watts = irradiance / period.days() / self.daylight_hours * 1000.0;
        let par = match self.mode {
            ConversionMode::DividePar => watts / PAR_FACTOR,
            ConversionMode::MultiplyPar => watts * PAR_FACTOR,
        };
        par * SECONDS_PER_DAY_MOL
    }

    /// DLI after applying the rounding policy.
    pub fn convert_rounded(&self, irradiance: f64, period: Period) -> f64 {
        self.rounding.apply(self.convert(irradiance, period))
    }
}

/// Crop suitability band of a DLI value (0 = lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DliClass {
    /// `< 1`
    VeryLow = 0,
    /// `[1, 3)`
    Low = 1,
    /// `[3, 7)`
    Medium = 2,
    /// `[7, 13)`
    High = 3,
    /// `[13, 19)`
    VeryHigh = 4,
    /// `>= 19`
    Full = 5,
}

impl DliClass {
    pub const ALL: [DliClass; 6] = [
        DliClass::VeryLow,
        DliClass::Low,
        DliClass::Medium,
        DliClass::High,
        DliClass::VeryHigh,
        DliClass::Full,
    ];

    /// Classifies a DLI value. Values below 1 (negative included) are class 0.
    pub fn classify(dli: f64) -> Self {
        if dli < 1.0 {
            DliClass::VeryLow
        } else if dli < 3.0 {
            DliClass::Low
        } else if dli < 7.0 {
            DliClass::Medium
        } else if dli < 13.0 {
            DliClass::High
        } else if dli < 19.0 {
            DliClass::VeryHigh
        } else {
            DliClass::Full
        }
    }

    /// Integer DLI values belonging to the class, inclusive.
    ///
    /// Class 0 is `[0, 0]`; the highest class ends at [`MAX_CLASS_CEILING`].
    pub fn integer_bounds(&self) -> (u32, u32) {
        match self {
            DliClass::VeryLow => (0, 0),
            DliClass::Low => (1, 2),
            DliClass::Medium => (3, 6),
            DliClass::High => (7, 12),
            DliClass::VeryHigh => (13, 18),
            DliClass::Full => (19, MAX_CLASS_CEILING),
        }
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for DliClass {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DliClass::ALL
            .get(value as usize)
            .copied()
            .ok_or(ValidationError::UnknownClass(value))
    }
}

impl From<DliClass> for u8 {
    fn from(class: DliClass) -> Self {
        class.index()
    }
}

impl fmt::Display for DliClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// DLI range `[min, max]` covered by the classes `min_class..=max_class`.
///
/// `min` is the lower bound of `min_class`, `max` the largest integer DLI of
/// `max_class`.
pub fn class_range(min_class: DliClass, max_class: DliClass) -> Result<(u32, u32), ValidationError> {
    if min_class > max_class {
        return Err(ValidationError::ClassRange {
            min: min_class.index(),
            max: max_class.index(),
        });
    }
    Ok((min_class.integer_bounds().0, max_class.integer_bounds().1))
}

/// Class pair of a DLI range; inverse of [`class_range`].
pub fn classify_range(min: f64, max: f64) -> Result<(DliClass, DliClass), ValidationError> {
    let (lo, hi) = (DliClass::classify(min), DliClass::classify(max));
    if lo > hi {
        return Err(ValidationError::ClassRange {
            min: lo.index(),
            max: hi.index(),
        });
    }
    Ok((lo, hi))
}
