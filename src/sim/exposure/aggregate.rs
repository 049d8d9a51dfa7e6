use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::radiation::PatchIrradiance;
use super::visibility::VisibilityRow;
use crate::vecutils;

/// Ground fraction used by [`GroundRadiation::default`].
pub const DEFAULT_GROUND_FRACTION: f64 = 0.2;

/// How the irradiance of ground-reflected directions is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundRadiation {
    /// Only the 145 sky directions are used.
    Disabled,
    /// Fraction of the mean total sky patch irradiance.
    FractionOfMean(f64),
    /// Fixed value per ground direction.
    Constant(f64),
    /// `constant`, unless it is exactly 0, then `fraction` of the mean.
    Fallback { constant: f64, fraction: f64 },
}

impl Default for GroundRadiation {
    fn default() -> Self {
        GroundRadiation::FractionOfMean(DEFAULT_GROUND_FRACTION)
    }
}

impl GroundRadiation {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, GroundRadiation::Disabled)
    }

    /// Value assigned to every ground direction, given the total
    /// (direct + diffuse) sky irradiance.
    ///
    /// Returns `None` when ground is disabled.
    pub fn ground_value(&self, total_sky: &PatchIrradiance) -> Option<f64> {
        let mean = || vecutils::mean(total_sky.sky());
        match *self {
            GroundRadiation::Disabled => None,
            GroundRadiation::FractionOfMean(fraction) => Some(fraction * mean()),
            GroundRadiation::Constant(value) => Some(value),
            GroundRadiation::Fallback { constant, fraction } => {
                if constant == 0.0 {
                    Some(fraction * mean())
                } else {
                    Some(constant)
                }
            }
        }
    }

    /// Appends the ground value to a sky irradiance list.
    ///
    /// `total_sky` (direct + diffuse) drives the fraction-based variants.
    pub fn extend(&self, irradiance: PatchIrradiance, total_sky: &PatchIrradiance) -> PatchIrradiance {
        match self.ground_value(total_sky) {
            Some(value) => irradiance.with_ground(value),
            None => irradiance,
        }
    }
}

/// Checks that the transmittance is a fraction in `[0, 1]`.
pub fn check_transmittance(transmittance: f64) -> Result<f64, ValidationError> {
    if (0.0..=1.0).contains(&transmittance) {
        Ok(transmittance)
    } else {
        Err(ValidationError::Transmittance(transmittance))
    }
}

/// Total irradiance received by one sample point.
///
/// `Σ_p visible_p * cos(angle_p) * irradiance[p] * transmittance`
pub fn aggregate(
    row: &VisibilityRow,
    irradiance: &PatchIrradiance,
    transmittance: f64,
) -> Result<f64, ValidationError> {
    let transmittance = check_transmittance(transmittance)?;
    if row.len() != irradiance.len() {
        return Err(ValidationError::LengthMismatch {
            what: "visibility row and irradiance",
            expected: row.len(),
            found: irradiance.len(),
        });
    }

    Ok(row
        .patches()
        .iter()
        .zip(irradiance.values())
        .map(|(p, &irr)| p.cos_factor() * irr * transmittance)
        .sum())
}

/// Aggregates every row in parallel, keeping the row order.
pub fn aggregate_all(
    rows: &[VisibilityRow],
    irradiance: &PatchIrradiance,
    transmittance: f64,
) -> Result<Vec<f64>, ValidationError> {
    check_transmittance(transmittance)?;
    let mut totals = vec![0.0; rows.len()];

    totals
        .par_iter_mut()
        .zip(rows.par_iter())
        .try_for_each(|(total, row)| {
            *total = aggregate(row, irradiance, transmittance)?;
            Ok(())
        })?;

    Ok(totals)
}
