use std::f64::consts::FRAC_PI_2;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::sample::{SamplePoint, validate_points};
use crate::Vector;
use crate::geom::ray::Ray;
use crate::sim::engine::RayOccluder;

/// Default distance the ray origin is moved along the sample normal.
pub const DEFAULT_SURFACE_OFFSET: f64 = 0.01;

/// Visibility of one direction from one sample point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchVisibility {
    pub occluded: bool,
    /// Angle between the sample normal and the direction (radians, `[0, PI]`).
    pub incidence_angle: f64,
}

impl PatchVisibility {
    /// `cos(incidence_angle)` for visible directions, `0` otherwise.
    pub fn cos_factor(&self) -> f64 {
        if self.occluded {
            0.0
        } else {
            self.incidence_angle.cos()
        }
    }
}

/// Per-direction visibility for one sample point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityRow {
    patches: Vec<PatchVisibility>,
    /// Ray queries that failed and were treated as unoccluded.
    intersection_failures: usize,
}

impl VisibilityRow {
    pub fn new(patches: Vec<PatchVisibility>) -> Self {
        Self {
            patches,
            intersection_failures: 0,
        }
    }

    pub fn patches(&self) -> &[PatchVisibility] {
        &self.patches
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn intersection_failures(&self) -> usize {
        self.intersection_failures
    }

    pub fn visible_count(&self) -> usize {
        self.patches.iter().filter(|p| !p.occluded).count()
    }
}

/// Casts one ray per (sample point, direction) pair against an occluder.
pub struct VisibilityEngine<'a, O: RayOccluder + ?Sized> {
    occluder: &'a O,
    surface_offset: f64,
}

impl<'a, O: RayOccluder + ?Sized> VisibilityEngine<'a, O> {
    pub fn new(occluder: &'a O, surface_offset: f64) -> Result<Self, ValidationError> {
        if !(surface_offset.is_finite() && surface_offset >= 0.0) {
            return Err(ValidationError::Parameter {
                name: "surface_offset",
                value: surface_offset,
            });
        }
        Ok(Self {
            occluder,
            surface_offset,
        })
    }

    /// Computes one row per sample point.
    ///
    /// All points are validated before the first ray is cast. Rows are
    /// filled in parallel, each worker writing its own slot.
    pub fn compute(
        &self,
        points: &[SamplePoint],
        directions: &[Vector],
    ) -> Result<Vec<VisibilityRow>, ValidationError> {
        let points = validate_points(points)?;
        let mut rows = vec![VisibilityRow::default(); points.len()];

        rows.par_iter_mut()
            .zip(points.par_iter())
            .for_each(|(row, point)| {
                *row = self.compute_row(point, directions);
            });

        let failures: usize = rows.iter().map(|r| r.intersection_failures).sum();
        if failures > 0 {
            tracing::warn!(failures, "ray queries failed and were treated as unoccluded");
        }
        Ok(rows)
    }

    /// Computes the row of a single, already validated point.
    ///
    /// Directions more than 90° away from the normal are occluded without
    /// casting a ray.
    pub fn compute_row(&self, point: &SamplePoint, directions: &[Vector]) -> VisibilityRow {
        let origin = point.position + point.normal * self.surface_offset;
        let mut intersection_failures = 0;

        let patches = directions
            .iter()
            .map(|&dir| {
                let incidence_angle = point.normal.angle(dir);
                if incidence_angle > FRAC_PI_2 {
                    return PatchVisibility {
                        occluded: true,
                        incidence_angle,
                    };
                }
                let occluded = match Ray::new(origin, dir) {
                    Some(ray) => match self.occluder.nearest_hit(&ray) {
                        Ok(hit) => hit.is_some(),
                        Err(e) => {
                            tracing::warn!(error = %e, "ray query failed, treating direction as visible");
                            intersection_failures += 1;
                            false
                        }
                    },
                    // Directions come from the sky dome and are never zero
                    None => false,
                };
                PatchVisibility {
                    occluded,
                    incidence_angle,
                }
            })
            .collect();

        VisibilityRow {
            patches,
            intersection_failures,
        }
    }
}
