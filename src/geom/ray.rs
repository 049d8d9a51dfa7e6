//! Ray casting infrastructure.
//!
//! This module provides a Ray struct and ray-triangle intersection tests
//! used by the visibility analysis.

use crate::{Point, Vector};

/// Twice the triangle area below which a triangle is treated as degenerate.
const DEGENERATE_AREA: f64 = 1e-12;

/// Determinant below which the ray is treated as parallel to the triangle.
const PARALLEL_EPS: f64 = 1e-12;

/// A single ray-triangle query that could not be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntersectionError {
    #[error("degenerate triangle {0} (zero area)")]
    DegenerateTriangle(usize),
    #[error("triangle {0} has non-finite vertex coordinates")]
    NonFiniteTriangle(usize),
}

/// A ray defined by an origin point and a direction vector.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray
    pub origin: Point,
    /// Direction vector (unit length)
    pub direction: Vector,
}

impl Ray {
    /// Creates a new ray from origin point and direction vector.
    ///
    /// The direction vector is automatically normalized.
    pub fn new(origin: Point, direction: Vector) -> Option<Self> {
        let normalized = direction.normalize()?;
        Some(Self {
            origin,
            direction: normalized,
        })
    }

    /// Intersects the ray with triangle `(p0, p1, p2)` (Möller-Trumbore).
    ///
    /// Returns `Ok(Some(t))` for a hit at distance `t >= 0`, `Ok(None)` for a
    /// miss, and an error if the triangle itself cannot be tested.
    /// `id` is only used to label the error.
    pub fn intersect_triangle(
        &self,
        id: usize,
        p0: Point,
        p1: Point,
        p2: Point,
    ) -> Result<Option<f64>, IntersectionError> {
        if !(p0.is_finite() && p1.is_finite() && p2.is_finite()) {
            return Err(IntersectionError::NonFiniteTriangle(id));
        }

        let e1 = p1 - p0;
        let e2 = p2 - p0;
        if e1.cross(e2).length() < DEGENERATE_AREA {
            return Err(IntersectionError::DegenerateTriangle(id));
        }

        let pvec = self.direction.cross(e2);
        let det = e1.dot(pvec);
        if det.abs() < PARALLEL_EPS {
            return Ok(None); // Ray parallel to triangle
        }
        let inv_det = 1.0 / det;

        let tvec = self.origin - p0;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return Ok(None);
        }

        let qvec = tvec.cross(e1);
        let v = self.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return Ok(None);
        }

        let t = e2.dot(qvec) * inv_det;
        if t < 0.0 {
            return Ok(None); // Behind the origin
        }

        Ok(Some(t))
    }
}
