use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::{Mesh, Point, Vector};

/// Location on the analysis surface where exposure is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub position: Point,
    /// Outward surface normal. Normalized by [`SamplePoint::validated`].
    pub normal: Vector,
}

impl SamplePoint {
    pub fn new(position: Point, normal: Vector) -> Self {
        Self { position, normal }
    }

    /// Returns a copy with a unit normal.
    ///
    /// `index` identifies the point in error messages.
    pub fn validated(&self, index: usize) -> Result<Self, ValidationError> {
        if !self.position.is_finite() {
            return Err(ValidationError::NonFinitePosition { index });
        }
        let normal = self
            .normal
            .normalize()
            .ok_or(ValidationError::ZeroNormal { index })?;
        Ok(Self {
            position: self.position,
            normal,
        })
    }

    /// One sample per mesh face, at the face centroid with the face normal.
    ///
    /// Faces with a degenerate normal are skipped.
    pub fn from_mesh_faces(mesh: &Mesh) -> Vec<Self> {
        (0..mesh.face_count())
            .filter_map(|i| {
                let (p0, p1, p2) = mesh.triangle(i)?;
                let normal = Vector::normal(p0, p1, p2)?;
                let centroid = Point::new(
                    (p0.x + p1.x + p2.x) / 3.0,
                    (p0.y + p1.y + p2.y) / 3.0,
                    (p0.z + p1.z + p2.z) / 3.0,
                );
                Some(Self::new(centroid, normal))
            })
            .collect()
    }
}

/// Validates and normalizes all sample points.
///
/// Fails on the first point with a zero-length normal or a non-finite
/// position.
pub fn validate_points(points: &[SamplePoint]) -> Result<Vec<SamplePoint>, ValidationError> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| p.validated(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TriangleIndex;

    #[test]
    fn test_normal_is_normalized() {
        let p = SamplePoint::new(Point::new(1., 2., 3.), Vector::new(0., 0., 4.));
        let v = p.validated(0).unwrap();
        assert_eq!(v.normal, Vector::new(0., 0., 1.));
        assert_eq!(v.position, p.position);
    }

    #[test]
    fn test_zero_normal_rejected() {
        let points = vec![
            SamplePoint::new(Point::new(0., 0., 0.), Vector::new(0., 0., 1.)),
            SamplePoint::new(Point::new(1., 0., 0.), Vector::new(0., 0., 0.)),
        ];
        assert_eq!(
            validate_points(&points),
            Err(ValidationError::ZeroNormal { index: 1 })
        );
    }

    #[test]
    fn test_non_finite_position_rejected() {
        let p = SamplePoint::new(Point::new(f64::NAN, 0., 0.), Vector::new(0., 0., 1.));
        assert_eq!(
            p.validated(3),
            Err(ValidationError::NonFinitePosition { index: 3 })
        );
    }

    #[test]
    fn test_from_mesh_faces() {
        let mesh = Mesh::new(
            vec![
                Point::new(0., 0., 0.),
                Point::new(3., 0., 0.),
                Point::new(0., 3., 0.),
            ],
            vec![TriangleIndex(0, 1, 2), TriangleIndex(0, 0, 1)],
        );
        let samples = SamplePoint::from_mesh_faces(&mesh);
        assert_eq!(samples.len(), 1);
        assert!(samples[0].position.is_close(&Point::new(1., 1., 0.)));
        assert!(samples[0].normal.is_close(&Vector::new(0., 0., 1.)));
    }
}
