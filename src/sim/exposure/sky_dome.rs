use std::f64::consts::PI;

use crate::geom::rotation::rotate_vector_around_axis;
use crate::{Mesh, Point, TriangleIndex, Vector};

use super::tregenza::{NUM_PATCHES, NUM_SKY_ROWS, TregenzaScheme};

/// Discretized sky hemisphere (Tregenza) with optional ground directions.
///
/// Sky directions come first (145, row by row from the horizon up, zenith
/// last), followed by the same number of ground directions when ground
/// reflection is modeled. Ground direction `i` is the negated sky direction
/// `i - 145`.
#[derive(Debug, Clone)]
pub struct SkyDome {
    directions: Vec<Vector>,
    rows: Vec<usize>,
    mesh: Mesh,
}

impl SkyDome {
    /// Builds the sky dome for the given scheme.
    ///
    /// Each row `i` spans `row_angle` vertically, starting from the north
    /// vector (+Y) rotated by `i * row_angle` about the horizontal +X axis.
    /// Patches in a row are obtained by successive rotations about +Z,
    /// clockwise seen from above (north -> east). The quads are kept as a
    /// triangle mesh; the patch direction is the outward normal of its quad.
    pub fn generate(scheme: &TregenzaScheme, include_ground: bool) -> Self {
        let row_angle = scheme.row_angle();
        let counts = scheme.row_patch_counts();
        let x_axis = Vector::new(1., 0., 0.);
        let z_axis = Vector::new(0., 0., 1.);
        let north = Vector::new(0., 1., 0.);

        let capacity = if include_ground { 2 * NUM_PATCHES } else { NUM_PATCHES };
        let mut directions = Vec::with_capacity(capacity);
        let mut rows = Vec::with_capacity(capacity);
        let mut vertices: Vec<Point> = Vec::new();
        let mut faces: Vec<TriangleIndex> = Vec::new();

        for (row, &count) in counts.iter().enumerate().take(NUM_SKY_ROWS) {
            let az_step = 2.0 * PI / count as f64;
            let lower = rotate_vector_around_axis(north, &x_axis, row as f64 * row_angle);
            let upper = rotate_vector_around_axis(north, &x_axis, (row + 1) as f64 * row_angle);

            for j in 0..count {
                let a0 = -(j as f64) * az_step;
                let a1 = -((j + 1) as f64) * az_step;
                let c0 = rotate_vector_around_axis(lower, &z_axis, a0);
                let c1 = rotate_vector_around_axis(lower, &z_axis, a1);
                let c2 = rotate_vector_around_axis(upper, &z_axis, a1);
                let c3 = rotate_vector_around_axis(upper, &z_axis, a0);

                let base = vertices.len();
                vertices.extend([c0, c1, c2, c3].iter().map(|c| Point::new(c.dx, c.dy, c.dz)));
                faces.push(TriangleIndex(base, base + 1, base + 2));
                faces.push(TriangleIndex(base, base + 2, base + 3));

                directions.push(quad_normal(c0, c1, c2, c3));
                rows.push(row);
            }
        }

        // Zenith cap: fan around the top ring of the last row
        let top_row = NUM_SKY_ROWS - 1;
        let top_count = counts[top_row];
        let top_ring = rotate_vector_around_axis(north, &x_axis, NUM_SKY_ROWS as f64 * row_angle);
        let apex = vertices.len();
        vertices.push(Point::new(0., 0., 1.));
        for j in 0..top_count {
            let az_step = 2.0 * PI / top_count as f64;
            let c0 = rotate_vector_around_axis(top_ring, &z_axis, -(j as f64) * az_step);
            let c1 = rotate_vector_around_axis(top_ring, &z_axis, -((j + 1) as f64) * az_step);
            let base = vertices.len();
            vertices.push(Point::new(c0.dx, c0.dy, c0.dz));
            vertices.push(Point::new(c1.dx, c1.dy, c1.dz));
            faces.push(TriangleIndex(apex, base, base + 1));
        }
        directions.push(z_axis);
        rows.push(NUM_SKY_ROWS);

        if include_ground {
            for i in 0..NUM_PATCHES {
                directions.push(-directions[i]);
                rows.push(rows[i]);
            }
        }

        Self {
            directions,
            rows,
            mesh: Mesh::new(vertices, faces),
        }
    }

    /// All directions (sky first, then ground if present).
    pub fn directions(&self) -> &[Vector] {
        &self.directions
    }

    pub fn sky_directions(&self) -> &[Vector] {
        &self.directions[..NUM_PATCHES]
    }

    /// Ground-reflected directions (empty when ground is not modeled).
    pub fn ground_directions(&self) -> &[Vector] {
        &self.directions[NUM_PATCHES..]
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    pub fn has_ground(&self) -> bool {
        self.directions.len() > NUM_PATCHES
    }

    /// Tregenza row of direction `idx` (ground directions share the row of
    /// their mirrored sky patch).
    pub fn row_of(&self, idx: usize) -> Option<usize> {
        self.rows.get(idx).copied()
    }

    /// Triangulated patch geometry on the unit hemisphere.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }
}

/// Outward unit normal of a planar quad given in counter-clockwise order
/// seen from inside the dome.
fn quad_normal(c0: Vector, c1: Vector, c2: Vector, c3: Vector) -> Vector {
    let n = (c2 - c0).cross(c3 - c1);
    let center = c0 + c1 + c2 + c3;
    let n = if n.dot(center) < 0.0 { -n } else { n };
    // Quads of a 12° x 12° grid are never degenerate
    n.normalize().unwrap_or(center)
}
