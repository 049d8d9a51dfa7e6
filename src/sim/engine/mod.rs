pub mod voxel_grid;

use std::collections::HashSet;

use crate::geom::ray::{IntersectionError, Ray};
use crate::sim::exposure::error::ValidationError;
use crate::{Mesh, Point};

use self::voxel_grid::VoxelGrid;

/// Nearest-hit query against occluding geometry.
///
/// Implementations must be safe to query from many threads at once.
pub trait RayOccluder: Sync {
    /// Distance to the nearest surface hit along `ray` (`t >= 0`).
    ///
    /// Returns `Ok(None)` when nothing is hit. An error means the query
    /// touched geometry that could not be tested and found no valid hit.
    fn nearest_hit(&self, ray: &Ray) -> Result<Option<f64>, IntersectionError>;
}

/// Triangulated occluding scene with a voxel grid for ray queries.
///
/// Holds the merged analysis and context geometry. Read-only after
/// construction.
pub struct ContextMesh {
    triangles: Vec<(Point, Point, Point)>,
    voxel_grid: VoxelGrid,
}

impl ContextMesh {
    /// Builds the scene from a mesh.
    ///
    /// Fails if any face references a missing vertex or if `voxel_size` is
    /// not a positive finite number.
    pub fn new(mesh: &Mesh, voxel_size: f64) -> Result<Self, ValidationError> {
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(ValidationError::Parameter {
                name: "voxel_size",
                value: voxel_size,
            });
        }

        let vertex_count = mesh.vertex_count();
        let mut triangles = Vec::with_capacity(mesh.face_count());
        for (face, f) in mesh.faces.iter().enumerate() {
            for vertex in [f.0, f.1, f.2] {
                if vertex >= vertex_count {
                    return Err(ValidationError::MeshIndex {
                        face,
                        vertex,
                        vertex_count,
                    });
                }
            }
            triangles.push((mesh.vertices[f.0], mesh.vertices[f.1], mesh.vertices[f.2]));
        }

        let skipped = triangles
            .iter()
            .filter(|(a, b, c)| !(a.is_finite() && b.is_finite() && c.is_finite()))
            .count();
        if skipped > 0 {
            tracing::warn!(skipped, "context mesh has triangles with non-finite coordinates");
        }

        let voxel_grid = VoxelGrid::new(&triangles, voxel_size);
        tracing::debug!(
            triangles = triangles.len(),
            cells = voxel_grid.cell_count(),
            step = voxel_grid.step(),
            "context mesh indexed"
        );

        Ok(Self {
            triangles,
            voxel_grid,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Nearest hit using brute-force search over all triangles.
    pub fn nearest_hit_global(&self, ray: &Ray) -> Result<Option<f64>, IntersectionError> {
        let mut closest: Option<f64> = None;
        let mut failure: Option<IntersectionError> = None;

        for (idx, (p0, p1, p2)) in self.triangles.iter().enumerate() {
            match ray.intersect_triangle(idx, *p0, *p1, *p2) {
                Ok(Some(t)) => closest = Some(closest.map_or(t, |best| best.min(t))),
                Ok(None) => {}
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        resolve(closest, failure)
    }
}

impl RayOccluder for ContextMesh {
    /// Walks the voxel grid front to back and stops as soon as the best hit
    /// lies inside the cells already visited.
    fn nearest_hit(&self, ray: &Ray) -> Result<Option<f64>, IntersectionError> {
        let mut closest: Option<f64> = None;
        let mut failure: Option<IntersectionError> = None;
        let mut tested: HashSet<usize> = HashSet::new();

        self.voxel_grid.walk(ray.origin, ray.direction, |ids, t_cell_exit| {
            for &idx in ids {
                if !tested.insert(idx) {
                    continue;
                }
                let (p0, p1, p2) = self.triangles[idx];
                match ray.intersect_triangle(idx, p0, p1, p2) {
                    Ok(Some(t)) => closest = Some(closest.map_or(t, |best| best.min(t))),
                    Ok(None) => {}
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }
            closest.is_some_and(|best| best <= t_cell_exit)
        });

        resolve(closest, failure)
    }
}

/// A valid hit wins over a failed triangle test.
fn resolve(
    closest: Option<f64>,
    failure: Option<IntersectionError>,
) -> Result<Option<f64>, IntersectionError> {
    match (closest, failure) {
        (Some(t), _) => Ok(Some(t)),
        (None, Some(e)) => Err(e),
        (None, None) => Ok(None),
    }
}
