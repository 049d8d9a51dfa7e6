use std::collections::HashMap;

use crate::geom::EPS;
use crate::geom::bboxes::{bounding_box, ray_bbox_interval};
use crate::{Point, Vector};

/// Upper bound on the number of cells along any axis.
const MAX_CELLS_PER_AXIS: f64 = 128.0;

type Cell = (i32, i32, i32);

/// Sparse uniform grid of triangle indices.
///
/// Only non-empty cells are stored. Each triangle is registered in every
/// cell overlapped by its bounding box.
pub struct VoxelGrid {
    grid: HashMap<Cell, Vec<usize>>,
    step: f64,
    cells_min: Cell,
    cells_max: Cell,
}

impl VoxelGrid {
    /// Builds the grid for `triangles` with the requested cell size.
    ///
    /// The cell size grows if the scene would need more than
    /// `MAX_CELLS_PER_AXIS` cells along an axis. Triangles with non-finite
    /// coordinates are not indexed.
    pub fn new(triangles: &[(Point, Point, Point)], step: f64) -> Self {
        let mut grid: HashMap<Cell, Vec<usize>> = HashMap::new();

        let finite: Vec<Point> = triangles
            .iter()
            .filter(|(a, b, c)| a.is_finite() && b.is_finite() && c.is_finite())
            .flat_map(|(a, b, c)| [*a, *b, *c])
            .collect();

        let Some((bbox_min, bbox_max)) = bounding_box(&finite) else {
            return Self {
                grid,
                step,
                cells_min: (0, 0, 0),
                cells_max: (-1, -1, -1),
            };
        };

        let extent = (bbox_max.x - bbox_min.x)
            .max(bbox_max.y - bbox_min.y)
            .max(bbox_max.z - bbox_min.z);
        let step = step.max(extent / MAX_CELLS_PER_AXIS);

        for (idx, (a, b, c)) in triangles.iter().enumerate() {
            if !(a.is_finite() && b.is_finite() && c.is_finite()) {
                continue;
            }
            let Some((tmin, tmax)) = bounding_box(&[*a, *b, *c]) else {
                continue;
            };
            let (i0, j0, k0) = cell_of(tmin, step);
            let (i1, j1, k1) = cell_of(tmax, step);
            for i in i0..=i1 {
                for j in j0..=j1 {
                    for k in k0..=k1 {
                        grid.entry((i, j, k)).or_default().push(idx);
                    }
                }
            }
        }

        Self {
            grid,
            step,
            cells_min: cell_of(bbox_min, step),
            cells_max: cell_of(bbox_max, step),
        }
    }

    /// Effective cell size.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    /// Triangle indices registered in the cell containing `pos`.
    pub fn find_at(&self, pos: Point) -> &[usize] {
        self.grid
            .get(&cell_of(pos, self.step))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Walks the cells pierced by the ray in front-to-back order (3D-DDA).
    ///
    /// `visit` receives the triangle indices of each non-empty cell and the
    /// ray parameter at which the ray leaves that cell. Returning `true`
    /// stops the walk. `dir` must be a unit vector.
    pub fn walk<F>(&self, origin: Point, dir: Vector, mut visit: F)
    where
        F: FnMut(&[usize], f64) -> bool,
    {
        if self.grid.is_empty() {
            return;
        }

        let s = self.step;
        let lo = self.cells_min;
        let hi = self.cells_max;
        let box_min = Point::new(lo.0 as f64 * s, lo.1 as f64 * s, lo.2 as f64 * s);
        let box_max = Point::new(
            (hi.0 + 1) as f64 * s,
            (hi.1 + 1) as f64 * s,
            (hi.2 + 1) as f64 * s,
        );
        let Some((t_enter, t_exit)) = ray_bbox_interval(origin, dir, box_min, box_max) else {
            return;
        };

        let entry = origin + dir * t_enter;
        let mut cell = [
            clamp_cell(entry.x, s, lo.0, hi.0),
            clamp_cell(entry.y, s, lo.1, hi.1),
            clamp_cell(entry.z, s, lo.2, hi.2),
        ];
        let cell_lo = [lo.0, lo.1, lo.2];
        let cell_hi = [hi.0, hi.1, hi.2];

        let mut cell_step = [0i32; 3];
        let mut t_max = [f64::INFINITY; 3];
        let mut t_delta = [f64::INFINITY; 3];
        for axis in 0..3 {
            let d = dir.axis(axis);
            let o = origin.axis(axis);
            if d.abs() < EPS {
                continue;
            }
            if d > 0.0 {
                cell_step[axis] = 1;
                t_max[axis] = ((cell[axis] + 1) as f64 * s - o) / d;
            } else {
                cell_step[axis] = -1;
                t_max[axis] = (cell[axis] as f64 * s - o) / d;
            }
            t_delta[axis] = s / d.abs();
        }

        loop {
            let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
                0
            } else if t_max[1] <= t_max[2] {
                1
            } else {
                2
            };
            let t_cell_exit = t_max[axis].min(t_exit);

            if let Some(ids) = self.grid.get(&(cell[0], cell[1], cell[2])) {
                if visit(ids, t_cell_exit) {
                    return;
                }
            }

            if t_max[axis] > t_exit || cell_step[axis] == 0 {
                return;
            }
            cell[axis] += cell_step[axis];
            if cell[axis] < cell_lo[axis] || cell[axis] > cell_hi[axis] {
                return;
            }
            t_max[axis] += t_delta[axis];
        }
    }
}

fn cell_of(p: Point, step: f64) -> Cell {
    (
        (p.x / step).floor() as i32,
        (p.y / step).floor() as i32,
        (p.z / step).floor() as i32,
    )
}

fn clamp_cell(coord: f64, step: f64, lo: i32, hi: i32) -> i32 {
    ((coord / step).floor() as i32).clamp(lo, hi)
}
