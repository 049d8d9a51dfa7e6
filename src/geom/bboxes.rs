use crate::geom::EPS;
use crate::geom::point::Point;
use crate::geom::vector::Vector;

/// Returns the (min, max) corners of the box holding all points `pts`.
///
/// Returns `None` for an empty slice.
pub fn bounding_box(pts: &[Point]) -> Option<(Point, Point)> {
    let first = pts.first()?;
    let mut pmin = *first;
    let mut pmax = *first;
    for p in pts.iter().skip(1) {
        pmin = Point::new(pmin.x.min(p.x), pmin.y.min(p.y), pmin.z.min(p.z));
        pmax = Point::new(pmax.x.max(p.x), pmax.y.max(p.y), pmax.z.max(p.z));
    }
    Some((pmin, pmax))
}

/// Slab test of a ray against an axis-aligned box.
///
/// Returns the parametric interval `(t_enter, t_exit)` clipped to `t >= 0`,
/// or `None` if the ray misses the box.
pub fn ray_bbox_interval(
    origin: Point,
    dir: Vector,
    pmin: Point,
    pmax: Point,
) -> Option<(f64, f64)> {
    let mut t0: f64 = 0.0;
    let mut t1: f64 = f64::INFINITY;

    for axis in 0..3 {
        let o = origin.axis(axis);
        let d = dir.axis(axis);
        let lo = pmin.axis(axis);
        let hi = pmax.axis(axis);

        if d.abs() < EPS {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut ta, mut tb) = ((lo - o) * inv, (hi - o) * inv);
        if ta > tb {
            std::mem::swap(&mut ta, &mut tb);
        }
        t0 = t0.max(ta);
        t1 = t1.min(tb);
        if t0 > t1 {
            return None;
        }
    }

    Some((t0, t1))
}
