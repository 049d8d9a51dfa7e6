use crate::Vector;
use ndarray as nd;

/// Calculate rotation matrix for a unit vector `u` and angle `phi`.
///
/// A rotation in 3D can be described with an axis and angle around that axis.
/// The axis is normalized here, so any non-zero vector is accepted.
/// Returns `None` for a zero-length axis.
///
/// Uses the Rodrigues formula (numerically more stable than the explicit
/// trigonometric matrix):
/// https://en.wikipedia.org/wiki/Rodrigues%27_rotation_formula
pub fn rotation_matrix(u: &Vector, phi: f64) -> Option<nd::Array2<f64>> {
    let u = u.normalize()?;
    let w: nd::Array2<f64> = nd::arr2(&[[0., -u.dz, u.dy], [u.dz, 0., -u.dx], [-u.dy, u.dx, 0.]]);

    Some(nd::Array::eye(3) + phi.sin() * &w + (2. * (phi / 2.).sin().powi(2)) * w.dot(&w))
}

/// Rotate vector `v` with the rotation matrix `rot`.
pub fn rotate_vector(v: Vector, rot: &nd::ArrayView2<f64>) -> Vector {
    let col = nd::arr1(&[v.dx, v.dy, v.dz]);
    let out = rot.dot(&col);
    Vector::new(out[0], out[1], out[2])
}

/// Rotate vector `v` around the axis `u` by the angle `phi` (radians).
///
/// Rotation follows the right-hand rule. A zero axis or zero angle returns
/// `v` unchanged.
pub fn rotate_vector_around_axis(v: Vector, u: &Vector, phi: f64) -> Vector {
    if phi == 0.0 {
        return v;
    }
    match rotation_matrix(u, phi) {
        Some(rot) => rotate_vector(v, &rot.view()),
        None => v,
    }
}
