pub mod bboxes;
pub mod mesh;
pub mod point;
pub mod ray;
pub mod rotation;
pub mod vector;

/// Geometric precision
pub(crate) const EPS: f64 = 1e-13;

