//! Triangle mesh representation.

use crate::Point;
use serde::{Deserialize, Serialize};

/// Type for holding vertex indices for a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriangleIndex(pub usize, pub usize, pub usize);

/// A triangle mesh defined by vertices and face indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point>,
    pub faces: Vec<TriangleIndex>,
}

impl Mesh {
    /// Creates a new mesh with the given vertices and faces.
    pub fn new(vertices: Vec<Point>, faces: Vec<TriangleIndex>) -> Self {
        Self { vertices, faces }
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of faces (triangles).
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Returns the corner points of face `idx`.
    ///
    /// Returns `None` if the face or any of its vertex indices is out of range.
    pub fn triangle(&self, idx: usize) -> Option<(Point, Point, Point)> {
        let f = self.faces.get(idx)?;
        Some((
            *self.vertices.get(f.0)?,
            *self.vertices.get(f.1)?,
            *self.vertices.get(f.2)?,
        ))
    }

    /// Appends all faces of `other`, offsetting its vertex indices.
    ///
    /// Used to merge analysis geometry with blocking context geometry.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|t| TriangleIndex(t.0 + offset, t.1 + offset, t.2 + offset)),
        );
    }
}
