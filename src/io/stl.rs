//! STL file format I/O for context and analysis meshes.
//!
//! STL stores raw triangles only. Vertices shared between triangles are
//! merged on load so that the resulting [`Mesh`] is indexed.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::{Mesh, Point, TriangleIndex, Vector};

/// STL file format variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    /// ASCII text format (human-readable, larger file size)
    Ascii,
    /// Binary format (compact, faster to read/write)
    Binary,
}

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;
const STL_DEDUP_SCALE: f64 = 1e9;

/// Writes a mesh to an STL file.
pub fn write_stl(path: &Path, mesh: &Mesh, name: &str, format: StlFormat) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        StlFormat::Ascii => write_ascii(&mut writer, mesh, name)?,
        StlFormat::Binary => write_binary(&mut writer, mesh, name)?,
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

fn face_normal(p0: Point, p1: Point, p2: Point) -> Vector {
    Vector::normal(p0, p1, p2).unwrap_or(Vector::new(0.0, 0.0, 1.0))
}

fn triangles(mesh: &Mesh) -> Result<Vec<(Point, Point, Point)>> {
    (0..mesh.face_count())
        .map(|i| {
            mesh.triangle(i)
                .with_context(|| format!("Face {i} references a missing vertex"))
        })
        .collect()
}

fn write_ascii<W: Write>(writer: &mut W, mesh: &Mesh, name: &str) -> Result<()> {
    writeln!(writer, "solid {name}")?;
    for (p0, p1, p2) in triangles(mesh)? {
        let n = face_normal(p0, p1, p2);
        writeln!(writer, "  facet normal {} {} {}", n.dx, n.dy, n.dz)?;
        writeln!(writer, "    outer loop")?;
        for p in [p0, p1, p2] {
            writeln!(writer, "      vertex {} {} {}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {name}")?;
    Ok(())
}

fn write_binary<W: Write>(writer: &mut W, mesh: &Mesh, name: &str) -> Result<()> {
    let tris = triangles(mesh)?;

    let mut header = [0u8; HEADER_LEN];
    let label = format!("binary STL - {name}");
    let len = label.len().min(HEADER_LEN);
    header[..len].copy_from_slice(&label.as_bytes()[..len]);
    writer.write_all(&header)?;
    writer.write_all(&(tris.len() as u32).to_le_bytes())?;

    for (p0, p1, p2) in tris {
        let n = face_normal(p0, p1, p2);
        for v in [n.dx, n.dy, n.dz] {
            writer.write_all(&(v as f32).to_le_bytes())?;
        }
        for p in [p0, p1, p2] {
            for v in [p.x, p.y, p.z] {
                writer.write_all(&(v as f32).to_le_bytes())?;
            }
        }
        // Attribute byte count (unused)
        writer.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

/// Reads an ASCII or binary STL file into an indexed mesh.
///
/// Files starting with `solid` are read as ASCII unless their size matches
/// the binary layout exactly (some exporters write `solid` into the binary
/// header).
pub fn read_stl(path: &Path) -> Result<Mesh> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mesh = if looks_binary(&bytes) {
        parse_binary(&bytes)
    } else {
        parse_ascii(&String::from_utf8_lossy(&bytes))
    }
    .with_context(|| format!("Failed to parse STL file: {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "loaded STL mesh"
    );
    Ok(mesh)
}

fn looks_binary(bytes: &[u8]) -> bool {
    if bytes.len() >= HEADER_LEN + 4 {
        let count = u32::from_le_bytes([
            bytes[HEADER_LEN],
            bytes[HEADER_LEN + 1],
            bytes[HEADER_LEN + 2],
            bytes[HEADER_LEN + 3],
        ]) as usize;
        if bytes.len() == HEADER_LEN + 4 + count * TRIANGLE_LEN {
            return true;
        }
    }
    !String::from_utf8_lossy(&bytes[..bytes.len().min(HEADER_LEN)])
        .trim_start()
        .starts_with("solid")
}

#[derive(Default)]
struct MeshBuilder {
    vertices: Vec<Point>,
    faces: Vec<TriangleIndex>,
    vertex_map: HashMap<(i64, i64, i64), usize>,
}

impl MeshBuilder {
    fn vertex(&mut self, p: Point) -> usize {
        let key = (
            (p.x * STL_DEDUP_SCALE).round() as i64,
            (p.y * STL_DEDUP_SCALE).round() as i64,
            (p.z * STL_DEDUP_SCALE).round() as i64,
        );
        *self.vertex_map.entry(key).or_insert_with(|| {
            self.vertices.push(p);
            self.vertices.len() - 1
        })
    }

    fn triangle(&mut self, p0: Point, p1: Point, p2: Point) {
        let face = TriangleIndex(self.vertex(p0), self.vertex(p1), self.vertex(p2));
        self.faces.push(face);
    }

    fn build(self) -> Mesh {
        Mesh::new(self.vertices, self.faces)
    }
}

fn parse_ascii(text: &str) -> Result<Mesh> {
    let mut builder = MeshBuilder::default();
    let mut current: Vec<Point> = Vec::with_capacity(3);

    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("vertex") {
            let coords: Vec<f64> = rest
                .split_whitespace()
                .map(|t| t.parse::<f64>())
                .collect::<std::result::Result<_, _>>()
                .with_context(|| format!("Invalid vertex at line {}", i + 1))?;
            if coords.len() != 3 {
                bail!("Expected 3 vertex coordinates at line {}", i + 1);
            }
            current.push(Point::new(coords[0], coords[1], coords[2]));
        } else if trimmed.starts_with("endloop") {
            if current.len() == 3 {
                builder.triangle(current[0], current[1], current[2]);
            }
            current.clear();
        }
    }

    Ok(builder.build())
}

fn parse_binary(bytes: &[u8]) -> Result<Mesh> {
    if bytes.len() < HEADER_LEN + 4 {
        bail!("Binary STL shorter than its header");
    }
    let count = u32::from_le_bytes([
        bytes[HEADER_LEN],
        bytes[HEADER_LEN + 1],
        bytes[HEADER_LEN + 2],
        bytes[HEADER_LEN + 3],
    ]) as usize;
    let body = &bytes[HEADER_LEN + 4..];
    if body.len() < count * TRIANGLE_LEN {
        bail!(
            "Binary STL declares {count} triangles but holds {}",
            body.len() / TRIANGLE_LEN
        );
    }

    let read_f32 = |chunk: &[u8], offset: usize| -> f64 {
        f32::from_le_bytes([
            chunk[offset],
            chunk[offset + 1],
            chunk[offset + 2],
            chunk[offset + 3],
        ]) as f64
    };

    let mut builder = MeshBuilder::default();
    for chunk in body.chunks_exact(TRIANGLE_LEN).take(count) {
        // Skip the stored normal (12 bytes)
        let p = |k: usize| {
            let base = 12 + k * 12;
            Point::new(
                read_f32(chunk, base),
                read_f32(chunk, base + 4),
                read_f32(chunk, base + 8),
            )
        };
        builder.triangle(p(0), p(1), p(2));
    }

    Ok(builder.build())
}
