//! JSON I/O for sample points and simulation results.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::sim::exposure::{ExposureResult, SamplePoint};

/// Reads any JSON document from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to deserialize JSON from: {}", path.display()))
}

/// Writes `value` as pretty JSON to `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("Failed to serialize JSON to: {}", path.display()))
}

/// Reads sample points: a JSON array of `{"position": .., "normal": ..}`.
pub fn read_points(path: &Path) -> Result<Vec<SamplePoint>> {
    read_json(path)
}

pub fn write_points(path: &Path, points: &[SamplePoint]) -> Result<()> {
    write_json(path, points)
}

pub fn write_result(path: &Path, result: &ExposureResult) -> Result<()> {
    write_json(path, result)
}

pub fn read_result(path: &Path) -> Result<ExposureResult> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point, Vector};
    use tempfile::tempdir;

    #[test]
    fn test_points_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("points.json");
        let points = vec![
            SamplePoint::new(Point::new(0., 0., 0.), Vector::new(0., 0., 1.)),
            SamplePoint::new(Point::new(1., 2., 0.5), Vector::new(1., 0., 0.)),
        ];
        write_points(&path, &points)?;
        assert_eq!(read_points(&path)?, points);
        Ok(())
    }

    #[test]
    fn test_points_json_layout() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("points.json");
        std::fs::write(
            &path,
            r#"[{"position": {"x": 1, "y": 2, "z": 3}, "normal": {"dx": 0, "dy": 0, "dz": 1}}]"#,
        )?;
        let points = read_points(&path)?;
        assert_eq!(points[0].position, Point::new(1., 2., 3.));
        Ok(())
    }

    #[test]
    fn test_malformed_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json")?;
        let err = read_points(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.json"));
        Ok(())
    }
}
