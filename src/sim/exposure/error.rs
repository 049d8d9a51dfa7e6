//! Error taxonomy of an exposure simulation run.
//!
//! - [`ValidationError`]: malformed geometry or parameters, mismatched lengths.
//!   Fatal, raised before any output is produced.
//! - [`DecodeError`]: malformed sky-matrix text. Fatal for the period.
//! - [`IntersectionError`]: a single ray query failed. Recovered as
//!   "not occluded" and counted.
//! - [`ToolInvocationError`]: the sky-matrix tool could not be run to completion.
//! - [`WeatherError`]: the weather file could not be split into periods.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use crate::geom::ray::IntersectionError;

use super::period::Period;
use super::radiation::SkyComponent;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("sample point {index} has a zero-length or non-finite normal")]
    ZeroNormal { index: usize },
    #[error("sample point {index} has a non-finite position")]
    NonFinitePosition { index: usize },
    #[error("length mismatch in {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("transmittance {0} is outside [0, 1]")]
    Transmittance(f64),
    #[error("face {face} references vertex {vertex} but the mesh has {vertex_count} vertices")]
    MeshIndex {
        face: usize,
        vertex: usize,
        vertex_count: usize,
    },
    #[error("invalid value for {name}: {value}")]
    Parameter { name: &'static str, value: f64 },
    #[error("month {0} is outside 1-12")]
    Month(u8),
    #[error("DLI class {0} does not exist (valid classes are 0-5)")]
    UnknownClass(u8),
    #[error("DLI class range {min}..{max} is reversed")]
    ClassRange { min: u8, max: u8 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("line {line}: expected 3 RGB values, found {found}")]
    TokenCount { line: usize, found: usize },
    #[error("line {line}: invalid number {token:?}")]
    NotANumber { line: usize, token: String },
    #[error("truncated sky matrix: expected {expected} patches, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("unexpected data at line {line}: all {expected} patches were already read")]
    TrailingData { expected: usize, line: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ToolInvocationError {
    #[error("failed to start `{command}` for {period}: {source}")]
    Spawn {
        command: String,
        period: Period,
        #[source]
        source: std::io::Error,
    },
    #[error("waiting for `{command}` for {period} failed: {source}")]
    Wait {
        command: String,
        period: Period,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` for {period} exited with {status}: {stderr}")]
    NonZeroExit {
        command: String,
        period: Period,
        status: String,
        stderr: String,
    },
    #[error("`{command}` for {period} timed out after {timeout:?}")]
    Timeout {
        command: String,
        period: Period,
        timeout: Duration,
    },
    #[error("`{command}` for {period} wrote non UTF-8 output")]
    NonUtf8Output { command: String, period: Period },
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("weather file has {found} lines but the header needs {expected}")]
    MissingHeader { expected: usize, found: usize },
    #[error("line {line}: invalid month token {token:?}")]
    BadMonth { line: usize, token: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pipeline stage that produced a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Weather,
    SkyMatrix,
    Decode,
    Aggregation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Weather => "weather segmentation",
            Stage::SkyMatrix => "sky matrix generation",
            Stage::Decode => "sky matrix decoding",
            Stage::Aggregation => "aggregation",
        };
        f.write_str(name)
    }
}

/// Fatal error of a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum ExposureError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("weather segmentation failed: {0}")]
    Weather(#[from] WeatherError),
    #[error("sky matrix generation failed: {0}")]
    Tool(#[from] ToolInvocationError),
    #[error("decoding the {component} sky matrix for {period} failed: {source}")]
    Decode {
        period: Period,
        component: SkyComponent,
        #[source]
        source: DecodeError,
    },
    #[error("aggregation for {period} failed: {source}")]
    Aggregation {
        period: Period,
        #[source]
        source: ValidationError,
    },
    #[error("failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ExposureError {
    pub fn stage(&self) -> Stage {
        match self {
            ExposureError::Validation(_) | ExposureError::ThreadPool(_) => Stage::Validation,
            ExposureError::Weather(_) => Stage::Weather,
            ExposureError::Tool(_) => Stage::SkyMatrix,
            ExposureError::Decode { .. } => Stage::Decode,
            ExposureError::Aggregation { .. } => Stage::Aggregation,
        }
    }

    /// Period the error belongs to, if it is period-specific.
    pub fn period(&self) -> Option<Period> {
        match self {
            ExposureError::Decode { period, .. } | ExposureError::Aggregation { period, .. } => {
                Some(*period)
            }
            ExposureError::Tool(e) => Some(match e {
                ToolInvocationError::Spawn { period, .. }
                | ToolInvocationError::Wait { period, .. }
                | ToolInvocationError::NonZeroExit { period, .. }
                | ToolInvocationError::Timeout { period, .. }
                | ToolInvocationError::NonUtf8Output { period, .. } => *period,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_period() {
        let err = ExposureError::Decode {
            period: Period::Month(3),
            component: SkyComponent::Diffuse,
            source: DecodeError::Truncated {
                expected: 145,
                found: 12,
            },
        };
        assert_eq!(err.stage(), Stage::Decode);
        assert_eq!(err.period(), Some(Period::Month(3)));
        let msg = err.to_string();
        assert!(msg.contains("diffuse"));
        assert!(msg.contains("March"));
    }

    #[test]
    fn test_validation_has_no_period() {
        let err: ExposureError = ValidationError::ZeroNormal { index: 4 }.into();
        assert_eq!(err.stage(), Stage::Validation);
        assert!(err.period().is_none());
        assert!(err.to_string().contains("sample point 4"));
    }
}
