//! Run configuration with defaults and JSON persistence.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::aggregate::{GroundRadiation, check_transmittance};
use super::dli::DliSettings;
use super::error::ValidationError;
use super::radiation::DecoderSettings;
use super::visibility::DEFAULT_SURFACE_OFFSET;
use crate::io::scene::{read_json, write_json};
use crate::io::sky_matrix::ToolSettings;

/// Default voxel size of the context mesh grid (model units).
pub const DEFAULT_VOXEL_SIZE: f64 = 1.0;

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExposureConfig {
    /// Ground-reflected directions and their irradiance.
    pub ground: GroundRadiation,
    /// Fraction of light passing the cover material (0.0 - 1.0).
    pub transmittance: f64,
    /// Ray origin offset along the sample normal.
    pub surface_offset: f64,
    /// Cell size of the occlusion grid.
    pub voxel_size: f64,
    /// Worker threads (`None` = one per core).
    pub threads: Option<usize>,
    /// Simulate the 12 months in addition to the annual period.
    pub monthly: bool,
    /// Log filter used when `RUST_LOG` is not set (e.g. "info", "debug").
    pub log_level: String,
    pub decoder: DecoderSettings,
    pub dli: DliSettings,
    pub tool: ToolSettings,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            ground: GroundRadiation::default(),
            transmittance: 1.0,
            surface_offset: DEFAULT_SURFACE_OFFSET,
            voxel_size: DEFAULT_VOXEL_SIZE,
            threads: None,
            monthly: false,
            log_level: "info".to_string(),
            decoder: DecoderSettings::default(),
            dli: DliSettings::default(),
            tool: ToolSettings::default(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub transmittance: Option<f64>,
    pub threads: Option<usize>,
    pub monthly: Option<bool>,
    pub no_ground: bool,
    pub tool_program: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl ExposureConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(t) = overrides.transmittance {
            self.transmittance = t;
        }
        if let Some(n) = overrides.threads {
            self.threads = Some(n);
        }
        if let Some(m) = overrides.monthly {
            self.monthly = m;
        }
        if overrides.no_ground {
            self.ground = GroundRadiation::Disabled;
        }
        if let Some(program) = &overrides.tool_program {
            self.tool.program = program.clone();
        }
        if let Some(secs) = overrides.timeout_secs {
            self.tool.timeout_secs = secs;
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
    }

    /// Checks all numeric parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_transmittance(self.transmittance)?;
        if !(self.surface_offset.is_finite() && self.surface_offset >= 0.0) {
            return Err(ValidationError::Parameter {
                name: "surface_offset",
                value: self.surface_offset,
            });
        }
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(ValidationError::Parameter {
                name: "voxel_size",
                value: self.voxel_size,
            });
        }
        if self.threads == Some(0) {
            return Err(ValidationError::Parameter {
                name: "threads",
                value: 0.0,
            });
        }
        match self.ground {
            GroundRadiation::FractionOfMean(f) | GroundRadiation::Fallback { fraction: f, .. }
                if !(f.is_finite() && f >= 0.0) =>
            {
                return Err(ValidationError::Parameter {
                    name: "ground fraction",
                    value: f,
                });
            }
            _ => {}
        }
        self.dli.validate()
    }
}
