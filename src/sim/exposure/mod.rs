//! Solar exposure of sample points under a Tregenza sky.
//!
//! Pipeline per run:
//! 1. [`SkyDome`] directions (145 sky patches, optionally 145 ground directions).
//! 2. [`VisibilityEngine`] casts one ray per (point, direction) against the
//!    context mesh, once per run.
//! 3. For each period the sky-matrix text is decoded into
//!    [`PatchIrradiance`], extended with the ground term and aggregated per
//!    point.
//! 4. Aggregates are converted to DLI and classified.

pub mod aggregate;
pub mod config;
pub mod dli;
pub mod error;
pub mod period;
pub mod radiation;
pub mod result;
pub mod sample;
pub mod simulation;
pub mod sky_dome;
pub mod tregenza;
pub mod visibility;

pub use aggregate::{GroundRadiation, aggregate, aggregate_all};
pub use config::{CliOverrides, ExposureConfig};
pub use dli::{ConversionMode, DliClass, DliSettings, RoundingPolicy, class_range, classify_range};
pub use error::{
    DecodeError, ExposureError, IntersectionError, Stage, ToolInvocationError, ValidationError,
    WeatherError,
};
pub use period::Period;
pub use radiation::{DecoderSettings, PatchIrradiance, RadiationDecoder, SkyComponent};
pub use result::{ExposureResult, PeriodResult};
pub use sample::SamplePoint;
pub use simulation::ExposureSimulation;
pub use sky_dome::SkyDome;
pub use tregenza::TregenzaScheme;
pub use visibility::{PatchVisibility, VisibilityEngine, VisibilityRow};
