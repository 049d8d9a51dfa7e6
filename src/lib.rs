//! Sky-patch solar exposure simulation.
//!
//! Estimates how much sunlight reaches sample points on a surface using a
//! Tregenza sky subdivision, per-point hemispherical ray casting against
//! context geometry, and a weather-driven sky radiation matrix. Aggregate
//! irradiance is converted to Daily Light Integral (DLI) and classified
//! into suitability bands.

pub mod geom;
pub mod io;
pub mod sim;
pub mod vecutils;

// Prelude
pub use geom::mesh::{Mesh, TriangleIndex};
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use sim::engine::ContextMesh;
pub use sim::exposure::{
    DliClass, ExposureConfig, ExposureError, ExposureResult, ExposureSimulation, SamplePoint,
    SkyDome, TregenzaScheme,
};
