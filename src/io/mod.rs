//! File I/O: meshes, sample points, results, weather files and the
//! external sky-matrix tool.

pub mod scene;
pub mod sky_matrix;
pub mod stl;
pub mod weather;

pub use scene::{read_points, read_result, write_points, write_result};
pub use sky_matrix::{SkyMatrixSource, SkyMatrixTool, ToolSettings};
pub use stl::{StlFormat, read_stl, write_stl};
pub use weather::{WeatherData, split_monthly, write_monthly};
