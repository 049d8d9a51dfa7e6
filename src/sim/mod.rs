pub mod engine;
pub mod exposure;
