//! Terra Batch - batch operations over collections of heightmap terrains

pub mod core;
pub mod terrain;
pub mod progress;
pub mod provider;
pub mod batch;
pub mod ops;
