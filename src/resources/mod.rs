//! Everything that turns files or parameters into CPU or GPU resources.
//!
//! - `loader` fetches and decodes PBR texture sets with progress reporting
//! - `mesh` builds the procedural castle geometry
//! - `texture` has the material bind group layout and the asset fetcher

pub mod loader;
pub mod mesh;
pub mod texture;
