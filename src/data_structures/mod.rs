//! Scene data: instances, materials, meshes, the scene graph and textures.
//!
//! - `instance` holds per-instance transformation data
//! - `material` names the surface categories and their flat/textured appearances
//! - `model` contains mesh and material GPU resources and the draw helpers
//! - `scene_graph` tags castle nodes with their category and active material
//! - `texture` wraps GPU textures and their creation

pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
