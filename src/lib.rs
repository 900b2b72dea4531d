//! castle-ngin
//!
//! A procedurally laid out low-poly castle rendered with wgpu, natively and
//! in the browser. Every surface can be shown with a flat colour or with a
//! PBR texture set loaded asynchronously at startup.
//!
//! High-level modules
//! - `layout`: deterministic placement of base, towers, walls and bushes
//! - `castle`: the castle scene graph, its material toggle and GPU resources
//! - `resources`: asset fetching, texture-set loading and procedural meshes
//! - `camera`: orbit controls, the intro flight and camera uniforms
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `pipelines`: the castle, light and sky pipelines
//! - `render`: per-frame render composition
//! - `flow`: the application event loop
//! - `config`: scene constants and texture paths, optionally read from JSON
//!

pub mod camera;
pub mod castle;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod layout;
pub mod pipelines;
pub mod render;
pub mod resources;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use castle::Castle;
pub use config::{SceneConfig, SceneConstants};
pub use error::CastleError;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    flow::run().map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
