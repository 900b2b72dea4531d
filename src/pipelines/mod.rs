//! Render pipelines.
//!
//! - `basic`: the lit, fogged, optionally displaced castle pipeline
//! - `light`: light and fog uniforms shared by every castle material
//! - `shadow`: the depth-only pass filling the sun's shadow map
//! - `sky`: the Preetham sky behind the scene

pub mod basic;
pub mod light;
pub mod shadow;
pub mod sky;

#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
}
