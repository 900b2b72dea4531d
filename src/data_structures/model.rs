//! Meshes, materials and the draw helpers the render loop uses.
//!
//! A [`Mesh`] is uploaded geometry without any notion of appearance. A
//! [`Material`] is one appearance (flat or textured) as a bind group. The two
//! only meet at draw time, which is what lets the castle swap appearances
//! without touching geometry.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::data_structures::{material::MaterialDesc, texture::Texture};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

/**
 * Uniform part of a material. Layout matches `Material` in castle.wgsl.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub repeat: [f32; 2],
    pub roughness: f32,
    pub metalness: f32,
    pub displacement_scale: f32,
    /// 1.0 samples the bound maps, 0.0 ignores them.
    pub use_maps: f32,
    /// 1.0 darkens the surface where the shadow map says it is occluded.
    pub receive_shadow: f32,
    _padding: f32,
}

impl MaterialUniform {
    pub fn new(desc: &MaterialDesc, repeat: [f32; 2], has_displacement: bool) -> Self {
        Self {
            color: desc.color,
            repeat,
            roughness: desc.roughness,
            metalness: desc.metalness,
            displacement_scale: if has_displacement {
                desc.displacement_scale
            } else {
                0.0
            },
            use_maps: if desc.textured { 1.0 } else { 0.0 },
            receive_shadow: 0.0,
            _padding: 0.0,
        }
    }

    pub fn receiving_shadows(mut self, receive: bool) -> Self {
        self.receive_shadow = if receive { 1.0 } else { 0.0 };
        self
    }
}

/// The four maps a material binds. Flat materials bind the neutral defaults.
pub struct MaterialMaps<'a> {
    pub color: &'a Texture,
    pub arm: &'a Texture,
    pub normal: &'a Texture,
    pub displacement: &'a Texture,
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub uniform: MaterialUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        uniform: MaterialUniform,
        maps: MaterialMaps,
        sampler: &wgpu::Sampler,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Material Buffer", name)),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&maps.color.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&maps.arm.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&maps.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&maps.displacement.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: buffer.as_entire_binding(),
                },
            ],
            label: Some(name),
        });

        Self {
            name: String::from(name),
            uniform,
            buffer,
            bind_group,
        }
    }
}

pub trait DrawModel<'a> {
    #[allow(unused)]
    fn draw_mesh(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
    /// Geometry only, for a pass whose bind groups are already set.
    fn draw_mesh_depth_instanced(&mut self, mesh: &'a Mesh, instances: Range<u32>);
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.draw_mesh_instanced(mesh, material, 0..1, camera_bind_group, light_bind_group);
    }

    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_mesh_depth_instanced(&mut self, mesh: &'b Mesh, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }

    #[test]
    fn displacement_needs_a_map() {
        let desc = MaterialDesc::textured(0xffffff).with_displacement(0.015);
        assert_eq!(MaterialUniform::new(&desc, [8.0, 1.0], true).displacement_scale, 0.015);
        assert_eq!(MaterialUniform::new(&desc, [8.0, 1.0], false).displacement_scale, 0.0);
    }

    #[test]
    fn shadows_are_opt_in() {
        let desc = MaterialDesc::flat(0x0466c8);
        assert_eq!(MaterialUniform::new(&desc, [1.0, 1.0], false).receive_shadow, 0.0);
        let receiving = MaterialUniform::new(&desc, [1.0, 1.0], false).receiving_shadows(true);
        assert_eq!(receiving.receive_shadow, 1.0);
    }

    #[test]
    fn flat_materials_ignore_maps() {
        let desc = MaterialDesc::flat(0x0466c8);
        assert_eq!(MaterialUniform::new(&desc, [1.0, 1.0], false).use_maps, 0.0);
    }
}
