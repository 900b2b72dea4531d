use cgmath::InnerSpace;
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    data_structures::material::srgb_hex,
    pipelines::shadow::ShadowMap,
};

/// Ambient + one shadow-casting directional light, plus the scene fog. Shared
/// by every castle material.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Where the sun sits and the orthographic box its shadow map covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowCamera {
    pub position: cgmath::Point3<f32>,
    pub target: cgmath::Point3<f32>,
    /// Half width and half height of the box.
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
}

impl ShadowCamera {
    /// Sun at (16, 25, 60) aimed at (0, 3, 0), covering +-32 units.
    pub fn castle() -> Self {
        Self {
            position: cgmath::Point3::new(16.0, 25.0, 60.0),
            target: cgmath::Point3::new(0.0, 3.0, 0.0),
            half_extent: 32.0,
            near: 1.0,
            far: 150.0,
        }
    }

    /// Direction the light travels in, normalized.
    pub fn direction(&self) -> cgmath::Vector3<f32> {
        (self.target - self.position).normalize()
    }

    pub fn view_proj(&self) -> cgmath::Matrix4<f32> {
        let up = cgmath::Vector3::unit_y();
        let view = cgmath::Matrix4::look_at_rh(self.position, self.target, up);
        let e = self.half_extent;
        let proj = cgmath::ortho(-e, e, -e, e, self.near, self.far);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// World to shadow-map clip space.
    pub view_proj: [[f32; 4]; 4],
    /// Direction the light travels in, normalized.
    pub direction: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub ambient: f32,
    pub fog_color: [f32; 3],
    /// Exponential-squared fog density.
    pub fog_density: f32,
}

impl LightUniform {
    pub fn new(
        shadow: &ShadowCamera,
        intensity: f32,
        ambient: f32,
        fog_color: u32,
        fog_density: f32,
    ) -> Self {
        let fog = srgb_hex(fog_color);
        Self {
            view_proj: shadow.view_proj().into(),
            direction: shadow.direction().into(),
            intensity,
            color: [1.0, 1.0, 1.0],
            ambient,
            fog_color: [fog[0], fog[1], fog[2]],
            fog_density,
        }
    }

    /// The castle sun, soft ambient fill, teal fog.
    pub fn castle() -> Self {
        Self::new(&ShadowCamera::castle(), 10.0, 0.5, 0x04343f, 0.018)
    }
}

impl LightResources {
    pub fn new(uniform: LightUniform, device: &wgpu::Device, shadow_map: &ShadowMap) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, shadow_map);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// A layout with one uniform buffer at binding 0.
pub fn mk_uniform_bind_group_layout(
    device: &wgpu::Device,
    visibility: wgpu::ShaderStages,
    label: &str,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some(label),
    })
}

/// Light uniform, shadow map and its comparison sampler.
pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
    shadow_map: &ShadowMap,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use cgmath::{Point3, Vector4};

    use super::*;

    #[test]
    fn uniform_packs_into_a_matrix_and_three_vec4s() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 64 + 48);
    }

    #[test]
    fn sun_shines_down_towards_the_castle() {
        let light = LightUniform::castle();
        let d: cgmath::Vector3<f32> = light.direction.into();
        assert!((d.magnitude() - 1.0).abs() < 1e-6);
        assert!(d.y < 0.0 && d.z < 0.0);
    }

    #[test]
    fn shadow_box_covers_walls_and_towers() {
        let view_proj = ShadowCamera::castle().view_proj();
        let corners = [
            Point3::new(-20.0, 0.0, -20.0),
            Point3::new(20.0, 0.0, -20.0),
            Point3::new(-20.0, 0.0, 22.0),
            Point3::new(20.0, 0.0, 22.0),
            Point3::new(-20.0, 21.5, -20.0),
            Point3::new(20.0, 21.5, -20.0),
        ];
        for corner in corners {
            let clip: Vector4<f32> = view_proj * corner.to_homogeneous();
            assert!((clip.w - 1.0).abs() < 1e-6);
            assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0, "{corner:?} -> {clip:?}");
            assert!((0.0..=1.0).contains(&clip.z), "{corner:?} -> {clip:?}");
        }
    }

    #[test]
    fn shadow_box_is_centred_on_the_target() {
        let shadow = ShadowCamera::castle();
        let clip = shadow.view_proj() * shadow.target.to_homogeneous();
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
    }

    #[test]
    fn uniform_carries_the_shadow_camera() {
        let expected: [[f32; 4]; 4] = ShadowCamera::castle().view_proj().into();
        assert_eq!(LightUniform::castle().view_proj, expected);
    }
}
