//! Preetham daylight sky, drawn as a full-screen triangle behind the scene.
//!
//! The per-frame constant terms (sun intensity, sun fade, scattering
//! coefficients) are computed once on the CPU and handed to `sky.wgsl`.

use std::f32::consts::E;

use cgmath::InnerSpace;
use wgpu::util::DeviceExt;

use crate::{data_structures::texture::Texture, pipelines::light::mk_uniform_bind_group_layout};

const TOTAL_RAYLEIGH: [f32; 3] = [5.804_543e-6, 1.356_291_1e-5, 3.026_590_3e-5];
const MIE_CONST: [f64; 3] = [1.839_991_851_443_397_8e14, 2.779_802_391_966_052_8e14, 4.079_047_954_386_109_4e14];
const CUTOFF_ANGLE: f32 = 1.611_073_2;
const STEEPNESS: f32 = 1.5;
const EE: f32 = 1000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyParameters {
    pub turbidity: f32,
    pub rayleigh: f32,
    pub mie_coefficient: f32,
    pub mie_directional_g: f32,
    pub sun_position: cgmath::Vector3<f32>,
}

impl Default for SkyParameters {
    fn default() -> Self {
        Self {
            turbidity: 10.0,
            rayleigh: 3.0,
            mie_coefficient: 0.1,
            mie_directional_g: 0.95,
            sun_position: cgmath::Vector3::new(0.3, -0.03, 0.95),
        }
    }
}

fn sun_intensity(zenith_angle_cos: f32) -> f32 {
    let zenith_angle_cos = zenith_angle_cos.clamp(-1.0, 1.0);
    EE * (1.0 - E.powf(-((CUTOFF_ANGLE - zenith_angle_cos.acos()) / STEEPNESS))).max(0.0)
}

fn total_mie(turbidity: f32) -> [f32; 3] {
    let c = (0.2 * turbidity as f64) * 10e-18;
    MIE_CONST.map(|k| (0.434 * c * k) as f32)
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkyUniform {
    pub sun_direction: [f32; 3],
    pub sun_e: f32,
    pub beta_r: [f32; 3],
    pub sunfade: f32,
    pub beta_m: [f32; 3],
    pub mie_directional_g: f32,
}

impl From<&SkyParameters> for SkyUniform {
    fn from(params: &SkyParameters) -> Self {
        let sun_direction = params.sun_position.normalize();
        let sun_e = sun_intensity(sun_direction.y);
        let sunfade = 1.0 - (1.0 - (params.sun_position.y / 450_000.0).exp()).clamp(0.0, 1.0);
        let rayleigh_coefficient = params.rayleigh - (1.0 - sunfade);
        let mie = total_mie(params.turbidity);
        Self {
            sun_direction: sun_direction.into(),
            sun_e,
            beta_r: TOTAL_RAYLEIGH.map(|r| r * rayleigh_coefficient),
            sunfade,
            beta_m: mie.map(|m| m * params.mie_coefficient),
            mie_directional_g: params.mie_directional_g,
        }
    }
}

#[derive(Debug)]
pub struct SkyResources {
    pub uniform: SkyUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub pipeline: wgpu::RenderPipeline,
}

impl SkyResources {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        params: &SkyParameters,
    ) -> Self {
        let uniform = SkyUniform::from(params);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sky Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_uniform_bind_group_layout(
            device,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            "sky_bind_group_layout",
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("sky_bind_group"),
        });
        let pipeline = mk_sky_pipeline(
            device,
            config.format,
            camera_bind_group_layout,
            &bind_group_layout,
        );

        Self {
            uniform,
            buffer,
            bind_group,
            pipeline,
        }
    }

    pub fn draw<'a>(
        &'a self,
        render_pass: &mut wgpu::RenderPass<'a>,
        camera_bind_group: &'a wgpu::BindGroup,
    ) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, camera_bind_group, &[]);
        render_pass.set_bind_group(1, &self.bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

fn mk_sky_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    sky_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Sky Pipeline Layout"),
        bind_group_layouts: &[camera_bind_group_layout, sky_bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Sky Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("sky.wgsl").into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Sky Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        // behind everything, leaves depth alone
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sun_just_below_the_horizon_is_dim() {
        let sky = SkyUniform::from(&SkyParameters::default());
        assert!(sky.sun_e > 0.0);
        assert!(sky.sun_e < 20.0);
        // a sun overhead is the brightest it gets
        assert!((sun_intensity(1.0) - 1000.0 * (1.0 - E.powf(-CUTOFF_ANGLE / 1.5))).abs() < 1e-2);
    }

    #[test]
    fn scattering_follows_rayleigh_and_turbidity() {
        let sky = SkyUniform::from(&SkyParameters::default());
        assert!((sky.sunfade - 1.0).abs() < 1e-5);
        assert!((sky.beta_r[0] / TOTAL_RAYLEIGH[0] - 3.0).abs() < 1e-3);
        // blue scatters the most
        assert!(sky.beta_r[2] > sky.beta_r[1] && sky.beta_r[1] > sky.beta_r[0]);
        assert!(sky.beta_m.iter().all(|m| *m > 0.0 && m.is_finite()));
    }

    #[test]
    fn uniform_packs_into_three_vec4s() {
        assert_eq!(std::mem::size_of::<SkyUniform>(), 48);
    }
}
