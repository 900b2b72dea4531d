//! Depth-only pass that renders the shadow casters from the sun.
//!
//! The resulting map is bound next to the light uniform and sampled with PCF
//! by `castle.wgsl`.

use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{self, Vertex},
        texture::{create_shadow_sampler, Texture},
    },
    pipelines::light::mk_uniform_bind_group_layout,
};

/// The shadow map texture and the comparison sampler reading it.
#[derive(Debug)]
pub struct ShadowMap {
    pub texture: Texture,
    pub sampler: wgpu::Sampler,
}

impl ShadowMap {
    /// Width and height in texels.
    pub const SIZE: u32 = 512;

    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            texture: Texture::create_depth_texture(device, [Self::SIZE, Self::SIZE], "shadow_map"),
            sampler: create_shadow_sampler(device),
        }
    }
}

#[derive(Debug)]
pub struct ShadowResources {
    pub map: ShadowMap,
    /// Light uniform only: the pass writes the map, so it cannot bind it.
    pub bind_group: wgpu::BindGroup,
    pub pipeline: wgpu::RenderPipeline,
}

impl ShadowResources {
    pub fn new(device: &wgpu::Device, map: ShadowMap, light_buffer: &wgpu::Buffer) -> Self {
        let bind_group_layout = mk_uniform_bind_group_layout(
            device,
            wgpu::ShaderStages::VERTEX,
            "shadow_bind_group_layout",
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
            label: Some("shadow_bind_group"),
        });
        let pipeline = mk_shadow_pipeline(device, &bind_group_layout);

        Self {
            map,
            bind_group,
            pipeline,
        }
    }

    /// Starts a pass that clears the shadow map and is ready to draw casters.
    pub fn begin_pass<'a>(
        &'a self,
        encoder: &'a mut wgpu::CommandEncoder,
    ) -> wgpu::RenderPass<'a> {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.map.texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass
    }
}

fn mk_shadow_pipeline(
    device: &wgpu::Device,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[light_bind_group_layout],
        push_constant_ranges: &[],
    });
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Shadow Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[model::ModelVertex::desc(), InstanceRaw::desc()],
            compilation_options: Default::default(),
        },
        fragment: None,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}
