//! Frame composition.
//!
//! Once the castle is ready, a depth-only pass renders its shadow casters into
//! the sun's shadow map. The main pass then draws the sky (depth untouched)
//! and every castle node with its active appearance. Before the castle is
//! ready only the sky is drawn.

use std::iter;

use crate::{
    castle::{Castle, CastleGpu},
    context::Context,
};

/// The castle together with its GPU mirror, once both exist.
pub struct Scene {
    pub castle: Castle,
    pub gpu: CastleGpu,
}

pub fn render_frame(ctx: &Context, scene: Option<&Scene>) -> Result<(), wgpu::SurfaceError> {
    let output = ctx.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

    if let Some(scene) = scene {
        let mut shadow_pass = ctx.shadow.begin_pass(&mut encoder);
        scene.gpu.draw_shadow_casters(&mut shadow_pass);
    }

    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(ctx.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        ctx.sky.draw(&mut render_pass, &ctx.camera.bind_group);

        if let Some(scene) = scene {
            render_pass.set_pipeline(&ctx.pipelines.basic);
            scene.gpu.draw(
                &scene.castle,
                &mut render_pass,
                &ctx.camera.bind_group,
                &ctx.light.bind_group,
            );
        }
    }

    ctx.queue.submit(iter::once(encoder.finish()));
    output.present();
    Ok(())
}
