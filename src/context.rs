//! The GPU and window context.
//!
//! Owns the surface, device and queue plus everything shared by the whole
//! frame: camera, lights and fog, the shadow map, the sky and the castle
//! pipeline.

use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, CameraUniform, OrbitController, Projection, Tween},
    data_structures::{material::srgb_hex, texture},
    pipelines::{
        basic::mk_basic_pipeline,
        light::{LightResources, LightUniform},
        shadow::{ShadowMap, ShadowResources},
        sky::{SkyParameters, SkyResources},
        Pipelines,
    },
    resources::texture::material_layout,
};

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub shadow: ShadowResources,
    pub sky: SkyResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Cannot open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour and rely on an sRGB surface to encode it.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface supports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let intro = Tween::intro();
        let camera = Camera::new(intro.sample(), (0.0, 8.0, -2.0));
        let projection =
            Projection::new(config.width, config.height, cgmath::Deg(40.0), 0.1, 1000.0);
        let controller = OrbitController::new(projection.fovy, config.height);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let shadow_map = ShadowMap::new(&device);
        let light = LightResources::new(LightUniform::castle(), &device, &shadow_map);
        let shadow = ShadowResources::new(&device, shadow_map, &light.buffer);
        let sky = SkyResources::new(
            &device,
            &config,
            &camera_bind_group_layout,
            &SkyParameters::default(),
        );

        let material_layout = material_layout(&device);
        let basic = mk_basic_pipeline(
            &device,
            &config,
            &material_layout,
            &camera_bind_group_layout,
            &light.bind_group_layout,
        );

        let camera = CameraResources {
            camera,
            controller,
            // held back until the castle is ready
            intro: None,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let [r, g, b, _] = srgb_hex(0x04343f);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            shadow,
            sky,
            pipelines: Pipelines {
                basic,
                material_layout,
            },
            clear_colour: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.projection.resize(width, height);
        self.camera.controller.resize(height);
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [width, height],
            "depth_texture",
        );
    }

    /// Starts the intro flight.
    pub fn start_intro(&mut self) {
        self.camera.intro = Some(Tween::intro());
    }

    pub fn update_camera(&mut self, dt: instant::Duration) {
        self.camera.update(dt);
        self.camera
            .uniform
            .update_view_proj(&self.camera.camera, &self.projection);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
    }
}
