//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU GPU texture resources,
//! and helper methods for creating depth textures, the neutral stand-in maps a
//! flat material binds, and uploading decoded [`TextureMap`]s.

use crate::resources::loader::{ColorSpace, TextureMap};

/// A GPU texture with a view.
///
/// Wraps WGPU texture objects along with their default views. Textures are used for colour maps, data maps (arm, normal, displacement)
/// and depth. Typically created via [`from_map`](Self::from_map) or
/// via [`create_depth_texture`](Self::create_depth_texture).
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// A 1x1 texture of a single texel, used where a flat material has no map.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texel: [u8; 4],
        color_space: ColorSpace,
        label: &str,
    ) -> Self {
        Self::upload(device, queue, &texel, [1, 1], color_space, Some(label))
    }

    /// White colour map: the material colour passes through unchanged.
    pub fn default_color(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::solid(device, queue, [255, 255, 255, 255], ColorSpace::Srgb, "default color map")
    }

    /// Full occlusion term, full roughness, no metal.
    pub fn default_arm(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::solid(device, queue, [255, 255, 0, 255], ColorSpace::Linear, "default arm map")
    }

    /// The blue/purple-ish colour that represents "no deformation" in a normal map.
    pub fn default_normal(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::solid(device, queue, [127, 127, 255, 255], ColorSpace::Linear, "default normal map")
    }

    /// Zero height.
    pub fn default_displacement(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::solid(device, queue, [0, 0, 0, 255], ColorSpace::Linear, "default displacement map")
    }

    /// Uploads a decoded map. The GPU format follows the map's colour space so
    /// that colour maps are linearised on sampling and data maps are not.
    pub fn from_map(device: &wgpu::Device, queue: &wgpu::Queue, map: &TextureMap) -> Self {
        let (width, height) = map.image.dimensions();
        Self::upload(
            device,
            queue,
            map.image.as_raw(),
            [width, height],
            map.color_space,
            Some(&map.path),
        )
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        dimensions: [u32; 2],
        color_space: ColorSpace,
        label: Option<&str>,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: dimensions[0],
            height: dimensions[1],
            depth_or_array_layers: 1,
        };
        let format = texture_format(color_space);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions[0]),
                rows_per_image: Some(dimensions[1]),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

pub fn texture_format(color_space: ColorSpace) -> wgpu::TextureFormat {
    match color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Linear-filtered depth-comparison sampler for the shadow map.
pub fn create_shadow_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("shadow sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        compare: Some(wgpu::CompareFunction::LessEqual),
        ..Default::default()
    })
}

/// Repeat wrapping on both axes so tiling factors above one work.
pub fn create_repeat_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("repeat sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
