#[cfg(not(target_arch = "wasm32"))]
use anyhow::Context as _;

use crate::resources::loader::AssetFetcher;

/// Bind group layout of a castle material: colour, arm, normal and
/// displacement maps, one shared repeating sampler, and the material uniform.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let map = |binding: u32, visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            map(0, wgpu::ShaderStages::FRAGMENT),
            map(1, wgpu::ShaderStages::FRAGMENT),
            map(2, wgpu::ShaderStages::FRAGMENT),
            // displacement is sampled while placing vertices
            map(3, wgpu::ShaderStages::VERTEX),
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 5,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("Castle material bind group layout"),
    })
}

/// Fetches assets below an asset root: `./<root>/<path>` on disk natively,
/// `<origin>/<root>/<path>` over HTTP in the browser. A missing file or a 404
/// fails with an `io::ErrorKind::NotFound` error.
#[derive(Clone, Debug)]
pub struct AssetDir {
    root: String,
}

impl AssetDir {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn url(&self, file_name: &str) -> anyhow::Result<reqwest::Url> {
        let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
        let origin = window
            .location()
            .origin()
            .map_err(|e| anyhow::anyhow!("no origin: {:?}", e))?;
        let base = reqwest::Url::parse(&format!("{}/{}/", origin, self.root))?;
        Ok(base.join(file_name)?)
    }
}

impl Default for AssetDir {
    fn default() -> Self {
        Self::new("assets")
    }
}

impl AssetFetcher for AssetDir {
    async fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        #[cfg(target_arch = "wasm32")]
        let data = {
            let url = self.url(path)?;
            let response = reqwest::get(url.clone()).await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(std::io::Error::new(std::io::ErrorKind::NotFound, url.to_string()).into());
            }
            response.error_for_status()?.bytes().await?.to_vec()
        };
        #[cfg(not(target_arch = "wasm32"))]
        let data = {
            let path = std::path::Path::new("./").join(&self.root).join(path);
            tokio::fs::read(&path)
                .await
                .with_context(|| path.display().to_string())?
        };

        Ok(data)
    }
}
