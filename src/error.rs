//! Error taxonomy for scene construction and asset loading.
//!
//! Only fatal conditions live here. A missing optional map (displacement) is
//! not an error: the loader logs it and stores `None` instead.

use crate::data_structures::material::SurfaceCategory;

/// Which map of a texture set failed to load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapKind {
    Color,
    Arm,
    Normal,
    Displacement,
}

impl MapKind {
    /// File name of this map inside a texture set directory.
    pub fn file_name(self) -> &'static str {
        match self {
            MapKind::Color => "diff_1k.jpg",
            MapKind::Arm => "arm_1k.jpg",
            MapKind::Normal => "nor_gl_1k.jpg",
            MapKind::Displacement => "disp_1k.jpg",
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(self, MapKind::Displacement)
    }
}

impl std::fmt::Display for MapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MapKind::Color => "color",
            MapKind::Arm => "ao/roughness/metalness",
            MapKind::Normal => "normal",
            MapKind::Displacement => "displacement",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CastleError {
    #[error("Invalid scene configuration: {0}")]
    Configuration(String),

    #[error("Required {map} map for {category} failed to load: {source}")]
    RequiredAsset {
        category: SurfaceCategory,
        map: MapKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not decode image {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Could not read {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Malformed scene configuration file: {0}")]
    Config(#[from] serde_json::Error),
}

impl CastleError {
    pub fn configuration<T: ToString>(msg: T) -> Self {
        CastleError::Configuration(msg.to_string())
    }
}
