//! Scene configuration: the numeric constants the layout is derived from and
//! the texture sets to fetch.
//!
//! Everything has a default matching the shipped castle. A `castle.json` next
//! to the assets may override any part of it:
//!
//! ```json
//! { "constants": { "tower": { "top": { "count": 12 } } } }
//! ```

use serde::Deserialize;

use crate::{
    data_structures::material::SurfaceCategory,
    error::CastleError,
    resources::loader::{is_not_found, AssetFetcher},
};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BaseDimensions {
    pub width: f32,
    pub depth: f32,
    /// Plane subdivisions along both axes. Displacement needs a few.
    pub segments: u32,
}

impl Default for BaseDimensions {
    fn default() -> Self {
        Self {
            width: 200.0,
            depth: 180.0,
            segments: 4,
        }
    }
}

/// The ring of crenellation blocks sitting on a tower top.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopRing {
    pub count: u32,
    pub radius: f32,
    /// Blocks are pulled this far inwards from `radius`.
    pub inset: f32,
    /// Height of the tower-top cylinder the blocks stand on.
    pub height: f32,
    /// How much wider the tower-top cylinder is than `radius`.
    pub overhang: f32,
    /// Crenellation block size (x, y, z).
    pub block: [f32; 3],
}

impl Default for TopRing {
    fn default() -> Self {
        Self {
            count: 8,
            radius: 5.0,
            inset: 0.1,
            height: 2.5,
            overhang: 0.5,
            block: [2.0, 1.75, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TowerDimensions {
    pub radius_top: f32,
    pub radius_bottom: f32,
    pub height: f32,
    pub radial_segments: u32,
    pub top: TopRing,
}

impl Default for TowerDimensions {
    fn default() -> Self {
        Self {
            radius_top: 4.0,
            radius_bottom: 5.5,
            height: 16.0,
            radial_segments: 16,
            top: TopRing::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WallDimensions {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Default for WallDimensions {
    fn default() -> Self {
        Self {
            width: 42.0,
            height: 10.0,
            depth: 2.0,
        }
    }
}

/// One bush instance, relative to the front wall line.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct BushPlacement {
    pub scale: f32,
    pub x: f32,
    pub z: f32,
}

impl BushPlacement {
    pub const fn new(scale: f32, x: f32, z: f32) -> Self {
        Self { scale, x, z }
    }
}

const BUSHES: [BushPlacement; 22] = [
    BushPlacement::new(3.75, 2.0, 2.6),
    BushPlacement::new(2.0, 4.5, 2.5),
    BushPlacement::new(2.5, -8.8, 2.7),
    BushPlacement::new(1.3, -1.2, 2.4),
    BushPlacement::new(0.95, 20.0, 2.25),
    BushPlacement::new(2.7, 18.0, 2.05),
    BushPlacement::new(2.25, -21.8, -10.0),
    BushPlacement::new(1.25, -21.3, -12.0),
    BushPlacement::new(4.25, -21.8, -34.0),
    BushPlacement::new(2.25, -21.0, -31.8),
    BushPlacement::new(3.25, 22.0, -12.0),
    BushPlacement::new(1.75, 22.0, -8.0),
    BushPlacement::new(4.4, 21.5, -28.0),
    BushPlacement::new(2.8, 22.1, -25.8),
    BushPlacement::new(2.1, 10.1, -2.4),
    BushPlacement::new(3.2, 18.7, -10.3),
    BushPlacement::new(2.9, -17.2, -12.1),
    BushPlacement::new(1.5, -17.5, -8.6),
    BushPlacement::new(1.8, -18.7, -20.95),
    BushPlacement::new(1.95, 18.7, -18.2),
    BushPlacement::new(3.6, -8.7, -39.35),
    BushPlacement::new(2.7, 1.7, -39.55),
];

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BushStyle {
    /// Rotation about the local X axis applied to every bush, in degrees.
    pub tilt_deg: f32,
    /// Every configured bush scale is multiplied by this.
    pub scale_multiplier: f32,
    pub radius: f32,
    pub segments: u32,
}

impl Default for BushStyle {
    fn default() -> Self {
        Self {
            tilt_deg: -60.0,
            scale_multiplier: 1.5,
            radius: 0.5,
            segments: 12,
        }
    }
}

/// Immutable numeric configuration of the castle.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConstants {
    pub base: BaseDimensions,
    pub tower: TowerDimensions,
    /// Tower centres (x, z).
    pub towers: Vec<[f32; 2]>,
    pub wall: WallDimensions,
    pub bush_style: BushStyle,
    pub bushes: Vec<BushPlacement>,
}

impl Default for SceneConstants {
    fn default() -> Self {
        Self {
            base: BaseDimensions::default(),
            tower: TowerDimensions::default(),
            towers: vec![[-20.0, -20.0], [20.0, -20.0]],
            wall: WallDimensions::default(),
            bush_style: BushStyle::default(),
            bushes: BUSHES.to_vec(),
        }
    }
}

impl SceneConstants {
    /// Rejects anything the layout generator cannot place.
    pub fn validate(&self) -> Result<(), CastleError> {
        positive("base.width", self.base.width)?;
        positive("base.depth", self.base.depth)?;
        nonzero("base.segments", self.base.segments)?;

        let tower = &self.tower;
        positive("tower.radius_top", tower.radius_top)?;
        positive("tower.radius_bottom", tower.radius_bottom)?;
        positive("tower.height", tower.height)?;
        if tower.radial_segments < 3 {
            return Err(CastleError::configuration(format!(
                "tower.radial_segments must be at least 3, got {}",
                tower.radial_segments
            )));
        }
        nonzero("tower.top.count", tower.top.count)?;
        positive("tower.top.radius", tower.top.radius)?;
        positive("tower.top.height", tower.top.height)?;
        finite("tower.top.inset", tower.top.inset)?;
        finite("tower.top.overhang", tower.top.overhang)?;
        if tower.top.radius + tower.top.overhang <= 0.0 {
            return Err(CastleError::configuration(format!(
                "tower.top.overhang ({}) leaves no tower top around tower.top.radius ({})",
                tower.top.overhang, tower.top.radius
            )));
        }
        if tower.top.inset >= tower.top.radius {
            return Err(CastleError::configuration(format!(
                "tower.top.inset ({}) must be smaller than tower.top.radius ({})",
                tower.top.inset, tower.top.radius
            )));
        }
        for (axis, size) in ["x", "y", "z"].iter().zip(tower.top.block) {
            positive(&format!("tower.top.block.{axis}"), size)?;
        }
        for (i, [x, z]) in self.towers.iter().enumerate() {
            finite(&format!("towers[{i}].x"), *x)?;
            finite(&format!("towers[{i}].z"), *z)?;
        }

        positive("wall.width", self.wall.width)?;
        positive("wall.height", self.wall.height)?;
        positive("wall.depth", self.wall.depth)?;

        let style = &self.bush_style;
        finite("bush_style.tilt_deg", style.tilt_deg)?;
        positive("bush_style.scale_multiplier", style.scale_multiplier)?;
        positive("bush_style.radius", style.radius)?;
        if style.segments < 3 {
            return Err(CastleError::configuration(format!(
                "bush_style.segments must be at least 3, got {}",
                style.segments
            )));
        }
        for (i, bush) in self.bushes.iter().enumerate() {
            positive(&format!("bushes[{i}].scale"), bush.scale)?;
            finite(&format!("bushes[{i}].x"), bush.x)?;
            finite(&format!("bushes[{i}].z"), bush.z)?;
        }
        Ok(())
    }
}

fn finite(name: &str, value: f32) -> Result<(), CastleError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CastleError::configuration(format!("{name} must be finite, got {value}")))
    }
}

fn positive(name: &str, value: f32) -> Result<(), CastleError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(CastleError::configuration(format!("{name} must be positive, got {value}")))
    }
}

fn nonzero(name: &str, value: u32) -> Result<(), CastleError> {
    if value == 0 {
        Err(CastleError::configuration(format!("{name} must not be zero")))
    } else {
        Ok(())
    }
}

/// Where one category's maps live and how often they tile.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TextureSetDescriptor {
    /// Directory (relative to the asset root) ending in `/`.
    pub base_path: String,
    /// Horizontal and vertical repeat factors.
    pub repeat: [f32; 2],
}

impl TextureSetDescriptor {
    pub fn new(base_path: &str, repeat: [f32; 2]) -> Self {
        Self {
            base_path: base_path.to_string(),
            repeat,
        }
    }

    pub fn path_of(&self, file_name: &str) -> String {
        if self.base_path.is_empty() || self.base_path.ends_with('/') {
            format!("{}{}", self.base_path, file_name)
        } else {
            format!("{}/{}", self.base_path, file_name)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    pub floor: TextureSetDescriptor,
    pub wall: TextureSetDescriptor,
    pub tower: TextureSetDescriptor,
    pub tower_top: TextureSetDescriptor,
    pub tower_cubes: TextureSetDescriptor,
    pub bush: TextureSetDescriptor,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            floor: TextureSetDescriptor::new("floor/coast_sand_rocks_02_1k/", [8.0, 1.0]),
            wall: TextureSetDescriptor::new("wall/castle_brick_broken_06_1k/", [1.0, 1.0]),
            tower: TextureSetDescriptor::new("wall/castle_brick_broken_06_1k/", [1.0, 1.0]),
            tower_top: TextureSetDescriptor::new("roof/roof_slates_02_1k/", [3.0, 1.0]),
            tower_cubes: TextureSetDescriptor::new("grave/plastered_stone_wall_1k/", [0.3, 0.4]),
            bush: TextureSetDescriptor::new("bush/leaves_forest_ground_1k/", [2.0, 1.0]),
        }
    }
}

impl TextureConfig {
    pub fn descriptor(&self, category: SurfaceCategory) -> &TextureSetDescriptor {
        match category {
            SurfaceCategory::Floor => &self.floor,
            SurfaceCategory::Wall => &self.wall,
            SurfaceCategory::Tower => &self.tower,
            SurfaceCategory::TowerTop => &self.tower_top,
            SurfaceCategory::TowerCubes => &self.tower_cubes,
            SurfaceCategory::Bush => &self.bush,
        }
    }

    pub fn validate(&self) -> Result<(), CastleError> {
        for category in SurfaceCategory::ALL {
            let [u, v] = self.descriptor(category).repeat;
            positive(&format!("textures.{category}.repeat[0]"), u)?;
            positive(&format!("textures.{category}.repeat[1]"), v)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub constants: SceneConstants,
    pub textures: TextureConfig,
}

impl SceneConfig {
    pub const FILE_NAME: &'static str = "castle.json";

    pub fn from_json_str(json: &str) -> Result<Self, CastleError> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CastleError> {
        self.constants.validate()?;
        self.textures.validate()
    }

    /// Reads [`Self::FILE_NAME`] through `fetcher`. A missing file means the
    /// defaults; an unreadable, malformed or invalid one is an error.
    pub async fn load<F: AssetFetcher>(fetcher: &F) -> Result<Self, CastleError> {
        match fetcher.fetch(Self::FILE_NAME).await {
            Ok(bytes) => {
                let json = String::from_utf8_lossy(&bytes);
                let config = Self::from_json_str(&json)?;
                log::info!("Loaded scene configuration from {}", Self::FILE_NAME);
                Ok(config)
            }
            Err(e) if is_not_found(&e) => {
                log::info!(
                    "No {} found ({}), using the built-in castle",
                    Self::FILE_NAME,
                    e
                );
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(source) => Err(CastleError::Fetch {
                path: Self::FILE_NAME.to_string(),
                source,
            }),
        }
    }
}
