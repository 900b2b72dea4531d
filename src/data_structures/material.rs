//! Surface categories and the flat/textured material binding table.
//!
//! Every renderable node in the castle carries a [`SurfaceCategory`] tag and a
//! [`MaterialKey`] pointing at its active appearance. Switching between flat
//! colours and PBR textures only swaps keys. Geometry and instances stay as
//! they are.

/// The surface categories of the castle. Each one has its own texture set and
/// its own pair of appearances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurfaceCategory {
    Floor,
    Wall,
    Tower,
    TowerTop,
    TowerCubes,
    Bush,
}

impl SurfaceCategory {
    pub const ALL: [SurfaceCategory; 6] = [
        SurfaceCategory::Floor,
        SurfaceCategory::Wall,
        SurfaceCategory::Tower,
        SurfaceCategory::TowerTop,
        SurfaceCategory::TowerCubes,
        SurfaceCategory::Bush,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            SurfaceCategory::Floor => "floor",
            SurfaceCategory::Wall => "wall",
            SurfaceCategory::Tower => "tower",
            SurfaceCategory::TowerTop => "tower-top",
            SurfaceCategory::TowerCubes => "tower-cubes",
            SurfaceCategory::Bush => "bush",
        }
    }

    /// Everything standing on the base throws a shadow; the base itself doesn't.
    pub fn casts_shadow(self) -> bool {
        !matches!(self, SurfaceCategory::Floor)
    }

    /// Towers and their tops stay unshadowed.
    pub fn receives_shadow(self) -> bool {
        matches!(
            self,
            SurfaceCategory::Floor | SurfaceCategory::Wall | SurfaceCategory::Bush
        )
    }
}

impl std::fmt::Display for SurfaceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Global appearance mode. Exactly one variant of every binding is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaterialMode {
    #[default]
    Flat,
    Textured,
}

impl MaterialMode {
    pub fn from_textures_enabled(enabled: bool) -> Self {
        if enabled {
            MaterialMode::Textured
        } else {
            MaterialMode::Flat
        }
    }
}

/// Handle held by a scene node: which appearance it currently renders with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub category: SurfaceCategory,
    pub mode: MaterialMode,
}

impl MaterialKey {
    pub fn new(category: SurfaceCategory, mode: MaterialMode) -> Self {
        Self { category, mode }
    }
}

/// The two appearances of one category.
#[derive(Clone, Debug)]
pub struct MaterialBinding<M> {
    pub flat: M,
    pub textured: M,
}

impl<M> MaterialBinding<M> {
    pub fn get(&self, mode: MaterialMode) -> &M {
        match mode {
            MaterialMode::Flat => &self.flat,
            MaterialMode::Textured => &self.textured,
        }
    }
}

/// One [`MaterialBinding`] per [`SurfaceCategory`].
///
/// The table can only be built by supplying a binding for every category, so a
/// lookup can never miss.
#[derive(Clone, Debug)]
pub struct MaterialBindings<M> {
    bindings: [MaterialBinding<M>; 6],
}

impl<M> MaterialBindings<M> {
    pub fn from_fn(mut f: impl FnMut(SurfaceCategory) -> MaterialBinding<M>) -> Self {
        Self {
            bindings: std::array::from_fn(|i| f(SurfaceCategory::ALL[i])),
        }
    }

    pub fn binding(&self, category: SurfaceCategory) -> &MaterialBinding<M> {
        &self.bindings[category.index()]
    }

    pub fn get(&self, key: MaterialKey) -> &M {
        self.binding(key.category).get(key.mode)
    }

    pub fn map<N>(&self, mut f: impl FnMut(MaterialKey, &M) -> N) -> MaterialBindings<N> {
        MaterialBindings::from_fn(|category| {
            let binding = self.binding(category);
            MaterialBinding {
                flat: f(MaterialKey::new(category, MaterialMode::Flat), &binding.flat),
                textured: f(
                    MaterialKey::new(category, MaterialMode::Textured),
                    &binding.textured,
                ),
            }
        })
    }
}

/// CPU-side description of an appearance (the `MeshStandardMaterial` knobs we use).
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    /// Linear RGBA base colour, multiplied with the colour map when textured.
    pub color: [f32; 4],
    pub textured: bool,
    pub roughness: f32,
    /// The metalness map is multiplied by this, so with 0 textured surfaces
    /// stay dielectric.
    pub metalness: f32,
    /// Only has an effect when the texture set carries a displacement map.
    pub displacement_scale: f32,
}

impl MaterialDesc {
    pub fn flat(hex: u32) -> Self {
        Self {
            color: srgb_hex(hex),
            textured: false,
            roughness: 1.0,
            metalness: 0.0,
            displacement_scale: 0.0,
        }
    }

    pub fn textured(tint: u32) -> Self {
        Self {
            color: srgb_hex(tint),
            textured: true,
            roughness: 1.0,
            metalness: 0.0,
            displacement_scale: 0.0,
        }
    }

    pub fn with_displacement(mut self, scale: f32) -> Self {
        self.displacement_scale = scale;
        self
    }
}

const BLUE: u32 = 0x0466c8;
const YELLOW: u32 = 0xffd500;
const GREEN: u32 = 0x588157;
const WHITE: u32 = 0xffffff;

/// The castle's appearance table.
pub fn castle_appearances() -> MaterialBindings<MaterialDesc> {
    MaterialBindings::from_fn(|category| match category {
        SurfaceCategory::Floor => MaterialBinding {
            flat: MaterialDesc::flat(BLUE),
            textured: MaterialDesc::textured(WHITE).with_displacement(0.015),
        },
        SurfaceCategory::Wall => MaterialBinding {
            flat: MaterialDesc::flat(BLUE),
            textured: MaterialDesc::textured(0x04343f),
        },
        SurfaceCategory::Tower | SurfaceCategory::TowerTop | SurfaceCategory::TowerCubes => {
            MaterialBinding {
                flat: MaterialDesc::flat(YELLOW),
                textured: MaterialDesc::textured(WHITE),
            }
        }
        SurfaceCategory::Bush => MaterialBinding {
            flat: MaterialDesc::flat(GREEN),
            textured: MaterialDesc::textured(0xadc178),
        },
    })
}

/// Converts a `0xRRGGBB` sRGB colour into linear RGBA.
pub fn srgb_hex(hex: u32) -> [f32; 4] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0), 1.0]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}
