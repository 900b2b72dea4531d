//! Procedural castle layout.
//!
//! Every placement in the scene is a pure function of [`SceneConstants`]: no
//! randomness, no clock, no I/O. Running the generator twice on the same
//! constants gives bit-for-bit identical transforms.
//!
//! - towers and their crenellation rings use polar placement around the tower
//!   centre with a fixed angular step, block 0 at angle 0
//! - bushes use their configured offsets plus one shared tilt
//! - walls sit on the four sides of the wall square, derived from the wall
//!   width and depth

use std::f32::consts::{FRAC_PI_2, TAU};

use cgmath::{Deg, InnerSpace, Matrix3, Quaternion, Rad, Rotation3, Vector3};

use crate::{
    config::{SceneConstants, TowerDimensions},
    data_structures::instance::Instance,
    error::CastleError,
};

/// The rotation that turns an object's forward axis (+Z) towards `target`,
/// keeping world +Y as up.
///
/// Same convention as a scene-graph `lookAt` on a non-camera object. When
/// `position == target` the identity is returned.
pub fn orientation_facing(position: Vector3<f32>, target: Vector3<f32>) -> Quaternion<f32> {
    let up = Vector3::unit_y();
    let mut forward = target - position;
    if forward.magnitude2() == 0.0 {
        return Quaternion::new(1.0, 0.0, 0.0, 0.0);
    }
    forward = forward.normalize();

    let mut right = up.cross(forward);
    if right.magnitude2() == 0.0 {
        // forward is parallel to up: nudge it off the axis
        if up.z.abs() == 1.0 {
            forward.x += 0.0001;
        } else {
            forward.z += 0.0001;
        }
        forward = forward.normalize();
        right = up.cross(forward);
    }
    let right = right.normalize();
    let true_up = forward.cross(right);

    Quaternion::from(Matrix3::from_cols(right, true_up, forward)).normalize()
}

/// One ring of crenellation blocks around a tower centred at (`x`, `z`).
///
/// Block `i` sits at angle `i * 2π / count` on a circle of radius
/// `top.radius - top.inset`, on top of the tower-top cylinder, turned to face
/// the tower's vertical axis.
pub fn crenellation_ring(x: f32, z: f32, tower: &TowerDimensions) -> Vec<Instance> {
    let top = &tower.top;
    let angle_step = TAU / top.count as f32;
    let radius = top.radius - top.inset;
    let y = tower.height + top.height + top.block[1] / 2.0;
    let axis = Vector3::new(x, y, z);

    (0..top.count)
        .map(|i| {
            let angle = i as f32 * angle_step;
            let position = Vector3::new(x + radius * angle.cos(), y, z + radius * angle.sin());
            Instance {
                position,
                rotation: orientation_facing(position, axis),
                scale: Vector3::new(1.0, 1.0, 1.0),
            }
        })
        .collect()
}

/// The tower body, centred at half its height.
pub fn tower_placement(x: f32, z: f32, tower: &TowerDimensions) -> Instance {
    Instance::from(Vector3::new(x, tower.height / 2.0, z))
}

/// The tower-top cylinder, resting on the tower body.
pub fn tower_top_placement(x: f32, z: f32, tower: &TowerDimensions) -> Instance {
    Instance::from(Vector3::new(x, tower.height + tower.top.height / 2.0, z))
}

/// The base plane is built in the XY plane; lay it flat.
pub fn base_placement() -> Instance {
    Instance {
        rotation: Quaternion::from_angle_x(Rad(-FRAC_PI_2)),
        ..Instance::new()
    }
}

/// `translate(x, 0, wall.width/2 + z) ∘ tilt ∘ scale(scale * multiplier)` for
/// every configured bush, in order.
pub fn bush_placements(constants: &SceneConstants) -> Vec<Instance> {
    let style = &constants.bush_style;
    let tilt = Quaternion::from_angle_x(Deg(style.tilt_deg));
    let front = constants.wall.width / 2.0;
    constants
        .bushes
        .iter()
        .map(|bush| {
            Instance::from_parts(
                Vector3::new(bush.x, 0.0, front + bush.z),
                tilt,
                bush.scale * style.scale_multiplier,
            )
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallSide {
    Front,
    Back,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallPlacement {
    pub side: WallSide,
    pub position: Vector3<f32>,
    /// Rotation about +Y in radians.
    pub yaw: f32,
}

impl WallPlacement {
    pub fn to_instance(&self) -> Instance {
        Instance {
            position: self.position,
            rotation: Quaternion::from_angle_y(Rad(self.yaw)),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Front, back, left and right walls.
///
/// The front and side walls sit half a wall depth inside the square spanned by
/// the wall width, the back wall half a depth outside, so the corners overlap
/// rather than leave gaps.
pub fn wall_placements(constants: &SceneConstants) -> [WallPlacement; 4] {
    let wall = &constants.wall;
    let y = wall.height / 2.0;
    let inner = wall.width / 2.0 - wall.depth / 2.0;
    let outer = wall.width / 2.0 + wall.depth / 2.0;
    [
        WallPlacement {
            side: WallSide::Front,
            position: Vector3::new(0.0, y, -inner),
            yaw: 0.0,
        },
        WallPlacement {
            side: WallSide::Back,
            position: Vector3::new(0.0, y, outer),
            yaw: 0.0,
        },
        WallPlacement {
            side: WallSide::Left,
            position: Vector3::new(-inner, y, 0.0),
            yaw: FRAC_PI_2,
        },
        WallPlacement {
            side: WallSide::Right,
            position: Vector3::new(inner, y, 0.0),
            yaw: FRAC_PI_2,
        },
    ]
}

#[derive(Clone, Debug, PartialEq)]
pub struct TowerLayout {
    pub body: Instance,
    pub top: Instance,
    pub crenellations: Vec<Instance>,
}

/// Every static placement of the castle.
#[derive(Clone, Debug, PartialEq)]
pub struct CastleLayout {
    pub base: Instance,
    pub towers: Vec<TowerLayout>,
    pub walls: [WallPlacement; 4],
    pub bushes: Vec<Instance>,
}

impl CastleLayout {
    /// Validates `constants` and derives all placements from them.
    pub fn generate(constants: &SceneConstants) -> Result<Self, CastleError> {
        constants.validate()?;

        let towers = constants
            .towers
            .iter()
            .map(|&[x, z]| TowerLayout {
                body: tower_placement(x, z, &constants.tower),
                top: tower_top_placement(x, z, &constants.tower),
                crenellations: crenellation_ring(x, z, &constants.tower),
            })
            .collect();

        let layout = Self {
            base: base_placement(),
            towers,
            walls: wall_placements(constants),
            bushes: bush_placements(constants),
        };
        log::debug!(
            "Castle layout: {} towers, {} crenellations, {} bushes",
            layout.towers.len(),
            layout.crenellation_count(),
            layout.bushes.len()
        );
        Ok(layout)
    }

    pub fn crenellation_count(&self) -> usize {
        self.towers.iter().map(|t| t.crenellations.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use cgmath::{Rotation, Zero};

    use super::*;

    fn assert_close(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a - b).magnitude() < 1e-5, "{a:?} != {b:?}");
    }

    #[test]
    fn facing_points_forward_axis_at_target() {
        let position = Vector3::new(3.0, 1.0, -2.0);
        let target = Vector3::new(-1.0, 1.0, 4.0);
        let q = orientation_facing(position, target);
        assert_close(q.rotate_vector(Vector3::unit_z()), (target - position).normalize());
        // stays upright for horizontal directions
        assert_close(q.rotate_vector(Vector3::unit_y()), Vector3::unit_y());
    }

    #[test]
    fn facing_straight_up_does_not_degenerate() {
        let q = orientation_facing(Vector3::zero(), Vector3::new(0.0, 5.0, 0.0));
        let forward = q.rotate_vector(Vector3::unit_z());
        assert!(forward.x.is_finite() && forward.y.is_finite() && forward.z.is_finite());
        assert!(forward.y > 0.99);
    }

    #[test]
    fn facing_itself_is_identity() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(orientation_facing(p, p), Quaternion::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn first_crenellation_sits_at_angle_zero() {
        let tower = TowerDimensions::default();
        let ring = crenellation_ring(-20.0, -20.0, &tower);
        let first = ring[0].position;
        assert_eq!(first.x, -20.0 + 4.9);
        assert_eq!(first.z, -20.0);
        assert_eq!(first.y, 16.0 + 2.5 + 0.875);
    }

    #[test]
    fn crenellations_face_the_tower_axis() {
        let tower = TowerDimensions::default();
        for block in crenellation_ring(20.0, -20.0, &tower) {
            let axis = Vector3::new(20.0, block.position.y, -20.0);
            let facing = block.rotation.rotate_vector(Vector3::unit_z());
            assert_close(facing, (axis - block.position).normalize());
        }
    }

    #[test]
    fn opposite_blocks_mirror_each_other() {
        let tower = TowerDimensions::default();
        let ring = crenellation_ring(0.0, 0.0, &tower);
        let a = ring[0].position;
        let b = ring[4].position;
        assert!((a.x + b.x).abs() < 1e-5);
        assert!((a.z + b.z).abs() < 1e-5);
        assert!((b.z.atan2(b.x).abs() - PI).abs() < 1e-5);
    }

    #[test]
    fn tower_parts_stack() {
        let tower = TowerDimensions::default();
        assert_eq!(tower_placement(5.0, 6.0, &tower).position, Vector3::new(5.0, 8.0, 6.0));
        assert_eq!(
            tower_top_placement(5.0, 6.0, &tower).position,
            Vector3::new(5.0, 17.25, 6.0)
        );
    }

    #[test]
    fn base_lies_flat() {
        let up = base_placement().rotation.rotate_vector(Vector3::unit_z());
        assert_close(up, Vector3::unit_y());
    }

    #[test]
    fn bush_transform_composes_translate_tilt_scale() {
        let constants = SceneConstants::default();
        let bushes = bush_placements(&constants);
        let first = bushes[0];
        assert_eq!(first.position, Vector3::new(2.0, 0.0, 21.0 + 2.6));
        assert_eq!(first.scale, Vector3::new(3.75 * 1.5, 3.75 * 1.5, 3.75 * 1.5));
        let tilted = first.rotation.rotate_vector(Vector3::unit_y());
        let expected = Vector3::new(0.0, (-PI / 3.0).cos(), (-PI / 3.0).sin());
        assert_close(tilted, expected);
    }

    #[test]
    fn all_bushes_share_the_tilt() {
        let bushes = bush_placements(&SceneConstants::default());
        assert!(bushes.windows(2).all(|w| w[0].rotation == w[1].rotation));
    }

    #[test]
    fn generate_rejects_invalid_constants_before_placing() {
        let mut constants = SceneConstants::default();
        constants.tower.top.count = 0;
        assert!(matches!(
            CastleLayout::generate(&constants),
            Err(CastleError::Configuration(_))
        ));
    }
}
