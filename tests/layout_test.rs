use std::f32::consts::{FRAC_PI_2, TAU};

use cgmath::{InnerSpace, Rotation, Vector3};

use castle_ngin::{
    config::{BushPlacement, SceneConstants, TowerDimensions},
    data_structures::instance::Instance,
    error::CastleError,
    layout::{bush_placements, crenellation_ring, wall_placements, CastleLayout, WallSide},
};

fn bits(instance: &Instance) -> Vec<u8> {
    bytemuck::bytes_of(&instance.to_raw()).to_vec()
}

#[test]
fn ring_has_one_block_per_configured_crenellation() {
    for count in 1..=24 {
        let mut tower = TowerDimensions::default();
        tower.top.count = count;
        let (cx, cz) = (-20.0, -20.0);

        let ring = crenellation_ring(cx, cz, &tower);

        assert_eq!(ring.len(), count as usize);
        let step = TAU / count as f32;
        for (i, block) in ring.iter().enumerate() {
            let angle = (block.position.z - cz).atan2(block.position.x - cx).rem_euclid(TAU);
            let expected = (i as f32 * step).rem_euclid(TAU);
            let diff = (angle - expected).abs();
            assert!(
                diff < 1e-4 || (TAU - diff) < 1e-4,
                "block {i}/{count}: {angle} != {expected}"
            );
        }
    }
}

#[test]
fn every_block_looks_at_the_tower_axis() {
    let tower = TowerDimensions::default();
    for block in crenellation_ring(3.0, 7.0, &tower) {
        let forward = block.rotation.rotate_vector(Vector3::unit_z());
        let to_axis = Vector3::new(3.0 - block.position.x, 0.0, 7.0 - block.position.z).normalize();
        assert!((forward - to_axis).magnitude() < 1e-4);
    }
}

#[test]
fn every_tower_gets_its_own_ring() {
    let mut constants = SceneConstants::default();
    constants.towers.push([0.0, 30.0]);
    constants.tower.top.count = 5;

    let layout = CastleLayout::generate(&constants).unwrap();

    assert_eq!(layout.towers.len(), 3);
    assert!(layout.towers.iter().all(|t| t.crenellations.len() == 5));
    assert_eq!(layout.crenellation_count(), 15);
}

#[test]
fn one_bush_per_configured_entry() {
    for m in [0, 1, 7, 22] {
        let mut constants = SceneConstants::default();
        constants.bushes = (0..m)
            .map(|i| BushPlacement::new(1.0 + i as f32 * 0.25, i as f32, -(i as f32)))
            .collect();

        let bushes = bush_placements(&constants);

        assert_eq!(bushes.len(), m);
    }
}

#[test]
fn layout_is_reproducible_bit_for_bit() {
    let constants = SceneConstants::default();

    let first = CastleLayout::generate(&constants).unwrap();
    let second = CastleLayout::generate(&constants).unwrap();

    assert_eq!(first.bushes.len(), 22);
    for (a, b) in first.bushes.iter().zip(&second.bushes) {
        assert_eq!(bits(a), bits(b));
    }
    for (a, b) in first.towers.iter().zip(&second.towers) {
        for (x, y) in a.crenellations.iter().zip(&b.crenellations) {
            assert_eq!(bits(x), bits(y));
        }
    }
    assert_eq!(first, second);
}

#[test]
fn bushes_keep_configured_order_and_scale() {
    let constants = SceneConstants::default();
    let bushes = bush_placements(&constants);

    let first = &bushes[0];
    assert_eq!(first.position, Vector3::new(2.0, 0.0, 21.0 + 2.6));
    assert!((first.scale.x - 3.75 * 1.5).abs() < 1e-6);
    assert_eq!(first.scale.x, first.scale.y);
    assert_eq!(first.scale.y, first.scale.z);

    let last = bushes.last().unwrap();
    assert_eq!(last.position.x, 1.7);
}

#[test]
fn walls_sit_on_the_four_sides() {
    let constants = SceneConstants::default();
    assert_eq!(constants.base.width, 200.0);
    assert_eq!(constants.base.depth, 180.0);
    assert_eq!(constants.wall.width, 42.0);
    let h = constants.wall.height;

    let walls = wall_placements(&constants);

    let expected = [
        (WallSide::Front, Vector3::new(0.0, h / 2.0, -20.0), 0.0),
        (WallSide::Back, Vector3::new(0.0, h / 2.0, 22.0), 0.0),
        (WallSide::Left, Vector3::new(-20.0, h / 2.0, 0.0), FRAC_PI_2),
        (WallSide::Right, Vector3::new(20.0, h / 2.0, 0.0), FRAC_PI_2),
    ];
    for (wall, (side, position, yaw)) in walls.iter().zip(expected) {
        assert_eq!(wall.side, side);
        assert_eq!(wall.position, position);
        assert_eq!(wall.yaw, yaw);
    }
}

#[test]
fn invalid_constants_are_a_configuration_error() {
    let mut constants = SceneConstants::default();
    constants.tower.radius_bottom = -1.0;

    let err = CastleLayout::generate(&constants).unwrap_err();

    assert!(matches!(err, CastleError::Configuration(_)));
}
