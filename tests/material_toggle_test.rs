use castle_ngin::{
    castle::Castle,
    config::SceneConstants,
    data_structures::{
        instance::Instance,
        material::{MaterialKey, MaterialMode, SurfaceCategory},
        scene_graph::SceneNode,
    },
};

fn keys(scene: &SceneNode) -> Vec<(String, MaterialKey)> {
    let mut keys = Vec::new();
    scene.traverse(&mut |node| {
        if let Some(key) = node.material() {
            keys.push((node.name.clone(), key));
        }
    });
    keys
}

fn transforms(scene: &SceneNode) -> Vec<Instance> {
    let mut all = Vec::new();
    scene.traverse(&mut |node| all.extend(node.world_transforms().copied()));
    all
}

#[test]
fn round_trip_restores_every_appearance() {
    let mut castle = Castle::new(SceneConstants::default()).unwrap();
    let before = keys(castle.scene());

    castle.toggle_textures(true);
    assert_ne!(keys(castle.scene()), before);
    castle.toggle_textures(false);

    assert_eq!(keys(castle.scene()), before);
}

#[test]
fn textured_mode_follows_each_nodes_category() {
    let mut castle = Castle::new(SceneConstants::default()).unwrap();

    castle.toggle_textures(true);

    assert_eq!(castle.mode(), MaterialMode::Textured);
    castle.scene().traverse(&mut |node| {
        if let (Some(category), Some(key)) = (node.category(), node.material()) {
            assert_eq!(key, MaterialKey::new(category, MaterialMode::Textured));
        }
    });
}

#[test]
fn toggling_twice_is_a_no_op() {
    let mut castle = Castle::new(SceneConstants::default()).unwrap();
    castle.toggle_textures(true);
    let once = keys(castle.scene());

    castle.toggle_textures(true);

    assert_eq!(keys(castle.scene()), once);
}

#[test]
fn toggling_never_touches_geometry() {
    let mut castle = Castle::new(SceneConstants::default()).unwrap();
    let before = transforms(castle.scene());
    let crenellations = castle.scene().count_category(SurfaceCategory::TowerCubes);

    castle.toggle_textures(true);
    castle.toggle_textures(false);
    castle.toggle_textures(true);

    assert_eq!(transforms(castle.scene()), before);
    assert_eq!(
        castle.scene().count_category(SurfaceCategory::TowerCubes),
        crenellations
    );
}

#[test]
fn every_category_has_both_appearances() {
    let castle = Castle::new(SceneConstants::default()).unwrap();
    for category in SurfaceCategory::ALL {
        let flat = castle.appearance(MaterialKey::new(category, MaterialMode::Flat));
        let textured = castle.appearance(MaterialKey::new(category, MaterialMode::Textured));
        assert_ne!(flat, textured, "{category}");
    }
}
