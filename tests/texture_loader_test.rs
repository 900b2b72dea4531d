use castle_ngin::{
    config::TextureConfig,
    data_structures::material::SurfaceCategory,
    error::{CastleError, MapKind},
    flow::load_scene,
    resources::loader::{load_all, load_texture_set, ColorSpace},
};
use futures::executor::block_on;

use crate::common::test_utils::{png, MockFetcher, Recorder};

mod common;

fn path(config: &TextureConfig, category: SurfaceCategory, map: MapKind) -> String {
    config.descriptor(category).path_of(map.file_name())
}

#[test]
fn missing_displacement_is_not_an_error() {
    let config = TextureConfig::default();
    let mut fetcher = MockFetcher::complete(&config);
    let disp = path(&config, SurfaceCategory::Floor, MapKind::Displacement);
    fetcher.remove(&disp);
    let recorder = Recorder::default();
    let manager = recorder.manager();

    let set = block_on(load_texture_set(
        &fetcher,
        &manager,
        SurfaceCategory::Floor,
        config.descriptor(SurfaceCategory::Floor),
    ))
    .unwrap();

    assert!(set.disp.is_none());
    assert_eq!(set.maps().count(), 3);
    assert_eq!(recorder.events().errors, vec![disp]);
    assert_eq!(recorder.events().loads, 1);
    assert_eq!(recorder.events().failures, 0);
}

#[test]
fn missing_colour_map_fails_the_set() {
    let config = TextureConfig::default();
    let mut fetcher = MockFetcher::complete(&config);
    fetcher.remove(&path(&config, SurfaceCategory::Bush, MapKind::Color));
    let manager = Recorder::default().manager();

    let err = block_on(load_texture_set(
        &fetcher,
        &manager,
        SurfaceCategory::Bush,
        config.descriptor(SurfaceCategory::Bush),
    ))
    .unwrap_err();

    assert!(matches!(
        err,
        CastleError::RequiredAsset {
            category: SurfaceCategory::Bush,
            map: MapKind::Color,
            ..
        }
    ));
}

#[test]
fn undecodable_required_map_fails_the_set() {
    let config = TextureConfig::default();
    let mut fetcher = MockFetcher::complete(&config);
    let arm = path(&config, SurfaceCategory::TowerTop, MapKind::Arm);
    fetcher.insert(&arm, b"not an image".to_vec());
    let manager = Recorder::default().manager();

    let err = block_on(load_texture_set(
        &fetcher,
        &manager,
        SurfaceCategory::TowerTop,
        config.descriptor(SurfaceCategory::TowerTop),
    ))
    .unwrap_err();

    match err {
        CastleError::RequiredAsset { map, source, .. } => {
            assert_eq!(map, MapKind::Arm);
            assert!(matches!(
                source.downcast_ref::<CastleError>(),
                Some(CastleError::Decode { .. })
            ));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn only_colour_maps_are_display_referred() {
    let config = TextureConfig::default();
    let fetcher = MockFetcher::complete(&config);
    let manager = Recorder::default().manager();

    let textures = block_on(load_all(&fetcher, &manager, &config)).unwrap();

    for set in textures.iter() {
        assert_eq!(set.color.color_space, ColorSpace::Srgb);
        assert_eq!(set.arm.color_space, ColorSpace::Linear);
        assert_eq!(set.normal.color_space, ColorSpace::Linear);
        assert_eq!(set.disp.as_ref().unwrap().color_space, ColorSpace::Linear);
    }
}

#[test]
fn repeat_applies_to_every_map_of_a_category() {
    let config = TextureConfig::default();
    let fetcher = MockFetcher::complete(&config);
    let manager = Recorder::default().manager();

    let textures = block_on(load_all(&fetcher, &manager, &config)).unwrap();

    let floor = textures.get(SurfaceCategory::Floor);
    assert!(floor.maps().all(|m| m.repeat == [8.0, 1.0]));
    let cubes = textures.get(SurfaceCategory::TowerCubes);
    assert!(cubes.maps().all(|m| m.repeat == [0.3, 0.4]));
    assert_eq!(cubes.repeat(), [0.3, 0.4]);
}

#[test]
fn decoded_texels_survive_loading() {
    let config = TextureConfig::default();
    let mut fetcher = MockFetcher::complete(&config);
    fetcher.insert(
        &path(&config, SurfaceCategory::Wall, MapKind::Normal),
        png([127, 127, 255, 255]),
    );
    let manager = Recorder::default().manager();

    let textures = block_on(load_all(&fetcher, &manager, &config)).unwrap();

    let normal = &textures.get(SurfaceCategory::Wall).normal;
    assert_eq!(normal.image.dimensions(), (2, 2));
    assert_eq!(normal.image.get_pixel(1, 1).0, [127, 127, 255, 255]);
}

#[test]
fn progress_counts_every_asset() {
    let config = TextureConfig::default();
    let fetcher = MockFetcher::complete(&config);
    let recorder = Recorder::default();
    let manager = recorder.manager();

    block_on(load_all(&fetcher, &manager, &config)).unwrap();

    let events = recorder.events();
    assert_eq!(fetcher.requests().len(), 24);
    assert_eq!(events.progress.len(), 24);
    assert_eq!(events.progress.last(), Some(&(24, 24)));
    assert!(events.progress.windows(2).all(|w| w[0].0 < w[1].0));
    assert_eq!(events.starts, 1);
    assert_eq!(events.loads, 1);
    assert!(events.errors.is_empty());
}

#[test]
fn load_all_waits_for_every_required_map() {
    let config = TextureConfig::default();
    let fetcher = MockFetcher::complete(&config);
    let release = fetcher.gate(&path(&config, SurfaceCategory::Floor, MapKind::Normal));
    let recorder = Recorder::default();
    let manager = recorder.manager();

    block_on(async {
        let mut load = Box::pin(load_all(&fetcher, &manager, &config));
        assert!(futures::poll!(load.as_mut()).is_pending());
        assert_eq!(recorder.events().loads, 0);

        release.send(()).unwrap();
        let textures = load.await.unwrap();
        assert_eq!(textures.iter().count(), SurfaceCategory::ALL.len());
    });
    assert_eq!(recorder.events().loads, 1);
}

#[test]
fn pending_displacement_does_not_hold_back_the_batch() {
    let config = TextureConfig::default();
    let fetcher = MockFetcher::complete(&config);
    let floor_disp = path(&config, SurfaceCategory::Floor, MapKind::Displacement);
    let _held = fetcher.gate(&floor_disp);
    let recorder = Recorder::default();
    let manager = recorder.manager();

    let textures = block_on(async {
        let mut load = Box::pin(load_all(&fetcher, &manager, &config));
        match futures::poll!(load.as_mut()) {
            std::task::Poll::Ready(result) => result,
            std::task::Poll::Pending => panic!("load_all waits for an optional displacement map"),
        }
    })
    .unwrap();

    assert!(textures.get(SurfaceCategory::Floor).disp.is_none());
    assert!(textures
        .iter()
        .filter(|set| set.category != SurfaceCategory::Floor)
        .all(|set| set.disp.is_some()));
    let events = recorder.events();
    assert_eq!(events.errors, vec![floor_disp]);
    assert_eq!(events.progress.last(), Some(&(24, 24)));
    assert_eq!(events.loads, 1);
    assert_eq!(events.failures, 0);
}

#[test]
fn required_failure_rejects_regardless_of_pending_displacement() {
    let config = TextureConfig::default();
    let mut fetcher = MockFetcher::complete(&config);
    fetcher.remove(&path(&config, SurfaceCategory::Wall, MapKind::Color));
    let _held = fetcher.gate(&path(&config, SurfaceCategory::Floor, MapKind::Displacement));
    let recorder = Recorder::default();
    let manager = recorder.manager();

    let err = block_on(load_all(&fetcher, &manager, &config)).unwrap_err();

    assert!(matches!(
        err,
        CastleError::RequiredAsset {
            category: SurfaceCategory::Wall,
            map: MapKind::Color,
            ..
        }
    ));
    assert_eq!(recorder.events().failures, 1);
    assert_eq!(recorder.events().loads, 0);
}

#[test]
fn invalid_repeat_fails_before_fetching() {
    let mut config = TextureConfig::default();
    config.bush.repeat = [0.0, 1.0];
    let fetcher = MockFetcher::complete(&config);
    let recorder = Recorder::default();
    let manager = recorder.manager();

    let err = block_on(load_all(&fetcher, &manager, &config)).unwrap_err();

    assert!(matches!(err, CastleError::Configuration(_)));
    assert!(fetcher.requests().is_empty());
    assert_eq!(recorder.events().failures, 1);
}

#[test]
fn scene_without_config_file_uses_the_built_in_castle() {
    let fetcher = MockFetcher::complete(&TextureConfig::default());
    let manager = Recorder::default().manager();

    let (castle, textures) = block_on(load_scene(&fetcher, &manager)).unwrap();

    assert_eq!(castle.layout().crenellation_count(), 16);
    assert_eq!(castle.layout().bushes.len(), 22);
    assert!(textures.iter().all(|set| set.disp.is_some()));
}

#[test]
fn scene_config_file_overrides_constants() {
    let mut fetcher = MockFetcher::complete(&TextureConfig::default());
    fetcher.insert(
        "castle.json",
        br#"{ "constants": { "tower": { "top": { "count": 12 } } } }"#.to_vec(),
    );
    let manager = Recorder::default().manager();

    let (castle, _) = block_on(load_scene(&fetcher, &manager)).unwrap();

    assert_eq!(castle.layout().crenellation_count(), 24);
}

#[test]
fn unreadable_config_file_is_fatal() {
    let mut fetcher = MockFetcher::complete(&TextureConfig::default());
    fetcher.insert("castle.json", b"{}".to_vec());
    fetcher.break_with("castle.json", std::io::ErrorKind::PermissionDenied);
    let recorder = Recorder::default();
    let manager = recorder.manager();

    let err = block_on(load_scene(&fetcher, &manager)).unwrap_err();

    assert!(matches!(err, CastleError::Fetch { ref path, .. } if path == "castle.json"));
    assert_eq!(recorder.events().failures, 1);
    assert!(!fetcher.requests().iter().any(|p| p.ends_with(".jpg")));
}

#[test]
fn malformed_config_file_is_fatal() {
    let mut fetcher = MockFetcher::complete(&TextureConfig::default());
    fetcher.insert("castle.json", b"{ constants".to_vec());
    let recorder = Recorder::default();
    let manager = recorder.manager();

    let err = block_on(load_scene(&fetcher, &manager)).unwrap_err();

    assert!(matches!(err, CastleError::Config(_)));
    assert_eq!(recorder.events().failures, 1);
    assert!(!fetcher.requests().iter().any(|p| p.ends_with(".jpg")));
}
