//! Asynchronous PBR texture-set loading.
//!
//! Each surface category owns a directory with four maps: colour, combined
//! AO/roughness/metalness (`arm`), normal, and displacement. The first three are
//! required. A category whose required map fails cannot be textured, so the
//! error goes back to the caller. Displacement is optional: if it is missing the
//! set simply has `disp: None`.
//!
//! All maps of all categories are fetched concurrently on the current task.
//! Progress goes to a [`LoadingManager`] after every single asset, successful
//! or not. It is presentation only and has no effect on the result.
//!
//! There is no cancellation and no timeout. A required fetch that never
//! settles stalls the whole load. Displacement maps are only waited for while
//! the required maps of their category are still in flight.

use std::{cell::Cell, future::Future};

use futures::{
    future::{self, Either},
    FutureExt, TryFutureExt,
};

use crate::{
    config::{TextureConfig, TextureSetDescriptor},
    data_structures::material::SurfaceCategory,
    error::{CastleError, MapKind},
};

/// Where asset bytes come from.
///
/// The engine ships [`crate::resources::texture::AssetDir`], which reads from
/// disk natively and over HTTP in the browser. A missing asset must fail with
/// an [`std::io::Error`] of kind `NotFound` somewhere in its chain.
pub trait AssetFetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>>;
}

/// True if `error` says the asset does not exist, as opposed to failing to
/// read it. Fetchers report absence as [`std::io::ErrorKind::NotFound`].
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
    })
}

/// Receives loading progress. All hooks default to doing nothing.
pub trait ProgressSink {
    /// The first asset of a batch started.
    fn on_start(&self, _url: &str, _loaded: usize, _total: usize) {}

    /// An asset finished (successfully or not).
    fn on_progress(&self, _url: &str, _loaded: usize, _total: usize) {}

    /// Every started asset finished and nothing fatal happened.
    fn on_load(&self) {}

    /// An asset failed. Optional assets report here too.
    fn on_error(&self, _url: &str) {}

    /// The load as a whole failed.
    fn on_failed(&self, _error: &CastleError) {}
}

/// Logs progress and nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_start(&self, url: &str, loaded: usize, total: usize) {
        log::info!("Started loading: {url} ({loaded}/{total})");
    }

    fn on_progress(&self, url: &str, loaded: usize, total: usize) {
        log::info!("Loading {url}: {loaded}/{total} ({}%)", percent(loaded, total));
    }

    fn on_load(&self) {
        log::info!("All assets loaded!");
    }

    fn on_error(&self, url: &str) {
        log::warn!("Failed to load: {url}");
    }

    fn on_failed(&self, error: &CastleError) {
        log::error!("Asset loading failed: {error}");
    }
}

/// Integer percentage in `0..=100`. An empty batch counts as done.
pub fn percent(loaded: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    (loaded.min(total) * 100 / total) as u32
}

/// Counts started and finished assets and forwards them to a [`ProgressSink`].
///
/// The total grows as assets start, so early percentages can jump backwards
/// while a batch is still being issued. Single-threaded by construction.
pub struct LoadingManager {
    sink: Box<dyn ProgressSink>,
    loaded: Cell<usize>,
    total: Cell<usize>,
    loading: Cell<bool>,
    failed: Cell<bool>,
}

impl LoadingManager {
    pub fn new(sink: Box<dyn ProgressSink>) -> Self {
        Self {
            sink,
            loaded: Cell::new(0),
            total: Cell::new(0),
            loading: Cell::new(false),
            failed: Cell::new(false),
        }
    }

    pub fn loaded(&self) -> usize {
        self.loaded.get()
    }

    pub fn total(&self) -> usize {
        self.total.get()
    }

    pub fn item_start(&self, url: &str) {
        self.total.set(self.total.get() + 1);
        if !self.loading.replace(true) {
            self.sink.on_start(url, self.loaded.get(), self.total.get());
        }
    }

    pub fn item_end(&self, url: &str) {
        self.loaded.set(self.loaded.get() + 1);
        self.sink.on_progress(url, self.loaded.get(), self.total.get());
        if self.loaded.get() == self.total.get() {
            self.loading.set(false);
            if !self.failed.get() {
                self.sink.on_load();
            }
        }
    }

    pub fn item_error(&self, url: &str, fatal: bool) {
        if fatal {
            self.failed.set(true);
        }
        self.sink.on_error(url);
    }

    pub fn fail(&self, error: &CastleError) {
        self.failed.set(true);
        self.sink.on_failed(error);
    }
}

impl Default for LoadingManager {
    fn default() -> Self {
        Self::new(Box::new(LogProgress))
    }
}

/// How the texel values of a map are to be interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    /// Display-referred colour (sRGB encoded).
    Srgb,
    /// Raw data: AO/roughness/metalness, normals, heights.
    Linear,
}

/// One decoded image map, ready for upload.
#[derive(Clone, Debug)]
pub struct TextureMap {
    pub path: String,
    pub image: image::RgbaImage,
    pub color_space: ColorSpace,
    /// Horizontal and vertical tiling.
    pub repeat: [f32; 2],
}

/// The maps of one surface category.
#[derive(Clone, Debug)]
pub struct TextureSet {
    pub category: SurfaceCategory,
    pub color: TextureMap,
    pub arm: TextureMap,
    pub normal: TextureMap,
    pub disp: Option<TextureMap>,
}

impl TextureSet {
    pub fn maps(&self) -> impl Iterator<Item = &TextureMap> {
        [&self.color, &self.arm, &self.normal]
            .into_iter()
            .chain(self.disp.as_ref())
    }

    pub fn repeat(&self) -> [f32; 2] {
        self.color.repeat
    }
}

/// A texture set for every category.
#[derive(Clone, Debug)]
pub struct Textures {
    // in `SurfaceCategory::ALL` order
    sets: Vec<TextureSet>,
}

impl Textures {
    pub fn get(&self, category: SurfaceCategory) -> &TextureSet {
        &self.sets[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextureSet> {
        self.sets.iter()
    }
}

/// Registers the map with `manager` right away and returns the future that
/// fetches and decodes it. Registering eagerly lets a whole batch be counted
/// before the first asset can finish.
fn load_map<F: AssetFetcher>(
    fetcher: &F,
    manager: &LoadingManager,
    descriptor: &TextureSetDescriptor,
    kind: MapKind,
) -> impl Future<Output = anyhow::Result<TextureMap>> {
    let path = descriptor.path_of(kind.file_name());
    manager.item_start(&path);

    async move {
        let result = async {
            let bytes = fetcher.fetch(&path).await?;
            let image = image::load_from_memory(&bytes).map_err(|source| CastleError::Decode {
                path: path.clone(),
                source,
            })?;
            let color_space = match kind {
                MapKind::Color => ColorSpace::Srgb,
                _ => ColorSpace::Linear,
            };
            Ok::<TextureMap, anyhow::Error>(TextureMap {
                path: path.clone(),
                image: image.to_rgba8(),
                color_space,
                repeat: descriptor.repeat,
            })
        }
        .await;

        if result.is_err() {
            manager.item_error(&path, kind.is_required());
        }
        manager.item_end(&path);
        result
    }
}

/// Drives `optional` alongside `required` and returns once `required` is
/// done. The optional output is only there if it settled first; a pending
/// optional future is dropped.
async fn join_optional<R: Future, O: Future>(
    required: R,
    optional: O,
) -> (R::Output, Option<O::Output>) {
    let mut optional = Box::pin(future::maybe_done(optional));
    let required = match future::select(optional.as_mut(), Box::pin(required)).await {
        Either::Left(((), required)) => required.await,
        Either::Right((output, _)) => output,
    };
    (required, optional.as_mut().take_output())
}

/// Loads the maps of one category. Required maps fail the set, a missing
/// displacement map only logs a warning.
///
/// Displacement never holds the set back: once the required maps are in, a
/// displacement fetch still in flight is abandoned and the set has no
/// displacement. All four maps are registered with `manager` when this is
/// called, not when the returned future is first polled.
pub fn load_texture_set<F: AssetFetcher>(
    fetcher: &F,
    manager: &LoadingManager,
    category: SurfaceCategory,
    descriptor: &TextureSetDescriptor,
) -> impl Future<Output = Result<TextureSet, CastleError>> {
    let required = |map: MapKind| {
        load_map(fetcher, manager, descriptor, map).map_err(move |source| {
            CastleError::RequiredAsset {
                category,
                map,
                source,
            }
        })
    };
    let color = required(MapKind::Color);
    let arm = required(MapKind::Arm);
    let normal = required(MapKind::Normal);
    let disp_path = descriptor.path_of(MapKind::Displacement.file_name());
    let disp = load_map(fetcher, manager, descriptor, MapKind::Displacement).map(move |result| {
        match result {
            Ok(map) => Some(map),
            Err(e) => {
                log::warn!("No displacement map for {category}, continuing without: {e}");
                None
            }
        }
    });

    async move {
        let (required, disp) =
            join_optional(async { futures::try_join!(color, arm, normal) }, disp).await;
        let (color, arm, normal) = required?;
        let disp = disp.unwrap_or_else(|| {
            log::warn!("Displacement map {disp_path} still pending, continuing without");
            manager.item_error(&disp_path, false);
            manager.item_end(&disp_path);
            None
        });
        Ok(TextureSet {
            category,
            color,
            arm,
            normal,
            disp,
        })
    }
}

/// Loads every category concurrently.
///
/// Resolves once all required maps resolved; fails with the first required
/// failure. Displacement maps never delay the result.
pub async fn load_all<F: AssetFetcher>(
    fetcher: &F,
    manager: &LoadingManager,
    config: &TextureConfig,
) -> Result<Textures, CastleError> {
    if let Err(e) = config.validate() {
        manager.fail(&e);
        return Err(e);
    }

    let pending: Vec<_> = SurfaceCategory::ALL
        .iter()
        .map(|&category| load_texture_set(fetcher, manager, category, config.descriptor(category)))
        .collect();

    match future::try_join_all(pending).await {
        Ok(sets) => {
            let missing_disp = sets.iter().filter(|s| s.disp.is_none()).count();
            log::info!(
                "Loaded {} texture sets ({} without displacement)",
                sets.len(),
                missing_disp
            );
            Ok(Textures { sets })
        }
        Err(e) => {
            manager.fail(&e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_io_not_found_means_absent() {
        let missing = anyhow::Error::new(std::io::Error::from(std::io::ErrorKind::NotFound))
            .context("castle.json");
        let denied = anyhow::Error::new(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(is_not_found(&missing));
        assert!(!is_not_found(&denied));
        assert!(!is_not_found(&anyhow::anyhow!("500 Internal Server Error")));
    }

    #[test]
    fn percent_is_clamped_and_floored() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(5, 4), 100);
    }

    #[derive(Default)]
    struct Recorder {
        starts: Cell<usize>,
        loads: Cell<usize>,
    }

    impl ProgressSink for std::rc::Rc<Recorder> {
        fn on_start(&self, _: &str, _: usize, _: usize) {
            self.starts.set(self.starts.get() + 1);
        }

        fn on_load(&self) {
            self.loads.set(self.loads.get() + 1);
        }
    }

    #[test]
    fn start_and_load_fire_once_per_batch() {
        let recorder = std::rc::Rc::new(Recorder::default());
        let manager = LoadingManager::new(Box::new(recorder.clone()));
        manager.item_start("a");
        manager.item_start("b");
        manager.item_end("a");
        assert_eq!(recorder.loads.get(), 0);
        manager.item_end("b");
        assert_eq!(recorder.starts.get(), 1);
        assert_eq!(recorder.loads.get(), 1);
    }

    #[test]
    fn fatal_errors_suppress_on_load() {
        let recorder = std::rc::Rc::new(Recorder::default());
        let manager = LoadingManager::new(Box::new(recorder.clone()));
        manager.item_start("a");
        manager.item_error("a", true);
        manager.item_end("a");
        assert_eq!(recorder.loads.get(), 0);
    }

    #[test]
    fn optional_errors_still_complete_the_batch() {
        let recorder = std::rc::Rc::new(Recorder::default());
        let manager = LoadingManager::new(Box::new(recorder.clone()));
        manager.item_start("disp");
        manager.item_error("disp", false);
        manager.item_end("disp");
        assert_eq!(recorder.loads.get(), 1);
    }
}
