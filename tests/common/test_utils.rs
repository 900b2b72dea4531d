use std::{
    cell::RefCell,
    collections::HashMap,
    io::{self, Cursor},
    rc::Rc,
};

use castle_ngin::{
    config::TextureConfig,
    data_structures::material::SurfaceCategory,
    error::{CastleError, MapKind},
    resources::loader::{AssetFetcher, LoadingManager, ProgressSink},
};
use futures::channel::oneshot;

/// A 2x2 PNG filled with `rgba`.
pub fn png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Serves files from memory. Unknown paths fail with `NotFound`, gated paths
/// wait for their sender before answering.
#[derive(Default)]
pub struct MockFetcher {
    files: HashMap<String, Vec<u8>>,
    broken: HashMap<String, io::ErrorKind>,
    gates: RefCell<HashMap<String, oneshot::Receiver<()>>>,
    requests: RefCell<Vec<String>>,
}

impl MockFetcher {
    /// Every map of every category of `config`.
    pub fn complete(config: &TextureConfig) -> Self {
        let mut fetcher = Self::default();
        for category in SurfaceCategory::ALL {
            let descriptor = config.descriptor(category);
            for map in [
                MapKind::Color,
                MapKind::Arm,
                MapKind::Normal,
                MapKind::Displacement,
            ] {
                fetcher.insert(&descriptor.path_of(map.file_name()), png([200, 100, 50, 255]));
            }
        }
        fetcher
    }

    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_string(), bytes);
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
    }

    /// Makes `path` fail with `kind` even if it is present.
    pub fn break_with(&mut self, path: &str, kind: io::ErrorKind) {
        self.broken.insert(path.to_string(), kind);
    }

    /// Holds the answer for `path` back until the returned sender fires.
    pub fn gate(&self, path: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().insert(path.to_string(), rx);
        tx
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl AssetFetcher for MockFetcher {
    async fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.requests.borrow_mut().push(path.to_string());
        let gate = self.gates.borrow_mut().remove(path);
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| anyhow::anyhow!("{path}: request dropped"))?;
        }
        if let Some(&kind) = self.broken.get(path) {
            return Err(io::Error::new(kind, path.to_string()).into());
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()).into())
    }
}

#[derive(Debug, Default)]
pub struct Events {
    pub starts: usize,
    pub progress: Vec<(usize, usize)>,
    pub loads: usize,
    pub errors: Vec<String>,
    pub failures: usize,
}

/// A progress sink whose events stay readable after the manager took it.
#[derive(Clone, Default)]
pub struct Recorder(pub Rc<RefCell<Events>>);

impl Recorder {
    pub fn manager(&self) -> LoadingManager {
        LoadingManager::new(Box::new(self.clone()))
    }

    pub fn events(&self) -> std::cell::Ref<'_, Events> {
        self.0.borrow()
    }
}

impl ProgressSink for Recorder {
    fn on_start(&self, _: &str, _: usize, _: usize) {
        self.0.borrow_mut().starts += 1;
    }

    fn on_progress(&self, _: &str, loaded: usize, total: usize) {
        self.0.borrow_mut().progress.push((loaded, total));
    }

    fn on_load(&self) {
        self.0.borrow_mut().loads += 1;
    }

    fn on_error(&self, url: &str) {
        self.0.borrow_mut().errors.push(url.to_string());
    }

    fn on_failed(&self, _: &CastleError) {
        self.0.borrow_mut().failures += 1;
    }
}
