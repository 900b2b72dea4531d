//! Application event loop.
//!
//! The app goes through three stages:
//! 1. `resumed` creates the window and the GPU [`Context`]
//! 2. the scene configuration and all texture sets are loaded, progress going
//!    to the log (and the loading screen in the browser)
//! 3. once loaded, the castle is uploaded, the intro flight starts and every
//!    redraw updates the camera and renders sky and castle
//!
//! Natively the async work is driven by a tokio runtime and blocks `resumed`.
//! In the browser it runs with `spawn_local` and reports back through
//! [`FlowEvent`]s. A failed load is fatal: the castle is never shown and the
//! sky keeps rendering alone.

use std::{fmt::Debug, sync::Arc};

use instant::Instant;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::Window,
};

use crate::{
    castle::{Castle, CastleGpu},
    config::SceneConfig,
    context::Context,
    error::CastleError,
    render::{render_frame, Scene},
    resources::{
        loader::{load_all, AssetFetcher, LoadingManager, ProgressSink, Textures},
        texture::AssetDir,
    },
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Reads the scene configuration, lays out the castle and loads every texture
/// set. The castle is returned in flat mode.
pub async fn load_scene<F: AssetFetcher>(
    fetcher: &F,
    manager: &LoadingManager,
) -> Result<(Castle, Textures), CastleError> {
    let config = match SceneConfig::load(fetcher).await {
        Ok(config) => config,
        Err(e) => {
            manager.fail(&e);
            return Err(e);
        }
    };
    let castle = match Castle::new(config.constants) {
        Ok(castle) => castle,
        Err(e) => {
            manager.fail(&e);
            return Err(e);
        }
    };
    let textures = load_all(fetcher, manager, &config.textures).await?;
    Ok((castle, textures))
}

fn progress_sink() -> Box<dyn ProgressSink> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(crate::web::DomProgress::default())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(crate::resources::loader::LogProgress)
    }
}

/// GPU context plus surface status.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    is_surface_configured: bool,
}

impl AppState {
    fn new(ctx: Context) -> Self {
        Self {
            ctx,
            is_surface_configured: false,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self, scene: Option<&Scene>) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }
        render_frame(&self.ctx, scene)
    }
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized(Box<Context>),
    #[allow(dead_code)]
    Loaded(Result<(Castle, Textures), CastleError>),
    #[allow(dead_code)]
    SetTextures(bool),
    #[allow(dead_code)]
    Exit,
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Loaded(Ok(_)) => f.write_str("Loaded(Ok)"),
            Self::Loaded(Err(e)) => f.debug_tuple("Loaded").field(e).finish(),
            Self::SetTextures(enabled) => f.debug_tuple("SetTextures").field(enabled).finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    state: Option<AppState>,
    scene: Option<Scene>,
    // requested appearance, applied when the castle arrives
    use_textures: bool,
    started: bool,
    assets: AssetDir,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            scene: None,
            use_textures: false,
            started: false,
            assets: AssetDir::default(),
            last_time: Instant::now(),
        })
    }

    fn on_initialized(&mut self, ctx: Context) {
        let mut state = AppState::new(ctx);
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        state.ctx.window.request_redraw();
        self.state = Some(state);
    }

    fn on_loaded(&mut self, result: Result<(Castle, Textures), CastleError>) {
        let Some(state) = self.state.as_mut() else {
            log::error!("Scene loaded without a GPU context");
            return;
        };
        let (mut castle, textures) = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("The castle cannot be shown: {}", e);
                return;
            }
        };

        castle.toggle_textures(self.use_textures);
        let gpu = CastleGpu::new(
            &state.ctx.device,
            &state.ctx.queue,
            &state.ctx.pipelines.material_layout,
            &castle,
            &textures,
        );
        self.scene = Some(Scene { castle, gpu });
        state.ctx.start_intro();
        self.last_time = Instant::now();
    }

    fn set_textures(&mut self, enabled: bool) {
        self.use_textures = enabled;
        if let Some(scene) = self.scene.as_mut() {
            scene.castle.toggle_textures(enabled);
        }
    }
}

impl Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("state", &self.state)
            .field("loaded", &self.scene.is_some())
            .field("use_textures", &self.use_textures)
            .finish()
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("Castle");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let ctx = match self.async_runtime.block_on(Context::new(window)) {
                Ok(ctx) => ctx,
                Err(e) => {
                    log::error!("App initialization failed. Cannot create the main context: {:#}", e);
                    event_loop.exit();
                    return;
                }
            };
            self.on_initialized(ctx);

            let manager = LoadingManager::new(progress_sink());
            let result = self
                .async_runtime
                .block_on(load_scene(&self.assets, &manager));
            self.on_loaded(result);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let assets = self.assets.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let ctx = match Context::new(window).await {
                    Ok(ctx) => ctx,
                    Err(e) => {
                        log::error!("App initialization failed. Cannot create the main context: {:#}", e);
                        return;
                    }
                };
                if proxy
                    .send_event(FlowEvent::Initialized(Box::new(ctx)))
                    .is_err()
                {
                    return;
                }
                let manager = LoadingManager::new(progress_sink());
                let result = load_scene(&assets, &manager).await;
                let _ = proxy.send_event(FlowEvent::Loaded(result));
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized(ctx) => self.on_initialized(*ctx),
            FlowEvent::Loaded(result) => self.on_loaded(result),
            FlowEvent::SetTextures(enabled) => self.set_textures(enabled),
            FlowEvent::Exit => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let camera = &mut state.ctx.camera;
        camera.controller.handle_window_events(&camera.camera, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match logical_key {
                Key::Character(c) if c.eq_ignore_ascii_case("t") => {
                    let enabled = !self.use_textures;
                    self.set_textures(enabled);
                }
                Key::Named(NamedKey::Escape) => event_loop.exit(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                state.ctx.update_camera(dt);

                match state.render(self.scene.as_ref()) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    #[cfg(target_arch = "wasm32")]
    crate::web::register_proxy(event_loop.create_proxy());

    let mut app = App::new(&event_loop)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
