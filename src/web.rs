//! Browser glue: the loading screen and the page-facing texture switch.
//!
//! The page is expected to contain a `.loading-screen` element with a `.perc`
//! label and a `.progress-bar span`. Missing elements are skipped.

use std::cell::RefCell;

use wasm_bindgen::{prelude::*, JsCast};
use winit::event_loop::EventLoopProxy;

use crate::{
    error::CastleError,
    flow::FlowEvent,
    resources::loader::{percent, LogProgress, ProgressSink},
};

thread_local! {
    static PROXY: RefCell<Option<EventLoopProxy<FlowEvent>>> = const { RefCell::new(None) };
}

pub(crate) fn register_proxy(proxy: EventLoopProxy<FlowEvent>) {
    PROXY.with(|p| *p.borrow_mut() = Some(proxy));
}

/// Switches the castle between flat and textured materials.
///
/// Calls before the castle is ready are remembered and applied once it is.
#[wasm_bindgen(js_name = "setUseTextures")]
pub fn set_use_textures(enabled: bool) {
    PROXY.with(|p| match p.borrow().as_ref() {
        Some(proxy) => {
            if proxy.send_event(FlowEvent::SetTextures(enabled)).is_err() {
                log::warn!("setUseTextures({enabled}) after the event loop closed");
            }
        }
        None => log::warn!("setUseTextures({enabled}) before the app started"),
    });
}

// The wipe starts a second after loading finished and runs for 1.6 s; the
// screen leaves the layout a little after that.
const WIPE_DELAY_S: f32 = 1.0;
const WIPE_DURATION_S: f32 = 1.6;
const HIDE_AFTER_MS: i32 = 2800;

fn wipe_transition() -> String {
    // expo.out
    format!("clip-path {WIPE_DURATION_S}s cubic-bezier(0.16, 1, 0.3, 1) {WIPE_DELAY_S}s")
}

/// Wipes the loading screen upwards, then takes it out of the layout.
fn hide_loading_screen(screen: web_sys::HtmlElement) {
    let style = screen.style();
    let _ = style.set_property("clip-path", "inset(0% 0% 0% 0%)");
    // flush the start value so the change below transitions
    let _ = screen.offset_height();
    let _ = style.set_property("transition", &wipe_transition());
    let _ = style.set_property("clip-path", "inset(0% 0% 100% 0%)");

    let Some(window) = web_sys::window() else {
        let _ = style.set_property("display", "none");
        return;
    };
    let remove = Closure::once_into_js(move || {
        let _ = screen.style().set_property("display", "none");
    });
    if window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            remove.unchecked_ref(),
            HIDE_AFTER_MS,
        )
        .is_err()
    {
        let _ = style.set_property("display", "none");
    }
}

fn query(selector: &str) -> Option<web_sys::HtmlElement> {
    let document = web_sys::window()?.document()?;
    document
        .query_selector(selector)
        .ok()
        .flatten()?
        .dyn_into::<web_sys::HtmlElement>()
        .ok()
}

/// Drives the page's loading screen and logs like [`LogProgress`].
#[derive(Default)]
pub struct DomProgress {
    log: LogProgress,
}

impl DomProgress {
    fn show_percent(&self, current: u32) {
        if let Some(perc) = query(".perc") {
            perc.set_text_content(Some(&format!("{current}%")));
        }
        if let Some(bar) = query(".progress-bar span") {
            let _ = bar.style().set_property("width", &format!("{current}%"));
        }
    }
}

impl ProgressSink for DomProgress {
    fn on_start(&self, url: &str, loaded: usize, total: usize) {
        self.log.on_start(url, loaded, total);
    }

    fn on_progress(&self, url: &str, loaded: usize, total: usize) {
        self.log.on_progress(url, loaded, total);
        self.show_percent(percent(loaded, total));
    }

    fn on_load(&self) {
        self.log.on_load();
        if let Some(screen) = query(".loading-screen") {
            hide_loading_screen(screen);
        }
    }

    fn on_error(&self, url: &str) {
        self.log.on_error(url);
    }

    fn on_failed(&self, error: &CastleError) {
        self.log.on_failed(error);
        if let Some(screen) = query(".loading-screen") {
            let _ = screen.class_list().add_1("error");
        }
        if let Some(perc) = query(".perc") {
            perc.set_text_content(Some("Failed to load the castle"));
        }
    }
}
