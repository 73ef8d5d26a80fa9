//! AnySpeed content script.
//!
//! Compiled to wasm and injected into every page. Binds the core enforcer to
//! the live DOM:
//!
//! - `setInterval` poll every 100ms
//! - A `MutationObserver` on the document subtree
//! - A capturing `play` listener on the document
//! - `chrome.runtime.onMessage` for `setSpeed`/`getSpeed`
//! - A one-time `chrome.storage.sync` read of `playbackSpeed`
//!
//! Only [`settings`], [`driver`] and [`console`] build off the browser;
//! everything that touches `web-sys` is wasm-only.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod console;
pub mod driver;
pub mod settings;

#[cfg(target_arch = "wasm32")]
pub mod chrome;
#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
pub mod script;

#[cfg(target_arch = "wasm32")]
pub use entry::{start, stop, target_speed};

#[cfg(target_arch = "wasm32")]
mod entry {
    use std::cell::RefCell;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    use wasm_bindgen::prelude::*;

    use crate::console::ConsoleMakeWriter;
    use crate::script::ContentScript;

    thread_local! {
        static SCRIPT: RefCell<Option<ContentScript>> = const { RefCell::new(None) };
    }

    fn init_tracing() {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(ConsoleMakeWriter)
            .with_ansi(false)
            .without_time()
            .with_level(true);
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::filter::LevelFilter::INFO)
            .with(layer)
            .try_init();
    }

    /// Entry point run when the module is instantiated.
    ///
    /// # Errors
    ///
    /// Returns an error outside a page context.
    #[wasm_bindgen(start)]
    pub fn start() -> Result<(), JsValue> {
        init_tracing();

        let script = ContentScript::new()?;
        script.start();
        SCRIPT.with(|slot| {
            if let Ok(mut slot) = slot.try_borrow_mut() {
                *slot = Some(script);
            }
        });
        Ok(())
    }

    /// Stop enforcing and release every trigger.
    #[wasm_bindgen]
    pub fn stop() {
        let script = SCRIPT.with(|slot| slot.try_borrow_mut().ok().and_then(|mut s| s.take()));
        if let Some(script) = script {
            script.stop();
        }
    }

    /// Current target speed, if the script is running.
    #[wasm_bindgen(js_name = targetSpeed)]
    pub fn target_speed() -> Option<f64> {
        SCRIPT.with(|slot| {
            slot.try_borrow()
                .ok()
                .and_then(|s| s.as_ref().and_then(ContentScript::target_rate))
        })
    }
}
