//! `ContentScript` - the speed enforcer wired to a live page.
//!
//! # Lifecycle
//!
//! 1. `new` binds to the window and document
//! 2. `start` requests the stored speed and acquires the interval, the
//!    mutation observer, the capturing `play` listener, and the message
//!    listener. The first pass runs when storage answers; see
//!    [`PageDriver`](crate::driver::PageDriver)
//! 3. `stop` (or a `pagehide` that unloads the page) releases all of them.
//!    A page entering the back/forward cache keeps everything
//!
//! Browser callbacks run one at a time on the page's event loop. They hold a
//! `Weak` reference to the script, so releasing the script also ends them.

use std::cell::RefCell;
use std::rc::Rc;

use speed_core::enforcer::{EnforcerConfig, Trigger};
use speed_core::errors::StoreError;
use speed_core::speed::STORAGE_KEY;
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, EventTarget, MutationObserver,
    MutationObserverInit, PageTransitionEvent, Window,
};

use crate::chrome::{self, MessageListener};
use crate::dom::{describe, WebMedia, WebScope};
use crate::driver::{PageDriver, PageHide};

/// Poll interval, fast enough to beat the rate resets of common players.
pub const POLL_INTERVAL_MS: i32 = 100;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("No window in this context")]
    NoWindow,

    #[error("Window has no document")]
    NoDocument,

    #[error("{what} failed: {message}")]
    Js { what: &'static str, message: String },
}

impl ScriptError {
    fn js(what: &'static str, value: &JsValue) -> Self {
        ScriptError::Js {
            what,
            message: describe(value),
        }
    }
}

impl From<ScriptError> for JsValue {
    fn from(e: ScriptError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Content script bound to one page.
pub struct ContentScript {
    inner: Rc<Inner>,
}

struct Inner {
    window: Window,
    document: Document,
    driver: RefCell<PageDriver>,
    running: RefCell<Option<Running>>,
}

/// Everything acquired by `start`. Dropping it releases every trigger.
struct Running {
    _interval: Option<Interval>,
    _mutation_watch: Option<MutationWatch>,
    _play_listener: Option<DocumentListener>,
    _pagehide_listener: Option<DocumentListener>,
    _messages: Option<MessageListener>,
}

impl ContentScript {
    /// Bind to the current window.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError`] outside a page context.
    pub fn new() -> Result<Self, ScriptError> {
        let window = web_sys::window().ok_or(ScriptError::NoWindow)?;
        let document = window.document().ok_or(ScriptError::NoDocument)?;

        Ok(Self {
            inner: Rc::new(Inner {
                window,
                document,
                driver: RefCell::new(PageDriver::new(EnforcerConfig::default())),
                running: RefCell::new(None),
            }),
        })
    }

    /// Start enforcing. Calling `start` on a running script does nothing.
    pub fn start(&self) {
        if self.is_running() {
            return;
        }

        let running = Running {
            _interval: warn_on_err("interval", Interval::start(&self.inner)),
            _mutation_watch: warn_on_err("mutation watch", MutationWatch::start(&self.inner)),
            _play_listener: warn_on_err("play interception", DocumentListener::play(&self.inner)),
            _pagehide_listener: warn_on_err("pagehide", DocumentListener::pagehide(&self.inner)),
            _messages: warn_on_err(
                "message listener",
                message_listener(&self.inner).map_err(|e| ScriptError::js("onMessage", &e)),
            ),
        };

        *self.inner.running.borrow_mut() = Some(running);
        info!(target: "speed.web", "Content script started");

        // May answer synchronously, so the listeners are in place first
        let weak = Rc::downgrade(&self.inner);
        chrome::load_speed(STORAGE_KEY, move |result| {
            if let Some(inner) = weak.upgrade() {
                inner.on_settings(result);
            }
        });
    }

    /// Release every trigger. Calling `stop` on a stopped script does
    /// nothing.
    pub fn stop(&self) {
        self.inner.stop();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner
            .running
            .try_borrow()
            .map_or(true, |running| running.is_some())
    }

    /// Current target speed.
    #[must_use]
    pub fn target_rate(&self) -> Option<f64> {
        self.inner
            .driver
            .try_borrow()
            .ok()
            .map(|driver| driver.target().rate())
    }
}

impl Drop for ContentScript {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl Inner {
    fn root(&self) -> WebScope {
        WebScope::Document(self.document.clone())
    }

    fn on_settings(&self, result: Result<Option<f64>, StoreError>) {
        match self.driver.try_borrow_mut() {
            Ok(mut driver) => {
                driver.on_settings(result, self.root());
            }
            Err(_) => warn!(target: "speed.web", "Driver busy, stored speed dropped"),
        }
    }

    fn run_pass(&self, trigger: Trigger) {
        match self.driver.try_borrow_mut() {
            Ok(mut driver) => {
                driver.on_trigger(self.root(), trigger);
            }
            Err(_) => trace!(
                target: "speed.web",
                trigger = trigger.as_str(),
                "Driver busy, skipping pass"
            ),
        }
    }

    fn on_play(&self, event: &Event) {
        let Some(element) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
            return;
        };
        if let Ok(mut driver) = self.driver.try_borrow_mut() {
            driver.on_play(&WebMedia(element));
        }
    }

    fn on_message(&self, json: &str) -> Option<String> {
        let mut driver = self.driver.try_borrow_mut().ok()?;
        Some(driver.on_message(json, self.root()).to_json())
    }

    fn on_pagehide(&self, event: &Event) {
        let persisted = event
            .dyn_ref::<PageTransitionEvent>()
            .is_some_and(PageTransitionEvent::persisted);
        if PageHide::from_persisted(persisted).stops_script() {
            self.stop();
        } else {
            debug!(target: "speed.web", "Page entering back/forward cache, still running");
        }
    }

    fn stop(&self) {
        let running = match self.running.try_borrow_mut() {
            Ok(mut running) => running.take(),
            Err(_) => return,
        };
        if let Some(running) = running {
            drop(running);
            if let Ok(driver) = self.driver.try_borrow() {
                let stats = driver.stats();
                info!(
                    target: "speed.web",
                    passes = stats.passes,
                    writes = stats.writes,
                    "Content script stopped"
                );
            }
        }
    }
}

fn warn_on_err<T>(what: &str, result: Result<T, ScriptError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(target: "speed.web", error = %e, "{what} unavailable");
            None
        }
    }
}

fn message_listener(inner: &Rc<Inner>) -> Result<MessageListener, JsValue> {
    let weak = Rc::downgrade(inner);
    MessageListener::register(move |json| weak.upgrade()?.on_message(json))
}

/// `setInterval` handle.
struct Interval {
    window: Window,
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

impl Interval {
    fn start(inner: &Rc<Inner>) -> Result<Self, ScriptError> {
        let weak = Rc::downgrade(inner);
        let callback = Closure::<dyn FnMut()>::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.run_pass(Trigger::Poll);
            }
        });

        let handle = inner
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                POLL_INTERVAL_MS,
            )
            .map_err(|e| ScriptError::js("setInterval", &e))?;

        Ok(Self {
            window: inner.window.clone(),
            handle,
            _callback: callback,
        })
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.window.clear_interval_with_handle(self.handle);
        debug!(target: "speed.web", "Interval cleared");
    }
}

/// `MutationObserver` on the document subtree.
struct MutationWatch {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(JsValue, JsValue)>,
}

impl MutationWatch {
    fn start(inner: &Rc<Inner>) -> Result<Self, ScriptError> {
        let weak = Rc::downgrade(inner);
        // One callback per batch of records; one pass covers the batch
        let callback = Closure::<dyn FnMut(JsValue, JsValue)>::new(
            move |_records: JsValue, _observer: JsValue| {
                if let Some(inner) = weak.upgrade() {
                    inner.run_pass(Trigger::Mutation);
                }
            },
        );

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|e| ScriptError::js("MutationObserver", &e))?;

        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        observer
            .observe_with_options(&inner.document, &options)
            .map_err(|e| ScriptError::js("MutationObserver.observe", &e))?;

        Ok(Self {
            observer,
            _callback: callback,
        })
    }
}

impl Drop for MutationWatch {
    fn drop(&mut self) {
        self.observer.disconnect();
        debug!(target: "speed.web", "Mutation observer disconnected");
    }
}

/// An event listener on the document or window, removed on drop.
struct DocumentListener {
    target: EventTarget,
    event: &'static str,
    capture: bool,
    callback: Closure<dyn FnMut(Event)>,
}

impl DocumentListener {
    /// Capturing `play` listener on the document. `play` does not bubble,
    /// so only the capture phase sees events from every element.
    fn play(inner: &Rc<Inner>) -> Result<Self, ScriptError> {
        let weak = Rc::downgrade(inner);
        Self::add(
            inner.document.clone().into(),
            "play",
            true,
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_play(&event);
                }
            }),
        )
    }

    /// Stop when the page is unloaded, but not when it only enters the
    /// back/forward cache.
    fn pagehide(inner: &Rc<Inner>) -> Result<Self, ScriptError> {
        let weak = Rc::downgrade(inner);
        Self::add(
            inner.window.clone().into(),
            "pagehide",
            false,
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_pagehide(&event);
                }
            }),
        )
    }

    fn add(
        target: EventTarget,
        event: &'static str,
        capture: bool,
        callback: Closure<dyn FnMut(Event)>,
    ) -> Result<Self, ScriptError> {
        let options = AddEventListenerOptions::new();
        options.set_capture(capture);
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                event,
                callback.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|e| ScriptError::js("addEventListener", &e))?;

        Ok(Self {
            target,
            event,
            capture,
            callback,
        })
    }
}

impl Drop for DocumentListener {
    fn drop(&mut self) {
        if let Err(e) = self.target.remove_event_listener_with_callback_and_bool(
            self.event,
            self.callback.as_ref().unchecked_ref(),
            self.capture,
        ) {
            debug!(
                target: "speed.web",
                event = self.event,
                error = %describe(&e),
                "Failed to remove listener"
            );
        }
    }
}
