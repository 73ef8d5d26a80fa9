//! Extension API bindings: `chrome.storage.sync` and `chrome.runtime`.
//!
//! Every binding catches, so a page without the extension APIs (or with
//! an invalidated extension context) yields an error instead of a trap.

use js_sys::{Function, Reflect, JSON};
use speed_core::errors::StoreError;
use wasm_bindgen::prelude::*;

use crate::dom::describe;
use crate::settings::stored_speed;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = get)]
    fn storage_sync_get(keys: &JsValue, callback: &Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn on_message_add_listener(listener: &Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime", "onMessage"], js_name = removeListener)]
    fn on_message_remove_listener(listener: &Function) -> Result<(), JsValue>;
}

/// `chrome.runtime.lastError`, if set.
fn last_error() -> Option<String> {
    let chrome = Reflect::get(&js_sys::global(), &JsValue::from_str("chrome")).ok()?;
    let runtime = Reflect::get(&chrome, &JsValue::from_str("runtime")).ok()?;
    let error = Reflect::get(&runtime, &JsValue::from_str("lastError")).ok()?;
    if error.is_undefined() || error.is_null() {
        return None;
    }
    let message = Reflect::get(&error, &JsValue::from_str("message")).ok();
    Some(
        message
            .and_then(|m| m.as_string())
            .unwrap_or_else(|| describe(&error)),
    )
}

/// Read `key` from `chrome.storage.sync` and hand the result to `done`.
///
/// `done` runs exactly once: from the storage callback, or immediately if
/// the read could not be issued.
pub fn load_speed<F>(key: &str, done: F)
where
    F: FnOnce(Result<Option<f64>, StoreError>) + 'static,
{
    let owned_key = key.to_string();
    let done = std::rc::Rc::new(std::cell::Cell::new(Some(done)));

    let callback_done = std::rc::Rc::clone(&done);
    let callback = Closure::once_into_js(move |items: JsValue| {
        let result = match last_error() {
            Some(message) => Err(StoreError::Unavailable(message)),
            None => decode_items(&items, &owned_key),
        };
        if let Some(done) = callback_done.take() {
            done(result);
        }
    });

    let keys = js_sys::Array::of1(&JsValue::from_str(key));
    if let Err(e) = storage_sync_get(&keys, callback.unchecked_ref()) {
        if let Some(done) = done.take() {
            done(Err(StoreError::Unavailable(describe(&e))));
        }
    }
}

fn decode_items(items: &JsValue, key: &str) -> Result<Option<f64>, StoreError> {
    let json = JSON::stringify(items)
        .map_err(|e| StoreError::Malformed(describe(&e)))?
        .as_string()
        .ok_or_else(|| StoreError::Malformed("settings object not serializable".to_string()))?;
    stored_speed(&json, key)
}

/// Message listener registered with `chrome.runtime.onMessage`.
///
/// `handle` receives the message as JSON and returns the JSON reply, which
/// is passed to `sendResponse` synchronously.
pub struct MessageListener {
    closure: Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>,
}

impl MessageListener {
    /// Register `handle` as a message listener.
    ///
    /// # Errors
    ///
    /// Returns the thrown value if `chrome.runtime.onMessage` is unavailable.
    pub fn register<F>(mut handle: F) -> Result<Self, JsValue>
    where
        F: FnMut(&str) -> Option<String> + 'static,
    {
        let closure = Closure::<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>::new(
            move |message: JsValue, _sender: JsValue, send_response: JsValue| {
                let Some(json) = JSON::stringify(&message).ok().and_then(|s| s.as_string())
                else {
                    return JsValue::FALSE;
                };
                let Some(reply) = handle(&json) else {
                    return JsValue::FALSE;
                };
                let reply = JSON::parse(&reply).unwrap_or(JsValue::NULL);
                if let Some(send_response) = send_response.dyn_ref::<Function>() {
                    if let Err(e) = send_response.call1(&JsValue::NULL, &reply) {
                        tracing::debug!(
                            target: "speed.web",
                            error = %describe(&e),
                            "sendResponse failed"
                        );
                    }
                }
                // Replied synchronously; the channel can close
                JsValue::FALSE
            },
        );

        on_message_add_listener(closure.as_ref().unchecked_ref())?;
        Ok(Self { closure })
    }
}

impl Drop for MessageListener {
    fn drop(&mut self) {
        if let Err(e) = on_message_remove_listener(self.closure.as_ref().unchecked_ref()) {
            tracing::debug!(
                target: "speed.web",
                error = %describe(&e),
                "Failed to remove message listener"
            );
        }
    }
}
