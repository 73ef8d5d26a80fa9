//! `web-sys` bindings for the document abstractions.

use js_sys::Reflect;
use speed_core::dom::{MediaElement, MediaScope};
use speed_core::errors::DomError;
use speed_core::speed::DEFAULT_SPEED;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlMediaElement, NodeList, ShadowRoot};

const MEDIA_SELECTOR: &str = "video, audio";

/// A document or an open shadow root.
#[derive(Debug, Clone)]
pub enum WebScope {
    Document(Document),
    Shadow(ShadowRoot),
}

impl WebScope {
    fn query_all(&self, selector: &str) -> Vec<Element> {
        let result = match self {
            WebScope::Document(document) => document.query_selector_all(selector),
            WebScope::Shadow(root) => root.query_selector_all(selector),
        };

        match result {
            Ok(list) => elements(&list),
            Err(e) => {
                tracing::debug!(
                    target: "speed.web",
                    error = ?e,
                    selector,
                    "querySelectorAll failed"
                );
                Vec::new()
            }
        }
    }
}

fn elements(list: &NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

impl MediaScope for WebScope {
    type Media = WebMedia;

    fn media_elements(&self) -> Vec<WebMedia> {
        self.query_all(MEDIA_SELECTOR)
            .into_iter()
            .map(WebMedia)
            .collect()
    }

    fn shadow_roots(&self) -> Vec<WebScope> {
        self.query_all("*")
            .iter()
            .filter_map(Element::shadow_root)
            .map(WebScope::Shadow)
            .collect()
    }
}

/// Any element reached through discovery or a `play` event target.
#[derive(Debug, Clone)]
pub struct WebMedia(pub Element);

impl MediaElement for WebMedia {
    fn tag_name(&self) -> String {
        self.0.tag_name()
    }

    fn playback_rate(&self) -> f64 {
        self.0
            .dyn_ref::<HtmlMediaElement>()
            .map_or(DEFAULT_SPEED, HtmlMediaElement::playback_rate)
    }

    fn set_playback_rate(&self, rate: f64) -> Result<(), DomError> {
        if !self.0.is_connected() {
            return Err(DomError::Detached);
        }

        // Reflect so a throwing setter comes back as an error
        Reflect::set(
            &self.0,
            &JsValue::from_str("playbackRate"),
            &JsValue::from_f64(rate),
        )
        .map_err(|e| DomError::Rejected(describe(&e)))
        .and_then(|accepted| {
            if accepted {
                Ok(())
            } else {
                Err(DomError::Rejected("playbackRate is read-only".to_string()))
            }
        })
    }
}

/// Best-effort text for a thrown JS value.
pub fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}
