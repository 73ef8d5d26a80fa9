//! Ready-made page layouts.
//!
//! Each fixture returns the document plus the ids of the media elements it
//! created, so tests can assert on rates without searching.

use crate::fake_dom::{FakeDocument, NodeId};

/// A typical streaming page: a player wrapper several levels deep holding a
/// `<video>`, plus an `<audio>` ad element next to it.
pub struct StreamingPage {
    pub doc: FakeDocument,
    pub video: NodeId,
    pub audio: NodeId,
}

impl StreamingPage {
    pub fn new() -> Self {
        let doc = FakeDocument::new();
        let player = doc.append_nested(doc.body(), 4);
        let video = doc.append(player, "video");
        let audio = doc.append(player, "audio");
        Self { doc, video, audio }
    }
}

impl Default for StreamingPage {
    fn default() -> Self {
        Self::new()
    }
}

/// A web-component player: `<video>` inside a shadow root that is itself
/// inside another component's shadow root.
pub struct ShadowPlayerPage {
    pub doc: FakeDocument,
    pub video: NodeId,
}

impl ShadowPlayerPage {
    pub fn new() -> Self {
        let doc = FakeDocument::new();
        let outer_host = doc.append(doc.body(), "app-shell");
        let outer_shadow = doc.attach_shadow(outer_host);
        let inner_host = doc.append(outer_shadow, "video-player");
        let inner_shadow = doc.attach_shadow(inner_host);
        let wrapper = doc.append(inner_shadow, "div");
        let video = doc.append(wrapper, "video");
        Self { doc, video }
    }
}

impl Default for ShadowPlayerPage {
    fn default() -> Self {
        Self::new()
    }
}
