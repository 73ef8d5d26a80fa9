//! # AnySpeed Test Utilities
//!
//! In-memory stand-ins for everything the engine touches, so Discovery,
//! Enforcement, and the trigger wiring can be tested without a browser.
//!
//! ## Modules
//!
//! - `fake_dom` - `FakeDocument`: light DOM, shadow roots, media elements,
//!   mutation and play dispatch
//! - `mock_store` - `MockSettingsStore`: canned, failing, or slow reads
//! - `fixtures` - Ready-made page layouts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use speed_test_utils::*;
//!
//! let doc = FakeDocument::new();
//! let player = doc.append(doc.body(), "div");
//! let shadow = doc.attach_shadow(player);
//! let video = doc.append(shadow, "video");
//!
//! let mut enforcer = SpeedEnforcer::default();
//! enforcer.handle_request(Request::SetSpeed { speed: 2.0 }, doc.document());
//! assert_eq!(doc.playback_rate(video), 2.0);
//! ```

pub mod fake_dom;
pub mod fixtures;
pub mod mock_store;

pub use fake_dom::*;
pub use fixtures::*;
pub use mock_store::*;
