//! AnySpeed core library.
//!
//! Runtime-neutral logic shared by every AnySpeed driver:
//!
//! - Discovery of `<video>`/`<audio>` elements across the light DOM and
//!   every attached shadow root
//! - Write-on-change playback rate enforcement
//! - The `setSpeed`/`getSpeed` message protocol spoken by the settings surface
//! - The [`SpeedEnforcer`](enforcer::SpeedEnforcer), which owns the target
//!   speed and is the single entry point every trigger converges on
//!
//! # Architecture
//!
//! ```text
//! interval tick ─┐
//! mutation ──────┼──> SpeedEnforcer::run_pass ──> discover ──> enforce
//! play event ────┘          ▲
//!                           │ target speed
//! setSpeed / getSpeed ──────┤
//! stored setting ───────────┘
//! ```
//!
//! Nothing here depends on an async runtime. The native tokio driver lives in
//! `speed-engine`; the wasm content script lives in `speed-web`.
//!
//! # Modules
//!
//! - [`speed`] - Target speed type and the allowed speed domain
//! - [`dom`] - Scope and media element abstractions over a document tree
//! - [`discovery`] - Media element enumeration
//! - [`enforcement`] - Rate writes
//! - [`protocol`] - Settings surface request/response messages
//! - [`enforcer`] - Owned engine state and trigger entry points
//! - [`host`] - Host subscription abstraction used by async drivers
//! - [`store`] - Persisted setting abstraction used by async drivers
//! - [`errors`] - Error types
//! - [`observability`] - Metrics

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod discovery;
pub mod dom;
pub mod enforcement;
pub mod enforcer;
pub mod errors;
pub mod host;
pub mod observability;
pub mod protocol;
pub mod speed;
pub mod store;

pub use dom::{MediaElement, MediaKind, MediaScope};
pub use enforcement::EnforcementReport;
pub use enforcer::{EnforcerConfig, SpeedEnforcer, Trigger};
pub use errors::{DomError, ProtocolError, SpeedError, StoreError};
pub use protocol::{Request, Response};
pub use speed::PlaybackSpeed;
