//! AnySpeed engine.
//!
//! Native async driver for the speed enforcer. A single tokio actor owns the
//! [`SpeedEnforcer`](speed_core::SpeedEnforcer) and multiplexes every
//! trigger onto it:
//!
//! - Poll ticks on a fixed interval
//! - Structural mutations reported by the host document
//! - `play` events intercepted at the document
//! - `setSpeed`/`getSpeed` commands from the settings surface
//!
//! # Architecture
//!
//! ```text
//! SpeedEngineHandle ──mpsc──┐
//!                           ▼
//! DocumentHost ──events──> SpeedEngineActor ──> SpeedEnforcer
//!                           ▲
//! interval ─────────────────┘
//! ```
//!
//! The host document and the settings store are traits from `speed-core`
//! (`DocumentHost`, `SettingsStore`), so the engine runs the same against a
//! browser bridge or the in-memory fakes in `speed-test-utils`.
//!
//! # Modules
//!
//! - [`actors`] - The engine actor and its handle
//! - [`config`] - Engine configuration from environment
//! - [`observability`] - Tracing setup

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actors;
pub mod config;
pub mod observability;

pub use actors::{EngineMessage, EngineStatus, SpeedEngineActor, SpeedEngineHandle};
pub use config::{Config, ConfigError};
