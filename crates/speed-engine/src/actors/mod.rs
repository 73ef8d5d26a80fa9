//! Actor implementation for the speed engine.
//!
//! ```text
//! SpeedEngineHandle ──commands──> SpeedEngineActor
//!                                   ├── owns SpeedEnforcer (target speed)
//!                                   ├── poll interval
//!                                   ├── mutation Subscription ──events──┐
//!                                   └── play Subscription ──────events──┤
//!                                                  (host callbacks) <───┘
//! ```
//!
//! One task owns all engine state, so the target speed needs no lock. Host
//! callbacks only enqueue events; they never run enforcement themselves.

pub mod engine;
pub mod messages;

pub use engine::{SpeedEngineActor, SpeedEngineHandle};
pub use messages::{EngineMessage, EngineStatus};
