//! Message types for the speed engine actor.

use serde::Serialize;
use speed_core::enforcer::EnforcerStats;
use speed_core::protocol::{Request, Response};
use tokio::sync::oneshot;

/// Messages sent to the `SpeedEngineActor`.
#[derive(Debug)]
pub enum EngineMessage {
    /// A decoded settings surface request.
    Request {
        request: Request,
        respond_to: oneshot::Sender<Response>,
    },

    /// A raw JSON settings surface message, decoded by the actor.
    RawMessage {
        json: String,
        respond_to: oneshot::Sender<Response>,
    },

    /// Snapshot of the engine state.
    GetStatus {
        respond_to: oneshot::Sender<EngineStatus>,
    },
}

/// Engine state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    /// Current target playback rate.
    pub target_rate: f64,
    /// Whether the mutation watch subscription is held.
    pub mutation_watch_active: bool,
    /// Whether the play interception subscription is held.
    pub play_intercept_active: bool,
    /// Host events dropped because the event channel was full.
    pub events_dropped: u64,
    /// Whether the persisted-speed read has resolved (or failed).
    pub settings_loaded: bool,
    /// Cumulative enforcer counters.
    pub stats: EnforcerStats,
}
