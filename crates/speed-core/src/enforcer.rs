//! `SpeedEnforcer` - owned engine state and the trigger entry points.
//!
//! Every trigger (poll tick, structural mutation, play event, settings
//! command) ends up in one of the methods here. The enforcer owns the target
//! speed; drivers own the enforcer, so two engines never share a target.
//!
//! Nothing here blocks or awaits. Drivers call in from their own scheduling
//! context (a tokio actor, or browser callbacks) one event at a time.

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::discovery::discover;
use crate::dom::{MediaElement, MediaScope};
use crate::enforcement::{enforce, enforce_one, EnforcementReport};
use crate::errors::StoreError;
use crate::observability::metrics;
use crate::protocol::{Request, Response};
use crate::speed::PlaybackSpeed;

/// What caused a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// First pass after the engine starts.
    Startup,
    /// Interval tick.
    Poll,
    /// Structural change in the document.
    Mutation,
    /// A media element started playing.
    Play,
    /// Settings surface changed the target.
    Command,
    /// Persisted setting finished loading.
    Settings,
}

impl Trigger {
    /// Metric label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Startup => "startup",
            Trigger::Poll => "poll",
            Trigger::Mutation => "mutation",
            Trigger::Play => "play",
            Trigger::Command => "command",
            Trigger::Settings => "settings",
        }
    }
}

/// Enforcer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnforcerConfig {
    /// Shadow boundaries discovery may cross. `None` is unbounded.
    pub max_shadow_depth: Option<usize>,
}

/// Cumulative counters for one enforcer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnforcerStats {
    pub passes: u64,
    pub play_interceptions: u64,
    pub writes: u64,
    pub write_failures: u64,
    pub store_failures: u64,
    pub commands: u64,
    pub rejected_commands: u64,
}

/// Owns the target speed and runs enforcement.
#[derive(Debug, Clone, Default)]
pub struct SpeedEnforcer {
    target: PlaybackSpeed,
    config: EnforcerConfig,
    stats: EnforcerStats,
    /// A command has set the target; a late settings load must not undo it.
    commanded: bool,
}

impl SpeedEnforcer {
    #[must_use]
    pub fn new(config: EnforcerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current target speed.
    #[must_use]
    pub fn target(&self) -> PlaybackSpeed {
        self.target
    }

    #[must_use]
    pub fn config(&self) -> EnforcerConfig {
        self.config
    }

    #[must_use]
    pub fn stats(&self) -> EnforcerStats {
        self.stats
    }

    /// Discover every media element under `root` and bring it to the target.
    pub fn run_pass<S: MediaScope>(&mut self, root: S, trigger: Trigger) -> EnforcementReport {
        let elements = discover(root, self.config.max_shadow_depth);
        let report = enforce(self.target, &elements);

        metrics::set_media_elements_discovered(report.examined);
        self.record(trigger, report);
        self.stats.passes += 1;

        if report.is_noop() {
            trace!(
                target: "speed.enforcer",
                trigger = trigger.as_str(),
                examined = report.examined,
                "Pass complete, nothing to change"
            );
        } else {
            debug!(
                target: "speed.enforcer",
                trigger = trigger.as_str(),
                examined = report.examined,
                written = report.written,
                failed = report.failed,
                target_rate = self.target.rate(),
                "Pass complete"
            );
        }

        report
    }

    /// Bring one element to the target without a full discovery.
    ///
    /// Used for play interception. Targets that are not video or audio are
    /// ignored.
    pub fn enforce_element<M: MediaElement>(
        &mut self,
        element: &M,
        trigger: Trigger,
    ) -> EnforcementReport {
        if element.kind().is_none() {
            trace!(
                target: "speed.enforcer",
                tag = %element.tag_name(),
                "Ignoring non-media event target"
            );
            return EnforcementReport::default();
        }

        let report = enforce_one(self.target, element);
        self.record(trigger, report);
        self.stats.play_interceptions += 1;
        report
    }

    /// Handle a settings surface request. A successful `setSpeed` runs a pass
    /// over `root` before replying.
    pub fn handle_request<S: MediaScope>(&mut self, request: Request, root: S) -> Response {
        metrics::record_command(request.action());
        self.stats.commands += 1;

        match request {
            Request::GetSpeed => Response::speed(self.target.rate()),
            Request::SetSpeed { speed } => match PlaybackSpeed::new(speed) {
                Ok(speed) => {
                    self.commanded = true;
                    if self.set_target(speed) {
                        info!(
                            target: "speed.enforcer",
                            target_rate = speed.rate(),
                            "Target speed set by settings surface"
                        );
                    }
                    self.run_pass(root, Trigger::Command);
                    Response::ack()
                }
                Err(e) => {
                    warn!(target: "speed.enforcer", error = %e, "Rejected setSpeed");
                    self.stats.rejected_commands += 1;
                    Response::rejected(&e)
                }
            },
        }
    }

    /// Decode and handle a raw JSON message.
    pub fn handle_message<S: MediaScope>(&mut self, json: &str, root: S) -> Response {
        match Request::from_json(json) {
            Ok(request) => self.handle_request(request, root),
            Err(e) => {
                warn!(target: "speed.enforcer", error = %e, "Ignoring malformed message");
                metrics::record_command("invalid");
                self.stats.rejected_commands += 1;
                Response::rejected(&e)
            }
        }
    }

    /// Apply the result of reading the persisted setting.
    ///
    /// Failures keep the last known target. Returns whether the target
    /// changed.
    pub fn apply_stored_setting(&mut self, result: Result<Option<f64>, StoreError>) -> bool {
        match result {
            Ok(_) if self.commanded => {
                debug!(
                    target: "speed.enforcer",
                    "Ignoring stored setting, target already set by command"
                );
                false
            }
            Ok(value) => {
                let speed = PlaybackSpeed::from_stored(value);
                let changed = self.set_target(speed);
                info!(
                    target: "speed.enforcer",
                    stored = ?value,
                    target_rate = speed.rate(),
                    "Loaded stored speed"
                );
                changed
            }
            Err(e) => {
                warn!(
                    target: "speed.enforcer",
                    error = %e,
                    target_rate = self.target.rate(),
                    "Failed to read stored speed, keeping current target"
                );
                metrics::record_store_read_failure();
                self.stats.store_failures += 1;
                false
            }
        }
    }

    fn set_target(&mut self, speed: PlaybackSpeed) -> bool {
        let changed = self.target != speed;
        self.target = speed;
        changed
    }

    fn record(&mut self, trigger: Trigger, report: EnforcementReport) {
        metrics::record_enforcement_pass(trigger.as_str());
        metrics::record_rate_writes(trigger.as_str(), report.written);
        metrics::record_rate_write_failures(report.failed);
        self.stats.writes += report.written as u64;
        self.stats.write_failures += report.failed as u64;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::discovery::tests::{StubMedia, StubScope};

    fn page(rates: &[f64]) -> (StubScope, Vec<StubMedia>) {
        let media: Vec<StubMedia> = rates.iter().map(|r| StubMedia::new("video", *r)).collect();
        (StubScope::with_media(media.clone()), media)
    }

    #[test]
    fn test_default_target_is_one() {
        let enforcer = SpeedEnforcer::default();
        assert_eq!(enforcer.target().rate(), 1.0);
    }

    #[test]
    fn test_default_leaves_fresh_element_at_one() {
        let mut enforcer = SpeedEnforcer::default();
        let (root, media) = page(&[1.0]);

        let report = enforcer.run_pass(root, Trigger::Mutation);
        assert_eq!(report.written, 0);
        assert_eq!(media[0].rate.get(), 1.0);
    }

    #[test]
    fn test_set_speed_scenario() {
        let mut enforcer = SpeedEnforcer::default();
        let (root, media) = page(&[1.0]);

        let reply = enforcer.handle_message(r#"{"action":"setSpeed","speed":2.5}"#, root.clone());
        assert_eq!(reply, Response::ack());
        assert_eq!(media[0].rate.get(), 2.5);

        let reply = enforcer.handle_message(r#"{"action":"getSpeed"}"#, root);
        assert_eq!(reply, Response::speed(2.5));
        assert_eq!(enforcer.stats().commands, 2);
    }

    #[test]
    fn test_invalid_speed_keeps_target() {
        let mut enforcer = SpeedEnforcer::default();
        let (root, media) = page(&[1.0]);

        let reply = enforcer.handle_request(Request::SetSpeed { speed: -2.0 }, root);
        assert!(matches!(reply, Response::Rejected { success: false, .. }));
        assert_eq!(enforcer.target().rate(), 1.0);
        assert_eq!(media[0].writes.get(), 0);
        assert_eq!(enforcer.stats().rejected_commands, 1);
    }

    #[test]
    fn test_malformed_message_rejected() {
        let mut enforcer = SpeedEnforcer::default();
        let reply = enforcer.handle_message("{}", StubScope::default());
        assert!(matches!(reply, Response::Rejected { .. }));
        assert_eq!(enforcer.stats().rejected_commands, 1);
    }

    #[test]
    fn test_external_reset_restored_on_next_pass() {
        let mut enforcer = SpeedEnforcer::default();
        let (root, media) = page(&[1.0]);
        enforcer.handle_request(Request::SetSpeed { speed: 3.0 }, root.clone());
        assert_eq!(media[0].rate.get(), 3.0);

        // Host page script resets the rate
        media[0].rate.set(1.0);

        let report = enforcer.run_pass(root, Trigger::Poll);
        assert_eq!(report.written, 1);
        assert_eq!(media[0].rate.get(), 3.0);
    }

    #[test]
    fn test_play_interception_filters_tag() {
        let mut enforcer = SpeedEnforcer::default();
        enforcer.handle_request(Request::SetSpeed { speed: 2.0 }, StubScope::default());

        let div = StubMedia::new("div", 1.0);
        assert_eq!(enforcer.enforce_element(&div, Trigger::Play).examined, 0);
        assert_eq!(div.rate.get(), 1.0);

        let audio = StubMedia::new("audio", 1.0);
        assert_eq!(enforcer.enforce_element(&audio, Trigger::Play).written, 1);
        assert_eq!(audio.rate.get(), 2.0);
        assert_eq!(enforcer.stats().play_interceptions, 1);
    }

    #[test]
    fn test_stored_setting_applied() {
        let mut enforcer = SpeedEnforcer::default();
        assert!(enforcer.apply_stored_setting(Ok(Some(4.25))));
        assert_eq!(enforcer.target().rate(), 4.25);

        // Absent value falls back to the default
        assert!(enforcer.apply_stored_setting(Ok(None)));
        assert_eq!(enforcer.target().rate(), 1.0);
    }

    #[test]
    fn test_store_failure_keeps_last_target() {
        let mut enforcer = SpeedEnforcer::default();
        enforcer.apply_stored_setting(Ok(Some(1.5)));

        let changed = enforcer
            .apply_stored_setting(Err(StoreError::Unavailable("no context".to_string())));
        assert!(!changed);
        assert_eq!(enforcer.target().rate(), 1.5);
        assert_eq!(enforcer.stats().store_failures, 1);
    }

    #[test]
    fn test_late_stored_setting_does_not_override_command() {
        let mut enforcer = SpeedEnforcer::default();
        enforcer.handle_request(Request::SetSpeed { speed: 2.25 }, StubScope::default());

        assert!(!enforcer.apply_stored_setting(Ok(Some(1.5))));
        assert_eq!(enforcer.target().rate(), 2.25);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut enforcer = SpeedEnforcer::default();
        let (root, _media) = page(&[1.0, 1.5, 2.0]);
        enforcer.handle_request(Request::SetSpeed { speed: 2.0 }, root.clone());
        enforcer.run_pass(root, Trigger::Poll);

        let stats = enforcer.stats();
        assert_eq!(stats.passes, 2);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.write_failures, 0);
    }

    #[test]
    fn test_trigger_labels() {
        assert_eq!(Trigger::Poll.as_str(), "poll");
        assert_eq!(Trigger::Mutation.as_str(), "mutation");
        assert_eq!(Trigger::Play.as_str(), "play");
    }
}
