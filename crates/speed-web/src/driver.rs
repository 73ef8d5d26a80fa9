//! Page-side decisions, kept free of `web-sys` so they run off the browser.
//!
//! The content script forwards every browser callback here. Until the stored
//! speed has been read (or a `setSpeed` command has arrived) the target is
//! only a default, so poll, mutation and play triggers leave the page alone.
//! The first pass runs when storage answers.

use speed_core::dom::{MediaElement, MediaScope};
use speed_core::enforcement::EnforcementReport;
use speed_core::enforcer::{EnforcerConfig, EnforcerStats, SpeedEnforcer, Trigger};
use speed_core::errors::StoreError;
use speed_core::protocol::Response;
use speed_core::speed::PlaybackSpeed;
use tracing::trace;

/// What a `pagehide` event means for the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageHide {
    /// The page is entering the back/forward cache. Timers and listeners
    /// resume when it is restored.
    Cache,
    /// The page is being unloaded.
    Unload,
}

impl PageHide {
    /// Classify from `PageTransitionEvent.persisted`.
    #[must_use]
    pub fn from_persisted(persisted: bool) -> Self {
        if persisted {
            PageHide::Cache
        } else {
            PageHide::Unload
        }
    }

    #[must_use]
    pub fn stops_script(self) -> bool {
        self == PageHide::Unload
    }
}

/// The enforcer plus the "has a real target yet" gate.
#[derive(Debug)]
pub struct PageDriver {
    enforcer: SpeedEnforcer,
    ready: bool,
}

impl PageDriver {
    #[must_use]
    pub fn new(config: EnforcerConfig) -> Self {
        Self {
            enforcer: SpeedEnforcer::new(config),
            ready: false,
        }
    }

    #[must_use]
    pub fn target(&self) -> PlaybackSpeed {
        self.enforcer.target()
    }

    #[must_use]
    pub fn stats(&self) -> EnforcerStats {
        self.enforcer.stats()
    }

    /// Storage answered. Applies the result and runs a pass over `root`:
    /// the startup pass, or a settings pass if a command got there first.
    pub fn on_settings<S: MediaScope>(
        &mut self,
        result: Result<Option<f64>, StoreError>,
        root: S,
    ) -> EnforcementReport {
        self.enforcer.apply_stored_setting(result);
        let trigger = if self.ready {
            Trigger::Settings
        } else {
            Trigger::Startup
        };
        self.ready = true;
        self.enforcer.run_pass(root, trigger)
    }

    /// Poll or mutation trigger. `None` while waiting for storage.
    pub fn on_trigger<S: MediaScope>(
        &mut self,
        root: S,
        trigger: Trigger,
    ) -> Option<EnforcementReport> {
        if !self.ready {
            trace!(
                target: "speed.web",
                trigger = trigger.as_str(),
                "Waiting for stored speed, skipping pass"
            );
            return None;
        }
        Some(self.enforcer.run_pass(root, trigger))
    }

    /// Play trigger. `None` while waiting for storage.
    pub fn on_play<M: MediaElement>(&mut self, element: &M) -> Option<EnforcementReport> {
        if !self.ready {
            return None;
        }
        Some(self.enforcer.enforce_element(element, Trigger::Play))
    }

    /// Settings surface message. An accepted `setSpeed` sets a real target,
    /// so triggers enforce from then on.
    pub fn on_message<S: MediaScope>(&mut self, json: &str, root: S) -> Response {
        let response = self.enforcer.handle_message(json, root);
        if response == Response::ack() {
            self.ready = true;
        }
        response
    }
}
