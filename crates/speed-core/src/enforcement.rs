//! Playback rate enforcement.
//!
//! Writes only when an element's rate differs from the target. Every write
//! fires `ratechange` on the element.

use tracing::warn;

use crate::dom::MediaElement;
use crate::speed::PlaybackSpeed;

/// Outcome of one enforcement run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnforcementReport {
    /// Elements inspected.
    pub examined: usize,
    /// Elements whose rate was changed.
    pub written: usize,
    /// Elements whose write failed.
    pub failed: usize,
}

impl EnforcementReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: EnforcementReport) {
        self.examined += other.examined;
        self.written += other.written;
        self.failed += other.failed;
    }

    /// True if the run changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.written == 0 && self.failed == 0
    }
}

/// Bring a single element to `target`.
///
/// A failed write is logged and reported as not written; the caller's pass
/// continues.
#[allow(clippy::float_cmp)] // exact comparison is the write-on-change rule
pub fn enforce_one<M: MediaElement>(target: PlaybackSpeed, element: &M) -> EnforcementReport {
    let mut report = EnforcementReport {
        examined: 1,
        ..EnforcementReport::default()
    };

    if element.playback_rate() == target.rate() {
        return report;
    }

    match element.set_playback_rate(target.rate()) {
        Ok(()) => report.written = 1,
        Err(e) => {
            warn!(
                target: "speed.enforcement",
                error = %e,
                tag = %element.tag_name(),
                target_rate = target.rate(),
                "Failed to set playback rate"
            );
            report.failed = 1;
        }
    }

    report
}

/// Bring every element to `target`.
pub fn enforce<M: MediaElement>(target: PlaybackSpeed, elements: &[M]) -> EnforcementReport {
    elements
        .iter()
        .fold(EnforcementReport::default(), |mut report, element| {
            report.merge(enforce_one(target, element));
            report
        })
}
