//! Metrics definitions for AnySpeed.
//!
//! All metrics follow Prometheus naming conventions:
//! - `anyspeed_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `trigger`: 6 values (startup, poll, mutation, play, command, settings)
//! - `action`: 3 values (setSpeed, getSpeed, invalid)
//! - `event`: 2 values (mutation, play)

use metrics::{counter, gauge};

// ============================================================================
// Enforcement Metrics
// ============================================================================

/// Record one enforcement pass.
///
/// Metric: `anyspeed_enforcement_passes_total`
/// Labels: `trigger`
pub fn record_enforcement_pass(trigger: &str) {
    counter!("anyspeed_enforcement_passes_total", "trigger" => trigger.to_string()).increment(1);
}

/// Record rate writes performed by a pass.
///
/// Metric: `anyspeed_rate_writes_total`
/// Labels: `trigger`
///
/// Sustained non-zero values on a steady page mean the host page keeps
/// resetting the rate.
pub fn record_rate_writes(trigger: &str, count: usize) {
    if count == 0 {
        return;
    }
    counter!("anyspeed_rate_writes_total", "trigger" => trigger.to_string())
        .increment(count as u64);
}

/// Record rate writes that failed.
///
/// Metric: `anyspeed_rate_write_failures_total`
/// Labels: none
pub fn record_rate_write_failures(count: usize) {
    if count == 0 {
        return;
    }
    counter!("anyspeed_rate_write_failures_total").increment(count as u64);
}

/// Record a host event dropped because the driver's queue was full.
///
/// Metric: `anyspeed_host_events_dropped_total`
/// Labels: `event` (mutation, play)
///
/// A dropped event is harmless (a pass is already queued) but a high rate
/// means the host page is mutating the document very quickly.
pub fn record_host_event_dropped(event: &str) {
    counter!("anyspeed_host_events_dropped_total", "event" => event.to_string()).increment(1);
}

/// Set the number of media elements seen by the latest full pass.
///
/// Metric: `anyspeed_media_elements_discovered`
/// Labels: none
pub fn set_media_elements_discovered(count: usize) {
    // usize to f64 conversion is safe for realistic element counts
    #[allow(clippy::cast_precision_loss)]
    gauge!("anyspeed_media_elements_discovered").set(count as f64);
}

// ============================================================================
// Settings Metrics
// ============================================================================

/// Record a failed read of the persisted setting.
///
/// Metric: `anyspeed_store_read_failures_total`
/// Labels: none
pub fn record_store_read_failure() {
    counter!("anyspeed_store_read_failures_total").increment(1);
}

/// Record a settings surface command.
///
/// Metric: `anyspeed_commands_total`
/// Labels: `action` (setSpeed, getSpeed, invalid)
pub fn record_command(action: &str) {
    counter!("anyspeed_commands_total", "action" => action.to_string()).increment(1);
}
