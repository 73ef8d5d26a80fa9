//! Observability for AnySpeed.
//!
//! Metrics go through the `metrics` facade. With no recorder installed (the
//! browser build) every call is a no-op.

pub mod metrics;
