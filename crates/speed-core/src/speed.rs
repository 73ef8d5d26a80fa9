//! Target speed and the allowed speed domain.
//!
//! The settings surface only ever offers [`ALLOWED_SPEEDS`]: 1.00 to 5.00 in
//! quarter steps. The engine trusts the values it receives and does not snap
//! them; [`snap_to_allowed`] and [`format_label`] exist so the settings
//! surface contract is expressed in one place.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ProtocolError;

/// Rate used before any setting has been loaded, and when none is stored.
pub const DEFAULT_SPEED: f64 = 1.0;

/// Persisted setting key.
pub const STORAGE_KEY: &str = "playbackSpeed";

/// Speeds the settings surface may send.
pub const ALLOWED_SPEEDS: [f64; 17] = [
    1.0, 1.25, 1.5, 1.75, //
    2.0, 2.25, 2.5, 2.75, //
    3.0, 3.25, 3.5, 3.75, //
    4.0, 4.25, 4.5, 4.75, //
    5.0,
];

/// Desired playback rate.
///
/// Always finite and strictly positive. Construct with [`PlaybackSpeed::new`]
/// for untrusted input or [`PlaybackSpeed::from_stored`] for persisted values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PlaybackSpeed(f64);

impl PlaybackSpeed {
    /// Validate a rate.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidSpeed`] for NaN, infinite, zero, or
    /// negative values. Media elements throw on those.
    pub fn new(rate: f64) -> Result<Self, ProtocolError> {
        if rate.is_finite() && rate > 0.0 {
            Ok(Self(rate))
        } else {
            Err(ProtocolError::InvalidSpeed(rate))
        }
    }

    /// Interpret a persisted value.
    ///
    /// Missing, zero, and otherwise unusable values fall back to
    /// [`DEFAULT_SPEED`].
    #[must_use]
    pub fn from_stored(value: Option<f64>) -> Self {
        value
            .and_then(|v| Self::new(v).ok())
            .unwrap_or_default()
    }

    /// The raw rate.
    #[must_use]
    pub fn rate(self) -> f64 {
        self.0
    }

    /// Whether this speed is one the settings surface can produce.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        ALLOWED_SPEEDS.contains(&self.0)
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        Self(DEFAULT_SPEED)
    }
}

impl TryFrom<f64> for PlaybackSpeed {
    type Error = ProtocolError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlaybackSpeed> for f64 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.0
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_label(self.0))
    }
}

/// Nearest allowed speed. Ties resolve to the lower value.
#[must_use]
pub fn snap_to_allowed(value: f64) -> f64 {
    ALLOWED_SPEEDS
        .iter()
        .copied()
        .fold(DEFAULT_SPEED, |best, candidate| {
            if (candidate - value).abs() < (best - value).abs() {
                candidate
            } else {
                best
            }
        })
}

/// Slider label, e.g. `2.50x`.
#[must_use]
pub fn format_label(rate: f64) -> String {
    format!("{rate:.2}x")
}
