//! AnySpeed error types.
//!
//! None of these are fatal to a running engine. Trigger handlers log them and
//! carry on with the next pass.

use thiserror::Error;

/// Failure touching the document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomError {
    /// Element was removed from the document between discovery and write.
    #[error("Element detached from document")]
    Detached,

    /// The platform refused the rate write.
    #[error("Rate write rejected: {0}")]
    Rejected(String),

    /// Document, observer, or listener could not be reached.
    #[error("Document unavailable: {0}")]
    Unavailable(String),
}

/// Failure reading the persisted setting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Store could not be reached (no extension context, sync disabled, ...).
    #[error("Settings store unavailable: {0}")]
    Unavailable(String),

    /// Stored value exists but is not a number.
    #[error("Malformed stored value: {0}")]
    Malformed(String),
}

/// Invalid message from the settings surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Payload could not be decoded as a known request.
    #[error("Malformed request: {0}")]
    Malformed(String),

    /// Speed is not a finite positive number.
    #[error("Invalid speed: {0}")]
    InvalidSpeed(f64),
}

/// Top-level AnySpeed error.
#[derive(Debug, Error)]
pub enum SpeedError {
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Actor mailbox send or reply failed.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Engine has been stopped.
    #[error("Engine stopped")]
    Stopped,
}

impl SpeedError {
    /// Short label for structured log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SpeedError::Dom(_) => "dom",
            SpeedError::Store(_) => "store",
            SpeedError::Protocol(_) => "protocol",
            SpeedError::Channel(_) => "channel",
            SpeedError::Stopped => "stopped",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", SpeedError::Dom(DomError::Detached)),
            "DOM error: Element detached from document"
        );
        assert_eq!(
            format!(
                "{}",
                SpeedError::Store(StoreError::Unavailable("no context".to_string()))
            ),
            "Store error: Settings store unavailable: no context"
        );
        assert_eq!(
            format!("{}", SpeedError::Protocol(ProtocolError::InvalidSpeed(-1.0))),
            "Protocol error: Invalid speed: -1"
        );
    }

    #[test]
    fn test_from_conversions() {
        let err: SpeedError = StoreError::Malformed("\"fast\"".to_string()).into();
        assert!(matches!(err, SpeedError::Store(_)));
        assert_eq!(err.kind(), "store");

        let err: SpeedError = DomError::Rejected("NotSupportedError".to_string()).into();
        assert_eq!(err.kind(), "dom");

        assert_eq!(SpeedError::Stopped.kind(), "stopped");
        assert_eq!(SpeedError::Channel("closed".to_string()).kind(), "channel");
    }
}
