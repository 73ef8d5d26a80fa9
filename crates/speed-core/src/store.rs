//! Persisted setting abstraction.
//!
//! The store is owned by the extension (a synced key-value area). The engine
//! only ever reads one numeric key from it, once, at startup.

use async_trait::async_trait;

use crate::errors::StoreError;

/// Read access to the persisted speed setting.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    /// Read the value stored under `key`.
    ///
    /// `Ok(None)` means nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be reached or the value
    /// is not a number.
    async fn load_speed(&self, key: &str) -> Result<Option<f64>, StoreError>;
}

/// Interpret a raw JSON value read from a key-value store.
///
/// # Errors
///
/// Returns [`StoreError::Malformed`] for values that are neither a number nor
/// null.
pub fn speed_from_json(value: Option<&serde_json::Value>) -> Result<Option<f64>, StoreError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(StoreError::Malformed(other.to_string())),
    }
}
