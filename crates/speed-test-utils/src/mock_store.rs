//! In-memory settings store.
//!
//! Stands in for the synced key-value store. Can hold a value, fail every
//! read, or answer slowly to exercise the engine's read timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = MockSettingsStore::new().with_speed(2.5);
//! assert_eq!(store.load_speed("playbackSpeed").await, Ok(Some(2.5)));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use speed_core::errors::StoreError;
use speed_core::speed::STORAGE_KEY;
use speed_core::store::{speed_from_json, SettingsStore};

/// Mock settings store.
#[derive(Debug, Clone, Default)]
pub struct MockSettingsStore {
    values: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    failure: Option<StoreError>,
    delay: Option<Duration>,
    reads: Arc<AtomicU32>,
}

impl MockSettingsStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `speed` under the default key.
    pub fn with_speed(self, speed: f64) -> Self {
        self.with_value(STORAGE_KEY, serde_json::json!(speed))
    }

    /// Store an arbitrary JSON value.
    pub fn with_value(self, key: &str, value: serde_json::Value) -> Self {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        self
    }

    /// Fail every read with `error`.
    pub fn failing(mut self, error: StoreError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Delay every read.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of reads so far.
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for MockSettingsStore {
    async fn load_speed(&self, key: &str) -> Result<Option<f64>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        speed_from_json(values.get(key))
    }
}
