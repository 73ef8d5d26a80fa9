//! Decoding of the synced settings object.
//!
//! `chrome.storage.sync.get` hands back a plain object keyed by setting name.
//! The script stringifies it on the JS side and decodes it here, so this part
//! is testable off the browser.

use speed_core::errors::StoreError;
use speed_core::store::speed_from_json;

/// Read the stored speed from a JSON-encoded items object.
///
/// # Errors
///
/// Returns [`StoreError::Malformed`] if `items_json` is not a JSON object or
/// the value under `key` is not a number.
pub fn stored_speed(items_json: &str, key: &str) -> Result<Option<f64>, StoreError> {
    let items: serde_json::Value = serde_json::from_str(items_json)
        .map_err(|e| StoreError::Malformed(format!("settings object: {e}")))?;

    let Some(items) = items.as_object() else {
        return Err(StoreError::Malformed(
            "settings object is not an object".to_string(),
        ));
    };

    speed_from_json(items.get(key))
}
