//! Tests for applying the persisted setting through a `SettingsStore`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use speed_core::enforcer::{EnforcerConfig, SpeedEnforcer, Trigger};
use speed_core::errors::StoreError;
use speed_core::speed::STORAGE_KEY;
use speed_core::store::SettingsStore;
use speed_test_utils::{MockSettingsStore, StreamingPage};

async fn load_into(enforcer: &mut SpeedEnforcer, store: &MockSettingsStore) -> bool {
    let result = store.load_speed(STORAGE_KEY).await;
    enforcer.apply_stored_setting(result)
}

#[tokio::test]
async fn test_stored_speed_reaches_media() {
    let page = StreamingPage::new();
    let store = MockSettingsStore::new().with_speed(1.25);
    let mut enforcer = SpeedEnforcer::new(EnforcerConfig::default());

    assert!(load_into(&mut enforcer, &store).await);
    enforcer.run_pass(page.doc.document(), Trigger::Settings);

    assert_eq!(page.doc.playback_rate(page.video), 1.25);
    assert_eq!(page.doc.playback_rate(page.audio), 1.25);
}

#[tokio::test]
async fn test_zero_and_missing_fall_back_to_default() {
    let mut enforcer = SpeedEnforcer::new(EnforcerConfig::default());

    let store = MockSettingsStore::new().with_value(STORAGE_KEY, json!(0));
    load_into(&mut enforcer, &store).await;
    assert_eq!(enforcer.target().rate(), 1.0);

    let store = MockSettingsStore::new();
    load_into(&mut enforcer, &store).await;
    assert_eq!(enforcer.target().rate(), 1.0);
}

#[tokio::test]
async fn test_non_numeric_value_keeps_target() {
    let mut enforcer = SpeedEnforcer::new(EnforcerConfig::default());
    load_into(&mut enforcer, &MockSettingsStore::new().with_speed(2.0)).await;

    let store = MockSettingsStore::new().with_value(STORAGE_KEY, json!("fast"));
    assert!(!load_into(&mut enforcer, &store).await);
    assert_eq!(enforcer.target().rate(), 2.0);
    assert_eq!(enforcer.stats().store_failures, 1);
}

#[tokio::test]
async fn test_unavailable_store_counted() {
    let mut enforcer = SpeedEnforcer::new(EnforcerConfig::default());
    let store =
        MockSettingsStore::new().failing(StoreError::Unavailable("context invalidated".into()));

    assert!(!load_into(&mut enforcer, &store).await);
    assert_eq!(enforcer.target().rate(), 1.0);
    assert_eq!(enforcer.stats().store_failures, 1);
    assert_eq!(store.reads(), 1);
}
