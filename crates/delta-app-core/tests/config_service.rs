// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
use delta_app_core::config::{ConfigError, ConfigService, ConfigStore};
use delta_app_core::prefs::{NodePrefs, DEFAULT_FRAME_TIMEOUT_MS, NODE_PREFS_KEY};
use delta_core::{DispatchMode, LoadPolicy, DEFAULT_BANKS};
use delta_dry_tests::InMemoryConfigStore;

#[test]
fn missing_key_loads_as_none() {
    let service = ConfigService::new(InMemoryConfigStore::new());
    let value: Option<u32> = service.load("absent").unwrap();
    assert!(value.is_none());
}

#[test]
fn empty_blob_loads_as_none() {
    let store = InMemoryConfigStore::new();
    store.save_raw("blank", b"").unwrap();
    let service = ConfigService::new(store);
    let value: Option<u32> = service.load("blank").unwrap();
    assert!(value.is_none());
}

#[test]
fn store_failures_propagate() {
    let store = InMemoryConfigStore::new();
    store.set_fail_on_load(true);
    let service = ConfigService::new(store);
    assert!(matches!(service.load::<u32>("k"), Err(ConfigError::Other(_))));
}

#[test]
fn garbage_blob_is_a_serde_error() {
    let store = InMemoryConfigStore::new();
    store.save_raw("k", b"{not json").unwrap();
    let service = ConfigService::new(store);
    assert!(matches!(service.load::<u32>("k"), Err(ConfigError::Serde(_))));
}

#[test]
fn prefs_default_when_nothing_saved() {
    let service = ConfigService::new(InMemoryConfigStore::new());
    let prefs = NodePrefs::load(&service).unwrap();
    assert_eq!(prefs, NodePrefs::default());
}

#[test]
fn prefs_round_trip_keeps_engine_section() {
    let store = InMemoryConfigStore::new();
    let service = ConfigService::new(store.clone());
    let mut prefs = NodePrefs::default();
    prefs.engine.banks = 8;
    prefs.engine.load_policy = LoadPolicy::ClearBanks;
    prefs.frame_timeout_ms = 10;
    prefs.save(&service).unwrap();

    assert!(store.contains_key(NODE_PREFS_KEY));
    assert_eq!(store.save_count(), 1);
    assert_eq!(NodePrefs::load(&service).unwrap(), prefs);
}

#[test]
fn partial_prefs_blob_fills_defaults() {
    let store = InMemoryConfigStore::new();
    store
        .save_raw(NODE_PREFS_KEY, br#"{"engine":{"dispatch":"wide_parallel"}}"#)
        .unwrap();
    let prefs = NodePrefs::load(&ConfigService::new(store)).unwrap();
    assert_eq!(prefs.engine.dispatch, DispatchMode::WideParallel);
    assert_eq!(prefs.frame_timeout_ms, DEFAULT_FRAME_TIMEOUT_MS);
    assert_eq!(prefs.engine.banks, DEFAULT_BANKS);
}

#[test]
fn zero_banks_is_rejected_on_load() {
    let store = InMemoryConfigStore::new();
    store
        .save_raw(NODE_PREFS_KEY, br#"{"engine":{"banks":0}}"#)
        .unwrap();
    let err = NodePrefs::load(&ConfigService::new(store)).unwrap_err();
    assert!(matches!(err, ConfigError::Engine(_)));
}

#[test]
fn unsupported_width_is_a_serde_error() {
    let store = InMemoryConfigStore::new();
    store
        .save_raw(NODE_PREFS_KEY, br#"{"engine":{"width_bits":12}}"#)
        .unwrap();
    let err = NodePrefs::load(&ConfigService::new(store)).unwrap_err();
    assert!(matches!(err, ConfigError::Serde(_)));
}

#[test]
fn missing_key_error_names_the_key() {
    let store = InMemoryConfigStore::new();
    let err = store.load_raw("deltad").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
    assert!(err.to_string().contains("\"deltad\""));
    assert!(err.to_string().starts_with("[CONFIG_NOT_FOUND]"));
}
