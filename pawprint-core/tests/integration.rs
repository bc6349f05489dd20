//! Integration tests for the tracking-session lifecycle
//!
//! These tests drive the initializer end-to-end against a real file-backed
//! device store in a temp directory, verifying the init-once contract and
//! the graceful-degradation behavior the library promises.

use std::sync::Arc;

use pawprint_core::config::ClientConfig;
use pawprint_core::store::{load_or_create_device_id, DEVICE_ID_KEY};
use pawprint_core::{DeviceStore, FileStore, TrackingRuntime};
use tempfile::TempDir;

/// Client config pointing at an unroutable endpoint; construction succeeds,
/// delivery fails fast.
fn offline_config() -> ClientConfig {
    ClientConfig {
        enabled: true,
        server_url: Some("http://127.0.0.1:9".to_string()),
        max_retries: 0,
        timeout_secs: 1,
        ..Default::default()
    }
}

/// Asserts the 8-4-4-4-12 hyphenated UUID shape
fn assert_uuid_format(id: &str) {
    assert_eq!(id.len(), 36, "identifier should be 36 chars: {id}");
    let groups: Vec<&str> = id.split('-').collect();
    let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
    assert!(groups
        .iter()
        .all(|g| g.chars().all(|c| c.is_ascii_hexdigit())));
}

// ============================================
// Fresh-device scenarios
// ============================================

#[test]
fn test_first_call_creates_identifier_and_session() {
    pawprint_core::logging::init_test();

    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path().join("device.json"));
    let runtime = TrackingRuntime::new();

    let session = runtime
        .ensure(&store, &offline_config())
        .expect("session should be created");

    // Storage now contains exactly one newly generated identifier
    let stored = store
        .get(DEVICE_ID_KEY)
        .unwrap()
        .expect("identifier should be persisted");
    assert_uuid_format(&stored);

    // ...and that identifier appears in the handle's user properties
    assert_eq!(
        session.user_properties()[DEVICE_ID_KEY],
        serde_json::Value::String(stored.clone())
    );
    assert_eq!(session.device_id(), stored);
}

#[test]
fn test_identifier_survives_process_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("device.json");

    // First "process"
    let first_id = {
        let store = FileStore::new(&path);
        let runtime = TrackingRuntime::new();
        let session = runtime.ensure(&store, &offline_config()).expect("session");
        session.device_id().to_string()
    };

    // Second "process": fresh runtime, same store file
    let store = FileStore::new(&path);
    let runtime = TrackingRuntime::new();
    let session = runtime.ensure(&store, &offline_config()).expect("session");

    assert_eq!(session.device_id(), first_id);
}

// ============================================
// Singleton property
// ============================================

#[test]
fn test_repeated_calls_return_identical_handle() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path().join("device.json"));
    let runtime = TrackingRuntime::new();
    let config = offline_config();

    let first = runtime.ensure(&store, &config).expect("first call");
    for _ in 0..5 {
        let next = runtime.ensure(&store, &config).expect("later call");
        assert!(Arc::ptr_eq(&first, &next));
    }
}

#[test]
fn test_prepopulated_store_is_reused_verbatim() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path().join("device.json"));
    store.set(DEVICE_ID_KEY, "abc-123").unwrap();

    let runtime = TrackingRuntime::new();
    let config = offline_config();

    let first = runtime.ensure(&store, &config).expect("first call");
    let second = runtime.ensure(&store, &config).expect("second call");

    // Both calls return the same handle reference
    assert!(Arc::ptr_eq(&first, &second));

    // Storage still contains exactly the original value
    assert_eq!(
        store.get(DEVICE_ID_KEY).unwrap().as_deref(),
        Some("abc-123")
    );
    assert_eq!(first.device_id(), "abc-123");
}

#[test]
fn test_concurrent_callers_observe_one_instance() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(dir.path().join("device.json")));
    let runtime = Arc::new(TrackingRuntime::new());
    let config = offline_config();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let runtime = Arc::clone(&runtime);
            let config = config.clone();
            std::thread::spawn(move || runtime.ensure(store.as_ref(), &config))
        })
        .collect();

    let sessions: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().expect("session"))
        .collect();

    for session in &sessions[1..] {
        assert!(Arc::ptr_eq(&sessions[0], session));
    }
}

// ============================================
// Degradation scenarios
// ============================================

#[test]
fn test_unreadable_store_degrades_without_duplicate_handle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("device.json");
    std::fs::write(&path, "this is not json").unwrap();

    let store = FileStore::new(&path);
    let runtime = TrackingRuntime::new();

    // Corrupt storage: no panic, no handle
    assert!(runtime.ensure(&store, &offline_config()).is_none());
    assert!(runtime.get().is_none());

    // Repairing the store lets a later call succeed
    std::fs::write(&path, "{}").unwrap();
    assert!(runtime.ensure(&store, &offline_config()).is_some());
}

#[test]
fn test_disabled_client_still_persists_identifier() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path().join("device.json"));
    let runtime = TrackingRuntime::new();

    assert!(runtime.ensure(&store, &ClientConfig::default()).is_none());

    // The identifier write happens before client construction
    let stored = store.get(DEVICE_ID_KEY).unwrap().expect("identifier");
    assert_uuid_format(&stored);

    // Re-running with tracking now configured reuses that identifier
    let session = runtime.ensure(&store, &offline_config()).expect("session");
    assert_eq!(session.device_id(), stored);
}

// ============================================
// Device identifier helper
// ============================================

#[test]
fn test_load_or_create_against_file_store() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path().join("device.json"));

    let created = load_or_create_device_id(&store).unwrap();
    assert_uuid_format(&created);

    let reloaded = load_or_create_device_id(&store).unwrap();
    assert_eq!(created, reloaded);
}
