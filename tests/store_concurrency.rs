use hookguard::core::config::GuardConfig;
use hookguard::core::store::SessionStore;
use hookguard::core::value::StateValue;
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

fn test_store() -> (tempfile::TempDir, SessionStore) {
    let tmp = tempfile::tempdir().unwrap();
    let config = GuardConfig::with_state_dir(tmp.path());
    let store = SessionStore::locate(&config, "state-concurrency").unwrap();
    (tmp, store)
}

fn counter(store: &SessionStore, key: &str) -> i64 {
    store
        .read()
        .get(key)
        .and_then(StateValue::as_f64)
        .map(|v| v as i64)
        .unwrap_or(0)
}

fn increment(record: &mut hookguard::core::value::StateRecord, key: &str) {
    let current = record.get(key).and_then(StateValue::as_f64).unwrap_or(0.0) as i64;
    record.insert(key, current + 1);
}

#[test]
fn test_concurrent_writers_on_distinct_keys_lose_nothing() {
    let (_tmp, store) = test_store();
    let writers = 8;
    let rounds = 25;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|i| {
            // Each thread opens its own lock file handle, which flock treats
            // like a separate process.
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let key = format!("writer_{}", i);
                for _ in 0..rounds {
                    store.try_update(|record| increment(record, &key)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let record = store.read();
    assert_eq!(record.len(), writers);
    for i in 0..writers {
        assert_eq!(counter(&store, &format!("writer_{}", i)), rounds as i64);
    }
}

#[test]
fn test_concurrent_writers_on_shared_key_are_linearized() {
    let (_tmp, store) = test_store();
    let writers = 6;
    let rounds = 20;
    let barrier = Arc::new(Barrier::new(writers));

    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..rounds {
                    store.try_update(|record| increment(record, "shared")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter(&store, "shared"), (writers * rounds) as i64);
}

#[test]
fn test_read_without_backing_file_is_empty() {
    let (_tmp, store) = test_store();
    assert!(!store.state_path().exists());
    assert!(store.try_read().unwrap().is_empty());
    assert!(store.read().is_empty());
}

#[test]
fn test_set_preserves_other_keys_and_overwrites_same_key() {
    let (_tmp, store) = test_store();
    store.set("key1", "value1");
    store.set("key2", "value2");
    store.set("key1", "value3");
    let record = store.read();
    assert_eq!(record.get("key1"), Some(&StateValue::from("value3")));
    assert_eq!(record.get("key2"), Some(&StateValue::from("value2")));
}

#[test]
fn test_nested_values_round_trip_through_disk() {
    let (_tmp, store) = test_store();
    let raw = serde_json::json!({"nested": {"flag": true, "n": 2}, "list": [1, "two", false]});
    store.set("complex", StateValue::from_json(raw.clone()).unwrap());
    assert_eq!(store.get("complex").unwrap().to_json(), raw);
}

#[test]
fn test_truncated_file_is_discarded_and_repaired() {
    let (_tmp, store) = test_store();
    store.set("before", true);
    fs::write(store.state_path(), "{\"before\": tr").unwrap();

    assert!(store.try_read().unwrap().is_empty());
    assert!(store.read().is_empty());

    store.set("after", 1i64);
    let content = fs::read_to_string(store.state_path()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed, serde_json::json!({"after": 1}));
}

#[test]
fn test_non_object_file_is_treated_as_empty() {
    let (_tmp, store) = test_store();
    fs::write(store.state_path(), "[1, 2, 3]").unwrap();
    assert!(store.read().is_empty());
    assert_eq!(store.update(|record| record.len()), Some(0));
}

#[test]
fn test_remove_and_clear() {
    let (_tmp, store) = test_store();
    store.set("a", 1i64);
    store.set("b", 2i64);
    store.remove("a");
    assert!(store.get("a").is_none());
    assert!(store.get("b").is_some());
    store.clear();
    assert!(store.read().is_empty());
}

#[test]
fn test_lock_file_sits_next_to_state_file() {
    let (_tmp, store) = test_store();
    store.set("k", "v");
    assert!(store.lock_path().exists());
    assert_eq!(store.lock_path().parent(), store.state_path().parent());
    assert!(
        store
            .lock_path()
            .to_string_lossy()
            .ends_with(".json.lock")
    );
}
