#![forbid(unsafe_code)]

//! Integration scenarios for persisted bindings.
//!
//! These tests validate that a binding:
//! - Uses a literal or lazy initial value and saves it to the store
//! - Writes updates through and removes the record on clear
//! - Prefers an existing record over the initial value
//! - Survives a "restart" when backed by the file store
//! - Races last-write-wins with other bindings on the same key

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use keepsake_core::testing::{FaultyStore, RecordingStore};
use keepsake_core::{FileStore, KeyValueStore, MemoryStore, PersistError, PrefixedStore, StoreError};
use keepsake_runtime::{BindingState, InitialValue, Persisted, Update};
use serde::{Deserialize, Serialize};
use tracing::{Level, info};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
}

fn json(value: &str) -> String {
    serde_json::to_string(value).unwrap()
}

#[test]
fn uses_literal_initial_value_and_saves_it() {
    init_tracing();
    let store = Rc::new(MemoryStore::new());
    let name = Persisted::create(store.clone(), "name", InitialValue::value("Test1".to_string()))
        .unwrap();

    assert_eq!(name.value().as_deref(), Some("Test1"));
    assert_eq!(store.get("name").unwrap(), Some(json("Test1")));
}

#[test]
fn uses_lazy_initial_value_and_saves_it() {
    init_tracing();
    let store = Rc::new(MemoryStore::new());
    let calls = Rc::new(Cell::new(0u32));
    let calls_f = Rc::clone(&calls);
    let name = Persisted::create(
        store.clone(),
        "name",
        InitialValue::lazy(move || {
            calls_f.set(calls_f.get() + 1);
            "Test2".to_string()
        }),
    )
    .unwrap();

    assert_eq!(name.value().as_deref(), Some("Test2"));
    assert_eq!(store.get("name").unwrap(), Some(json("Test2")));
    assert_eq!(calls.get(), 1);
}

#[test]
fn update_writes_through() {
    init_tracing();
    let store = Rc::new(MemoryStore::new());
    let name = Persisted::create(store.clone(), "name", InitialValue::value("Test3".to_string()))
        .unwrap();

    name.set("New Test3".to_string()).unwrap();

    assert_eq!(name.value().as_deref(), Some("New Test3"));
    assert_eq!(store.get("name").unwrap(), Some(json("New Test3")));
}

#[test]
fn clear_removes_record() {
    init_tracing();
    let store = Rc::new(MemoryStore::new());
    let name = Persisted::create(store.clone(), "name", InitialValue::value("Test4".to_string()))
        .unwrap();

    name.apply(Update::Clear).unwrap();

    assert_eq!(name.value(), None);
    assert_eq!(store.get("name").unwrap(), None);
    assert_eq!(name.state(), BindingState::Cleared);
}

#[test]
fn existing_record_wins_over_initial_value() {
    init_tracing();
    let store = Rc::new(RecordingStore::new(MemoryStore::new()));
    store.inner().set("name", &json("existing")).unwrap();

    let name = Persisted::create(store.clone(), "name", InitialValue::value("Test2".to_string()))
        .unwrap();

    assert_eq!(name.value().as_deref(), Some("existing"));
    assert_eq!(store.get("name").unwrap(), Some(json("existing")));
    assert_eq!(store.write_count(), 0);
}

#[test]
fn full_lifecycle_scenario() {
    init_tracing();
    let store = Rc::new(MemoryStore::new());
    let name = Persisted::create(store.clone(), "name", InitialValue::value("Test1".to_string()))
        .unwrap();
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let rendered_cb = Rc::clone(&rendered);
    let _sub = name.subscribe(move |v| rendered_cb.borrow_mut().push(v.cloned()));

    name.set("New Test1".to_string()).unwrap();
    assert_eq!(store.get("name").unwrap(), Some(json("New Test1")));

    name.clear().unwrap();
    assert_eq!(store.get("name").unwrap(), None);

    info!(renders = rendered.borrow().len(), "lifecycle complete");
    assert_eq!(
        *rendered.borrow(),
        vec![Some("New Test1".to_string()), None]
    );

    // A fresh binding after clear behaves as if nothing was ever stored.
    drop(name);
    let again = Persisted::create(store.clone(), "name", InitialValue::value("Fresh".to_string()))
        .unwrap();
    assert_eq!(again.value().as_deref(), Some("Fresh"));
    assert_eq!(store.get("name").unwrap(), Some(json("Fresh")));
}

#[test]
fn record_outlives_binding() {
    let store = Rc::new(MemoryStore::new());
    {
        let n = Persisted::create(store.clone(), "n", InitialValue::value(1u32)).unwrap();
        n.set(42).unwrap();
    }
    assert_eq!(store.get("n").unwrap().as_deref(), Some("42"));
}

#[test]
fn functional_update_sees_previous_value() {
    let store = Rc::new(MemoryStore::new());
    let counter = Persisted::create(store.clone(), "count", InitialValue::value(0u64)).unwrap();
    let setter = counter.setter();

    for _ in 0..5 {
        setter
            .apply(Update::with(|prev: Option<&u64>| Some(prev.copied().unwrap_or(0) + 1)))
            .unwrap();
    }
    assert_eq!(counter.value(), Some(5));
    assert_eq!(store.get("count").unwrap().as_deref(), Some("5"));

    // Returning None from the update clears.
    setter.update(|_| None).unwrap();
    assert_eq!(counter.value(), None);
    assert_eq!(store.get("count").unwrap(), None);

    // Updating a cleared binding starts from absence.
    setter.update(|prev| Some(prev.copied().unwrap_or(100))).unwrap();
    assert_eq!(counter.value(), Some(100));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Prefs {
    theme: String,
    font_size: u16,
    recent: Vec<String>,
}

#[test]
fn structured_values_survive_restart_with_file_store() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("prefs.json");
    let prefs = Prefs {
        theme: "dark".into(),
        font_size: 13,
        recent: vec!["notes.md".into()],
    };

    {
        let store = Rc::new(FileStore::open_path(&path).unwrap());
        let binding = Persisted::create(store, "prefs", InitialValue::value(prefs.clone())).unwrap();
        binding
            .update(|p| {
                let mut next = p.cloned()?;
                next.font_size = 15;
                Some(next)
            })
            .unwrap();
    }

    let store = Rc::new(FileStore::open_path(&path).unwrap());
    let restored = Persisted::<Prefs>::create(
        store,
        "prefs",
        InitialValue::lazy(|| panic!("initial value must not be computed after restart")),
    )
    .unwrap();
    assert_eq!(
        restored.value(),
        Some(Prefs {
            font_size: 15,
            ..prefs
        })
    );
}

#[test]
fn bindings_on_same_key_race_last_write_wins() {
    let store = Rc::new(MemoryStore::new());
    let a = Persisted::create(store.clone(), "shared", InitialValue::value(1u8)).unwrap();
    let b = Persisted::create(store.clone(), "shared", InitialValue::value(99u8)).unwrap();

    // b hydrated from a's write.
    assert_eq!(b.value(), Some(1));

    a.set(2).unwrap();
    b.set(3).unwrap();

    assert_eq!(store.get("shared").unwrap().as_deref(), Some("3"));
    // Each binding only reflects its own writes.
    assert_eq!(a.value(), Some(2));
    assert_eq!(b.value(), Some(3));
    assert!(!a.is_synced().unwrap());
    assert!(b.is_synced().unwrap());
}

#[test]
fn namespaced_bindings_do_not_collide() {
    let backing = Rc::new(MemoryStore::new());
    let left = Rc::new(PrefixedStore::new(backing.clone(), "left:"));
    let right = Rc::new(PrefixedStore::new(backing.clone(), "right:"));

    let l = Persisted::create(left, "name", InitialValue::value("L".to_string())).unwrap();
    let r = Persisted::create(right, "name", InitialValue::value("R".to_string())).unwrap();

    assert_eq!(l.value().as_deref(), Some("L"));
    assert_eq!(r.value().as_deref(), Some("R"));
    assert_eq!(backing.keys(), vec!["left:name".to_string(), "right:name".to_string()]);
}

#[test]
fn quota_failure_propagates_and_keeps_state() {
    init_tracing();
    let store = Rc::new(MemoryStore::with_quota(16));
    let note = Persisted::create(store.clone(), "note", InitialValue::value("hi".to_string()))
        .unwrap();

    let err = note.set("x".repeat(64)).unwrap_err();
    match err {
        PersistError::Store { key, source } => {
            assert_eq!(key, "note");
            assert!(matches!(source, StoreError::QuotaExceeded { capacity: 16, .. }));
        }
        other => panic!("expected store error, got {other:?}"),
    }
    assert_eq!(note.value().as_deref(), Some("hi"));
    assert_eq!(store.get("note").unwrap(), Some(json("hi")));
}

#[test]
fn store_outage_then_recovery() {
    let store = Rc::new(FaultyStore::new(MemoryStore::new()));
    let n = Persisted::create(store.clone(), "n", InitialValue::value(1i32)).unwrap();
    let hits = Rc::new(Cell::new(0u32));
    let hits_cb = Rc::clone(&hits);
    let _sub = n.subscribe(move |_| hits_cb.set(hits_cb.get() + 1));

    store.fail_set(Some(StoreError::Unavailable("maintenance".into())));
    assert!(n.set(2).is_err());
    assert_eq!(hits.get(), 0, "no notification for a rejected write");

    store.heal();
    n.set(2).unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(store.get("n").unwrap().as_deref(), Some("2"));
}

#[test]
fn corrupted_record_is_not_masked() {
    let store = Rc::new(MemoryStore::new());
    store.set("prefs", "{\"theme\":").unwrap();

    let err = Persisted::<Prefs>::create(
        store.clone(),
        "prefs",
        InitialValue::lazy(|| Prefs {
            theme: "light".into(),
            font_size: 12,
            recent: Vec::new(),
        }),
    )
    .unwrap_err();

    assert!(matches!(err, PersistError::Deserialization { .. }));
    assert_eq!(store.get("prefs").unwrap().as_deref(), Some("{\"theme\":"));
}
