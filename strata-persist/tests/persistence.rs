//! Integration tests for the persistence middleware

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use strata_core::prelude::*;
use strata_core::{BoundStore, StoreError, StoreResult};
use strata_persist::{
    persist, Base64JsonCodec, FileStorage, MemoryStorage, PersistConfig, PersistError, Storage,
    StorageError,
};
use tempfile::TempDir;

#[derive(Clone)]
struct Friends {
    set: SetState,
    api: StoreApi,
}

impl Friends {
    fn add(&self, name: &str) {
        self.set.set_with(
            Patch::empty().field("friends", Value::array([name])),
            SetOptions::default().with_merge_arrays(true),
        );
    }

    fn forget(&self) -> bool {
        self.api.reset_persistence()
    }
}

fn friends_store(config: PersistConfig) -> StoreResult<BoundStore<Friends>> {
    create(persist(
        |set, _get, api| {
            Setup::new(
                Value::from(json!({ "name": "John", "friends": [] })),
                Friends { set, api },
            )
        },
        config,
    ))
}

fn friends(store: &Store) -> serde_json::Value {
    store.get_property("friends").map(|f| f.to_json()).unwrap_or_default()
}

fn counting_migration(calls: &Arc<AtomicUsize>) -> PersistConfig {
    let calls = calls.clone();
    PersistConfig::new("friends").migrate(move |record| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(record.state)
    })
}

#[test]
fn test_state_survives_recreation() {
    let storage = Arc::new(MemoryStorage::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = friends_store(counting_migration(&calls).storage(storage.clone())).unwrap();
    first.actions().add("x");
    assert_eq!(friends(&first), json!(["x"]));

    let second = friends_store(counting_migration(&calls).storage(storage.clone())).unwrap();
    assert_eq!(friends(&second), json!(["x"]));
    assert_eq!(
        second.get_property("name").and_then(|n| n.as_str().map(str::to_owned)),
        Some("John".to_string())
    );

    // no version configured, so no migration
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_hydrated_state_is_the_initial_state() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set_item("friends", r#"{"state":{"friends":["a","b"]},"version":1}"#)
        .unwrap();

    let store = friends_store(PersistConfig::new("friends").storage(storage)).unwrap();
    assert!(store.get_state().same(&store.get_initial_state()));
    assert_eq!(friends(&store), json!(["a", "b"]));
}

#[test]
fn test_migration_runs_once_on_version_change() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set_item("friends", r#"{"state":{"friends":["a"]},"version":1}"#)
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let config = PersistConfig::new("friends")
        .version(2)
        .storage(storage.clone())
        .migrate(move |record| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(record.version, 1);
            let mut friends = record
                .state
                .get("friends")
                .and_then(|f| f.as_array().map(<[Value]>::to_vec))
                .unwrap_or_default();
            friends.push(Value::from("migrated"));
            Ok(Value::record([("friends", Value::array(friends))]))
        });

    let store = friends_store(config).unwrap();
    assert_eq!(friends(&store), json!(["a", "migrated"]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // the next write stores the new version
    store.actions().add("b");
    let raw = storage.get_item("friends").unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored["version"], json!(2));
    assert_eq!(stored["state"]["friends"], json!(["a", "migrated", "b"]));
}

#[test]
fn test_matching_version_skips_migration() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set_item("friends", r#"{"state":{"friends":["a"]},"version":2}"#)
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let store =
        friends_store(counting_migration(&calls).version(2).storage(storage)).unwrap();

    assert_eq!(friends(&store), json!(["a"]));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failing_migration_fails_creation() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set_item("friends", r#"{"state":{},"version":1}"#)
        .unwrap();

    let config = PersistConfig::new("friends")
        .version(3)
        .storage(storage)
        .migrate(|_| Err("unsupported schema".into()));

    let err = friends_store(config).unwrap_err();
    let StoreError::Initialization(source) = err;
    match source.downcast_ref::<PersistError>() {
        Some(PersistError::Migration { from, to, .. }) => {
            assert_eq!((*from, *to), (1, 3));
        }
        other => panic!("expected a migration error, got {:?}", other),
    }
}

#[test]
fn test_reset_prevents_hydration() {
    let storage = Arc::new(MemoryStorage::new());
    let config = PersistConfig::new("friends").storage(storage.clone());

    let first = friends_store(config.clone()).unwrap();
    first.actions().add("x");
    assert!(first.actions().forget());
    assert!(storage.get_item("friends").unwrap().is_none());

    // the live store keeps its state
    assert_eq!(friends(&first), json!(["x"]));

    let second = friends_store(config).unwrap();
    assert_eq!(friends(&second), json!([]));
}

#[test]
fn test_corrupt_entry_is_ignored() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set_item("friends", "{not json").unwrap();

    let store = friends_store(PersistConfig::new("friends").storage(storage.clone())).unwrap();
    assert_eq!(friends(&store), json!([]));

    storage.set_item("friends", r#"{"state":[1,2],"version":1}"#).unwrap();
    let store = friends_store(PersistConfig::new("friends").storage(storage)).unwrap();
    assert_eq!(friends(&store), json!([]));
}

#[test]
fn test_hydration_notifies_listeners_once() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set_item("counter", r#"{"state":{"count":7}}"#)
        .unwrap();

    let notified = Arc::new(AtomicUsize::new(0));
    let hits = notified.clone();
    let store = create(persist(
        move |_set, _get, api| {
            let _subscription = api.subscribe(Arc::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
            Setup::from_state(Value::from(json!({ "count": 0 })))
        },
        PersistConfig::new("counter").storage(storage),
    ))
    .unwrap();

    assert_eq!(store.get_property("count").and_then(|c| c.as_i64()), Some(7));
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nothing_stored_means_no_notification_and_no_write() {
    let storage = Arc::new(MemoryStorage::new());

    let notified = Arc::new(AtomicUsize::new(0));
    let hits = notified.clone();
    let store = create(persist(
        move |_set, _get, api| {
            let _subscription = api.subscribe(Arc::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
            Setup::from_state(Value::from(json!({ "count": 0 })))
        },
        PersistConfig::new("counter").storage(storage.clone()),
    ))
    .unwrap();

    assert_eq!(store.get_state().to_value().to_json(), json!({ "count": 0 }));
    assert!(store.get_state().same(&store.get_initial_state()));
    assert_eq!(notified.load(Ordering::SeqCst), 0);
    assert!(storage.is_empty());
}

#[test]
fn test_unchanged_hydration_still_notifies_once() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set_item("counter", r#"{"state":{"count":7}}"#)
        .unwrap();

    let notified = Arc::new(AtomicUsize::new(0));
    let hits = notified.clone();
    let store = create(persist(
        move |set, _get, api| {
            // the stored state is already current, so hydration commits nothing
            set.set(json!({ "count": 7 }));
            let _subscription = api.subscribe(Arc::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
            Setup::from_state(Value::from(json!({ "count": 0 })))
        },
        PersistConfig::new("counter").storage(storage),
    ))
    .unwrap();

    assert_eq!(store.get_property("count").and_then(|c| c.as_i64()), Some(7));
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[test]
fn test_on_hydrate_sees_merged_state() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set_item("friends", r#"{"state":{"friends":["z"]},"version":1}"#)
        .unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(None));
    let sink = seen.clone();
    let config = PersistConfig::new("friends")
        .storage(storage)
        .on_hydrate(move |state| *sink.lock() = Some(state.to_json()));

    friends_store(config).unwrap();
    assert_eq!(
        seen.lock().clone(),
        Some(json!({ "name": "John", "friends": ["z"] }))
    );
}

#[test]
fn test_file_storage_base64_round_trip() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()));
    let config = PersistConfig::new("complex-store")
        .version(2)
        .codec(Base64JsonCodec)
        .storage(storage.clone());

    let first = friends_store(config.clone()).unwrap();
    first.actions().add("Ann");

    let raw = std::fs::read_to_string(storage.entry_path("complex-store")).unwrap();
    assert!(!raw.contains("Ann"));

    let second = friends_store(config).unwrap();
    assert_eq!(friends(&second), json!(["Ann"]));
}

#[test]
fn test_stored_record_format() {
    let storage = Arc::new(MemoryStorage::new());
    let store = friends_store(PersistConfig::new("friends").version(2).storage(storage.clone()))
        .unwrap();
    store.actions().add("x");

    let raw = storage.get_item("friends").unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    insta::assert_json_snapshot!(stored, @r#"
    {
      "state": {
        "friends": [
          "x"
        ],
        "name": "John"
      },
      "version": 2
    }
    "#);
}

#[derive(Clone)]
struct Todos {
    set: SetState,
}

impl Todos {
    fn add(&self, id: i64, title: &str) {
        let todo = Value::from(json!({ "id": id, "title": title, "completed": false }));
        self.set.set_with(
            Patch::empty().field("todos", Value::array([todo])),
            SetOptions::default().with_merge_arrays(true),
        );
    }

    fn complete(&self, id: i64) {
        self.set.set(Patch::empty().field(
            "todos",
            Patch::update_where(
                move |t| t.get("id").and_then(Value::as_i64) == Some(id),
                Patch::empty().field("completed", true),
            ),
        ));
    }
}

#[test]
fn test_persisted_todo_list() {
    let storage = Arc::new(MemoryStorage::new());
    let open = || {
        create(persist(
            |set, _get, _api| Setup::new(Value::from(json!({ "todos": [] })), Todos { set }),
            PersistConfig::new("todos").storage(storage.clone()),
        ))
        .unwrap()
    };

    let store = open();
    store.actions().add(1, "write tests");
    store.actions().add(2, "ship");
    store.actions().complete(2);

    let reopened = open();
    assert_eq!(
        reopened.get_property("todos").unwrap().to_json(),
        json!([
            { "id": 1, "title": "write tests", "completed": false },
            { "id": 2, "title": "ship", "completed": true }
        ])
    );
}

/// Memory storage whose writes of `"count":1` take a while
#[derive(Default)]
struct SlowStorage {
    inner: MemoryStorage,
}

impl Storage for SlowStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if value.contains(r#""count":1"#) {
            thread::sleep(Duration::from_millis(300));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.inner.keys()
    }
}

#[test]
fn test_concurrent_writers_store_the_latest_state() {
    let storage = Arc::new(SlowStorage::default());
    let store = create(persist(
        |set, _get, _api| Setup::new(Value::from(json!({ "count": 0 })), set),
        PersistConfig::new("counter").storage(storage.clone()),
    ))
    .unwrap();

    let write = |count: i64| {
        let set = store.actions().clone();
        thread::spawn(move || set.set(json!({ "count": count })))
    };
    let slow = write(1);
    thread::sleep(Duration::from_millis(100));
    let fast = write(2);
    slow.join().unwrap();
    fast.join().unwrap();

    let raw = storage.get_item("counter").unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let in_memory = store.get_property("count").map(|c| c.to_json());

    assert_eq!(in_memory, Some(json!(2)));
    assert_eq!(Some(stored["state"]["count"].clone()), in_memory);
}
