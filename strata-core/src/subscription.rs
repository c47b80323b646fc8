//! Subscription adapter
//!
//! Rendering hosts read external stores through three primitives: a
//! subscribe function, a current snapshot getter and a server (initial)
//! snapshot getter used before client reads are safe. [`Selector`] maps a
//! store onto them through an optional projection.
//!
//! Selectors do not compare projected values: every committed update
//! renotifies every subscriber, whether or not its slice changed.

use crate::guard::StateView;
use crate::listeners::{Listener, Unsubscribe};
use crate::store::Store;
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The tear-free external store protocol
pub trait ExternalStore {
    type Snapshot;

    fn subscribe(&self, listener: Listener) -> Unsubscribe;

    fn get_snapshot(&self) -> Self::Snapshot;

    fn get_server_snapshot(&self) -> Self::Snapshot;
}

type Projection<T> = Arc<dyn Fn(&StateView) -> T + Send + Sync>;

/// A store seen through a projection
pub struct Selector<T> {
    store: Store,
    projection: Projection<T>,
}

impl<T> Selector<T> {
    pub fn new<F>(store: Store, projection: F) -> Self
    where
        F: Fn(&StateView) -> T + Send + Sync + 'static,
    {
        Selector {
            store,
            projection: Arc::new(projection),
        }
    }

    /// Current projected value
    pub fn get(&self) -> T {
        self.get_snapshot()
    }
}

impl<T: Send + Sync + 'static> Selector<T> {
    /// Start reading the projection the way a rendering host would
    pub fn watch(&self) -> Watch<T> {
        sync_external_store(self.clone())
    }
}

impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Selector {
            store: self.store.clone(),
            projection: self.projection.clone(),
        }
    }
}

impl<T> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<T> ExternalStore for Selector<T> {
    type Snapshot = T;

    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        self.store.subscribe(listener)
    }

    fn get_snapshot(&self) -> T {
        (self.projection)(&self.store.get_state())
    }

    fn get_server_snapshot(&self) -> T {
        (self.projection)(&self.store.get_initial_state())
    }
}

impl Store {
    /// Project the state for a reader
    pub fn select<T, F>(&self, projection: F) -> Selector<T>
    where
        F: Fn(&StateView) -> T + Send + Sync + 'static,
    {
        Selector::new(self.clone(), projection)
    }

    /// Read the whole state
    pub fn select_all(&self) -> Selector<StateView> {
        self.select(StateView::clone)
    }
}

/// A live reader: holds the latest snapshot and re-reads it on every
/// notification. Unsubscribes when dropped.
pub struct Watch<T> {
    current: Arc<RwLock<T>>,
    server: T,
    renders: Arc<AtomicUsize>,
    handle: Unsubscribe,
}

/// Attach a reader to an external store
pub fn sync_external_store<S>(source: S) -> Watch<S::Snapshot>
where
    S: ExternalStore + Send + Sync + 'static,
    S::Snapshot: Send + Sync + 'static,
{
    let source = Arc::new(source);
    let server = source.get_server_snapshot();
    let current = Arc::new(RwLock::new(source.get_snapshot()));
    let renders = Arc::new(AtomicUsize::new(0));

    let listener: Listener = {
        let source = source.clone();
        let current = current.clone();
        let renders = renders.clone();
        Arc::new(move || {
            let next = source.get_snapshot();
            *current.write() = next;
            renders.fetch_add(1, Ordering::SeqCst);
        })
    };
    let handle = source.subscribe(listener);

    Watch {
        current,
        server,
        renders,
        handle,
    }
}

impl<T> Watch<T> {
    /// Latest snapshot
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.current.read().clone()
    }

    /// Call `f` with a copy of the latest snapshot. No lock is held while
    /// `f` runs, so it may update the store.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R
    where
        T: Clone,
    {
        let snapshot = self.get();
        f(&snapshot)
    }

    /// Snapshot taken from the initial state when the reader attached
    pub fn server_snapshot(&self) -> &T {
        &self.server
    }

    /// Number of notifications received
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl<T> Drop for Watch<T> {
    fn drop(&mut self) {
        self.handle.unsubscribe();
    }
}

impl<T: fmt::Debug> fmt::Debug for Watch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("current", &*self.current.read())
            .field("renders", &self.renders())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{create, Setup};
    use serde_json::json;
    use strata_types::{Patch, Value};

    fn person_store() -> Store {
        let bound = create(|_set, _get, _api| {
            Setup::from_state(Value::from(json!({
                "person": { "name": "John", "age": 42 },
                "count": 0
            })))
        })
        .unwrap();
        bound.store().clone()
    }

    #[test]
    fn test_identity_selector_sees_whole_state() {
        let store = person_store();
        let all = store.select_all();
        assert!(all.get_snapshot().same(&store.get_state()));
    }

    #[test]
    fn test_projection_snapshots() {
        let store = person_store();
        let name = store.select(|s| {
            s.path(&["person", "name"])
                .and_then(|n| n.as_str().map(str::to_owned))
        });

        store.set_state(json!({ "person": { "name": "Jane" } }));

        assert_eq!(name.get_snapshot().as_deref(), Some("Jane"));
        assert_eq!(name.get_server_snapshot().as_deref(), Some("John"));
    }

    #[test]
    fn test_every_commit_renotifies_every_reader() {
        let store = person_store();
        let name = store
            .select(|s| s.path(&["person", "name"]).map(|n| n.to_value()))
            .watch();
        let count = store.select(|s| s.get("count").and_then(|c| c.as_i64())).watch();
        let all = store.select_all().watch();

        // only "count" changes, the name reader is notified anyway
        store.set_state(Patch::empty().field("count", 1));

        assert_eq!(name.renders(), 1);
        assert_eq!(count.renders(), 1);
        assert_eq!(all.renders(), 1);
        assert_eq!(count.get(), Some(1));
    }

    #[test]
    fn test_watch_tracks_latest_and_server_snapshot() {
        let store = person_store();
        let count = store.select(|s| s.get("count").and_then(|c| c.as_i64())).watch();

        store.set_state(json!({ "count": 1 }));
        store.set_state(json!({ "count": 2 }));

        assert_eq!(count.get(), Some(2));
        assert_eq!(*count.server_snapshot(), Some(0));
        assert_eq!(count.renders(), 2);
    }

    #[test]
    fn test_dropping_watch_unsubscribes() {
        let store = person_store();
        {
            let _watch = store.select_all().watch();
            assert_eq!(store.listeners().len(), 1);
        }
        assert!(store.listeners().is_empty());
    }

    #[test]
    fn test_noop_update_does_not_render() {
        let store = person_store();
        let all = store.select_all().watch();
        store.update_state(|_| Patch::empty());
        assert_eq!(all.renders(), 0);
    }

    #[test]
    fn test_with_may_update_the_store() {
        let store = person_store();
        let count = store.select(|s| s.get("count").and_then(|c| c.as_i64())).watch();

        let seen = count.with(|current| {
            store.set_state(json!({ "count": 1 }));
            *current
        });

        assert_eq!(seen, Some(0));
        assert_eq!(count.get(), Some(1));
        assert_eq!(count.renders(), 1);
    }

    #[test]
    fn test_with_does_not_block_writers_on_other_threads() {
        let store = person_store();
        let count = store.select(|s| s.get("count").and_then(|c| c.as_i64())).watch();

        let writer = store.clone();
        count.with(|_| {
            std::thread::spawn(move || {
                writer.set_state(json!({ "count": 5 }));
            })
            .join()
            .unwrap();
        });

        assert_eq!(count.get(), Some(5));
    }
}
