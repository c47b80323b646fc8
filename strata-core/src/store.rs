//! Store engine
//!
//! A [`Store`] owns one state tree, its listener set and the initial
//! state captured at construction. The only way to change the state is
//! [`Store::set_state_with`] (and the handles built on it), which resolves
//! the update, merges it, commits only if the tree actually changed and
//! then notifies every listener once.
//!
//! The resolve / merge / compare / commit / notify sequence runs under a
//! reentrant lock: a listener may call back into `set_state` on the same
//! thread, while other threads wait for the whole sequence to finish.

use crate::error::StoreResult;
use crate::guard::{guard, StateView};
use crate::listeners::{Listener, Listeners, Unsubscribe};
use crate::merge::merge;
use once_cell::sync::OnceCell;
use parking_lot::{ReentrantMutex, RwLock};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_types::{Patch, Value};

/// Commit counter for a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(pub u64);

impl Revision {
    pub const ZERO: Revision = Revision(0);

    pub fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Options for a single update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Substitute a non-record `Patch::Set` update verbatim instead of
    /// merging it. Records always merge, and an array then replaces the
    /// state even when `merge_arrays` is set.
    pub replace: bool,

    /// Append arrays instead of replacing them
    pub merge_arrays: bool,
}

impl SetOptions {
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn with_merge_arrays(mut self, merge_arrays: bool) -> Self {
        self.merge_arrays = merge_arrays;
        self
    }
}

/// An update: a concrete patch, or a function of the current state
pub enum Update<'a> {
    Patch(Patch),
    Compute(Box<dyn FnOnce(&StateView) -> Patch + 'a>),
}

impl<'a> Update<'a> {
    pub fn compute<F>(f: F) -> Self
    where
        F: FnOnce(&StateView) -> Patch + 'a,
    {
        Update::Compute(Box::new(f))
    }

    fn resolve(self, current: &StateView) -> Patch {
        match self {
            Update::Patch(patch) => patch,
            Update::Compute(f) => f(current),
        }
    }
}

impl fmt::Debug for Update<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            Update::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

impl From<Patch> for Update<'_> {
    fn from(patch: Patch) -> Self {
        Update::Patch(patch)
    }
}

impl From<Value> for Update<'_> {
    fn from(value: Value) -> Self {
        Update::Patch(Patch::from(value))
    }
}

impl From<serde_json::Value> for Update<'_> {
    fn from(json: serde_json::Value) -> Self {
        Update::Patch(Patch::from(json))
    }
}

struct StoreInner {
    state: RwLock<Value>,
    initial: OnceCell<Value>,
    listeners: Listeners,
    commit: ReentrantMutex<()>,
    revision: AtomicU64,
}

/// Shared handle to a store
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    fn new() -> Self {
        Store {
            inner: Arc::new(StoreInner {
                state: RwLock::new(Value::Null),
                initial: OnceCell::new(),
                listeners: Listeners::new(),
                commit: ReentrantMutex::new(()),
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// Current state, read-only
    pub fn get_state(&self) -> StateView {
        guard(&self.inner.state.read())
    }

    /// State captured when the store was created.
    ///
    /// While the state creator is still running this is the current state.
    pub fn get_initial_state(&self) -> StateView {
        match self.inner.initial.get() {
            Some(initial) => guard(initial),
            None => self.get_state(),
        }
    }

    /// One top-level field of the current state
    pub fn get_property(&self, key: &str) -> Option<Value> {
        self.inner.state.read().get(key).cloned()
    }

    /// Apply an update with default options. Returns true if it committed.
    pub fn set_state<'a>(&self, update: impl Into<Update<'a>>) -> bool {
        self.set_state_with(update, SetOptions::default())
    }

    /// Apply an update computed from the current state
    pub fn update_state<F>(&self, f: F) -> bool
    where
        F: FnOnce(&StateView) -> Patch,
    {
        self.set_state_with(Update::compute(f), SetOptions::default())
    }

    /// Apply an update. Returns true if the state changed.
    pub fn set_state_with<'a>(&self, update: impl Into<Update<'a>>, options: SetOptions) -> bool {
        let _commit = self.inner.commit.lock();

        let current = self.inner.state.read().clone();
        let patch = update.into().resolve(&guard(&current));

        let next = match patch {
            Patch::Set(value) if options.replace && !value.is_record() => value,
            patch => merge(&current, &patch, options.merge_arrays),
        };

        if next.same(&current) {
            tracing::trace!("update left state unchanged");
            return false;
        }

        *self.inner.state.write() = next;
        let revision = Revision(self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1);

        tracing::debug!(
            revision = %revision,
            listeners = self.inner.listeners.len(),
            "state committed"
        );

        self.inner.listeners.notify_all();
        true
    }

    /// Add a listener; the handle removes exactly this listener
    pub fn subscribe(&self, listener: Listener) -> Unsubscribe {
        self.inner.listeners.insert(listener.clone());
        Unsubscribe::new(self.inner.listeners.clone(), listener)
    }

    /// Subscribe a plain closure
    pub fn subscribe_fn<F>(&self, f: F) -> Unsubscribe
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(f))
    }

    pub fn listeners(&self) -> &Listeners {
        &self.inner.listeners
    }

    /// Number of commits so far
    pub fn revision(&self) -> Revision {
        Revision(self.inner.revision.load(Ordering::SeqCst))
    }

    /// Run `f` inside the commit critical section.
    ///
    /// Updates from other threads wait until `f` returns; updates from the
    /// calling thread (including those made by `f`) go through.
    pub fn atomically<R>(&self, f: impl FnOnce() -> R) -> R {
        let _commit = self.inner.commit.lock();
        f()
    }

    fn capture_initial(&self, state: Value) {
        let _commit = self.inner.commit.lock();
        *self.inner.state.write() = state.clone();
        if self.inner.initial.set(state).is_err() {
            tracing::warn!("initial state already captured");
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.read())
            .field("revision", &self.revision())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

/// The `set` handle given to a state creator
#[derive(Clone)]
pub struct SetState {
    apply: Arc<dyn Fn(Update<'_>, SetOptions) + Send + Sync>,
}

impl SetState {
    /// Build a setter from any update sink; used by middleware to decorate
    /// the write path
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn(Update<'_>, SetOptions) + Send + Sync + 'static,
    {
        SetState {
            apply: Arc::new(apply),
        }
    }

    pub fn set<'a>(&self, update: impl Into<Update<'a>>) {
        (self.apply)(update.into(), SetOptions::default());
    }

    pub fn set_with<'a>(&self, update: impl Into<Update<'a>>, options: SetOptions) {
        (self.apply)(update.into(), options);
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&StateView) -> Patch,
    {
        (self.apply)(Update::compute(f), SetOptions::default());
    }

    pub fn update_with<F>(&self, f: F, options: SetOptions)
    where
        F: FnOnce(&StateView) -> Patch,
    {
        (self.apply)(Update::compute(f), options);
    }
}

impl fmt::Debug for SetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState").finish_non_exhaustive()
    }
}

/// The `get` handle given to a state creator
#[derive(Clone, Debug)]
pub struct GetProperty {
    store: Store,
}

impl GetProperty {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get_property(key)
    }
}

type ResetFn = Arc<dyn Fn() + Send + Sync>;

/// Capabilities handed to a state creator alongside `set` and `get`
#[derive(Clone)]
pub struct StoreApi {
    store: Store,
    reset: Option<ResetFn>,
}

impl StoreApi {
    fn new(store: Store) -> Self {
        StoreApi { store, reset: None }
    }

    pub fn subscribe(&self, listener: Listener) -> Unsubscribe {
        self.store.subscribe(listener)
    }

    pub fn get_state(&self) -> StateView {
        self.store.get_state()
    }

    pub fn set_state<'a>(&self, update: impl Into<Update<'a>>) -> bool {
        self.store.set_state(update)
    }

    pub fn set_state_with<'a>(&self, update: impl Into<Update<'a>>, options: SetOptions) -> bool {
        self.store.set_state_with(update, options)
    }

    /// The live listener set, for forcing a notification
    pub fn listeners(&self) -> &Listeners {
        self.store.listeners()
    }

    /// See [`Store::atomically`]
    pub fn atomically<R>(&self, f: impl FnOnce() -> R) -> R {
        self.store.atomically(f)
    }

    /// Attach a persistence reset capability
    pub fn with_reset_persistence<F>(mut self, reset: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.reset = Some(Arc::new(reset));
        self
    }

    /// Delete the durable copy of this store's state, if persistence is
    /// configured. Returns false when there is nothing to reset.
    pub fn reset_persistence(&self) -> bool {
        match &self.reset {
            Some(reset) => {
                reset();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for StoreApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreApi")
            .field("store", &self.store)
            .field("persistent", &self.reset.is_some())
            .finish()
    }
}

/// What a state creator returns: the initial state and its actions
#[derive(Debug, Clone)]
pub struct Setup<A = ()> {
    pub state: Value,
    pub actions: A,
}

impl<A> Setup<A> {
    pub fn new(state: impl Into<Value>, actions: A) -> Self {
        Setup {
            state: state.into(),
            actions,
        }
    }
}

impl Setup<()> {
    pub fn from_state(state: impl Into<Value>) -> Self {
        Setup::new(state, ())
    }
}

/// Result types a state creator may return
pub trait IntoSetup<A> {
    fn into_setup(self) -> StoreResult<Setup<A>>;
}

impl<A> IntoSetup<A> for Setup<A> {
    fn into_setup(self) -> StoreResult<Setup<A>> {
        Ok(self)
    }
}

impl<A> IntoSetup<A> for StoreResult<Setup<A>> {
    fn into_setup(self) -> StoreResult<Setup<A>> {
        self
    }
}

/// A store together with the actions its creator built
pub struct BoundStore<A> {
    store: Store,
    actions: A,
}

impl<A> BoundStore<A> {
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn into_parts(self) -> (Store, A) {
        (self.store, self.actions)
    }
}

impl<A> Deref for BoundStore<A> {
    type Target = Store;

    fn deref(&self) -> &Store {
        &self.store
    }
}

impl<A> fmt::Debug for BoundStore<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundStore")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Build a store.
///
/// `creator` runs exactly once, synchronously, and receives the `set`
/// handle, the `get` handle and the [`StoreApi`] capabilities. The state it
/// returns becomes both the initial and the current state. A creator
/// returning an error yields no store.
pub fn create<A, F, R>(creator: F) -> StoreResult<BoundStore<A>>
where
    F: FnOnce(SetState, GetProperty, StoreApi) -> R,
    R: IntoSetup<A>,
{
    let store = Store::new();

    let set = {
        let store = store.clone();
        SetState::new(move |update, options| {
            store.set_state_with(update, options);
        })
    };
    let get = GetProperty {
        store: store.clone(),
    };
    let api = StoreApi::new(store.clone());

    let Setup { state, actions } = creator(set, get, api).into_setup()?;
    if !state.is_record() {
        tracing::debug!(kind = state.kind(), "store created with a non-record state");
    }
    store.capture_initial(state);

    Ok(BoundStore { store, actions })
}
