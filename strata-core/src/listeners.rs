//! Listener set
//!
//! Listeners are zero-argument callbacks. Membership is deduplicated by
//! allocation: subscribing the same `Arc` twice keeps one entry.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A subscribed reader's callback
pub type Listener = Arc<dyn Fn() + Send + Sync>;

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// The set of callbacks notified after every committed update
#[derive(Clone, Default)]
pub struct Listeners {
    entries: Arc<RwLock<Vec<Listener>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. Returns false if it was already present.
    pub fn insert(&self, listener: Listener) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|existing| same_listener(existing, &listener)) {
            return false;
        }
        entries.push(listener);
        true
    }

    /// Remove a listener. Returns false if it was not present.
    pub fn remove(&self, listener: &Listener) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|existing| !same_listener(existing, listener));
        entries.len() != before
    }

    pub fn contains(&self, listener: &Listener) -> bool {
        self.entries
            .read()
            .iter()
            .any(|existing| same_listener(existing, listener))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Call every listener once, in subscription order.
    ///
    /// Iterates a snapshot, so listeners may subscribe or unsubscribe
    /// while being notified; changes apply from the next round.
    pub fn notify_all(&self) {
        let snapshot: Vec<Listener> = self.entries.read().clone();
        for listener in snapshot {
            listener();
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

/// Handle returned by `subscribe`; removes exactly that listener
#[must_use = "dropping the handle keeps the listener subscribed"]
#[derive(Clone)]
pub struct Unsubscribe {
    listeners: Listeners,
    listener: Listener,
}

impl Unsubscribe {
    pub(crate) fn new(listeners: Listeners, listener: Listener) -> Self {
        Self {
            listeners,
            listener,
        }
    }

    /// Remove the listener. Calling this again is a no-op.
    pub fn unsubscribe(&self) {
        self.listeners.remove(&self.listener);
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe").finish_non_exhaustive()
    }
}
