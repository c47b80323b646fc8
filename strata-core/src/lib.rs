//! Strata store engine
//!
//! This crate provides a small reactive state container: a process-local
//! store holding one state tree, updated only through deep-merge patches,
//! observed by any number of subscribed readers.
//!
//! # Architecture
//!
//! ```text
//! state creator → Store ─ set_state → merge → commit → notify listeners
//!                   │
//!                   └─ get_state → StateView (read-only) → Selector → reader
//! ```
//!
//! ## Key Features
//!
//! - **Deep merge**: updates name only what changed; nested records merge
//!   recursively, arrays replace or concatenate
//! - **Change detection by identity**: unchanged subtrees are shared, and an
//!   update that changes nothing notifies nobody
//! - **Read-only state**: state is handed out as a [`StateView`] with no
//!   write operations
//! - **Tear-free reads**: [`Selector`] implements the subscribe / snapshot /
//!   server snapshot protocol of rendering hosts
//! - **Middleware seam**: state creators receive `set`, `get` and a
//!   [`StoreApi`], which persistence decorates
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_core::prelude::*;
//! use serde_json::json;
//!
//! #[derive(Clone)]
//! struct Counter { set: SetState }
//!
//! impl Counter {
//!     fn increment(&self) {
//!         self.set.update(|s| {
//!             let n = s.get("count").and_then(|c| c.as_i64()).unwrap_or(0);
//!             Patch::empty().field("count", n + 1)
//!         });
//!     }
//! }
//!
//! let store = create(|set, _get, _api| {
//!     Setup::new(Value::from(json!({ "count": 0 })), Counter { set })
//! })?;
//!
//! let count = store.select(|s| s.get("count").and_then(|c| c.as_i64())).watch();
//! store.actions().increment();
//! assert_eq!(count.get(), Some(1));
//! ```

#![warn(missing_debug_implementations)]

pub mod error;
pub mod guard;
pub mod listeners;
pub mod merge;
pub mod store;
pub mod subscription;

pub use error::{BoxError, StoreError, StoreResult};
pub use guard::{guard, Guarded, StateView};
pub use listeners::{Listener, Listeners, Unsubscribe};
pub use merge::merge;
pub use store::{
    create, BoundStore, GetProperty, IntoSetup, Revision, SetOptions, SetState, Setup, Store,
    StoreApi, Update,
};
pub use strata_types::{ElementAction, ElementEdit, Patch, Record, Value};
pub use subscription::{sync_external_store, ExternalStore, Selector, Watch};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::guard::{Guarded, StateView};
    pub use crate::store::{create, SetOptions, SetState, Setup, Store, StoreApi};
    pub use crate::subscription::{ExternalStore, Selector, Watch};
    pub use strata_types::{Patch, Value};
}
