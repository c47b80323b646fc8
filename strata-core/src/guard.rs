//! Read-only views over a state tree
//!
//! [`StateView`] is the only shape in which a store hands its state out.
//! It exposes reads and nothing else: there is no assignment or deletion
//! to reject at runtime because the operations do not exist.
//!
//! ```compile_fail
//! use strata_core::guard;
//! use strata_types::Value;
//!
//! let view = guard(&Value::record([("count", 1)]));
//! view.insert("count", 2);
//! ```
//!
//! Nested records are wrapped lazily, when they are read. Arrays are not
//! wrapped: reading one yields an owned copy the caller may change at
//! will, and such changes never reach the store.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use std::fmt;
use strata_types::Value;

/// Wrap a state tree in a read-only view
pub fn guard(tree: &Value) -> StateView {
    StateView { tree: tree.clone() }
}

/// Read-only view of a state tree node
#[derive(Clone, PartialEq)]
pub struct StateView {
    tree: Value,
}

impl StateView {
    /// Read a field. Absent keys (and non-record nodes) yield `None`.
    pub fn get(&self, key: &str) -> Option<Guarded> {
        self.tree.get(key).map(Guarded::wrap)
    }

    /// Read a nested field by walking record keys
    pub fn path(&self, keys: &[&str]) -> Option<Guarded> {
        let (last, parents) = keys.split_last()?;
        let mut node = &self.tree;
        for key in parents {
            node = node.get(key)?;
        }
        node.get(last).map(Guarded::wrap)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tree.get(key).is_some()
    }

    /// Field names of a record node, in key order
    pub fn keys(&self) -> Vec<&str> {
        self.tree
            .as_record()
            .map(|record| record.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of fields of a record node
    pub fn len(&self) -> usize {
        self.tree.as_record().map_or(0, |record| record.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_record(&self) -> bool {
        self.tree.is_record()
    }

    /// Identity comparison with another view
    pub fn same(&self, other: &StateView) -> bool {
        self.tree.same(&other.tree)
    }

    /// Borrow the underlying tree.
    ///
    /// Container nodes are shared copy-on-write, so holding the tree gives
    /// no way to alter the store's copy.
    pub fn as_value(&self) -> &Value {
        &self.tree
    }

    pub fn to_value(&self) -> Value {
        self.tree.clone()
    }

    /// Decode the viewed tree into a typed value
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        self.tree.deserialize_into()
    }
}

impl fmt::Debug for StateView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateView").field(&self.tree).finish()
    }
}

impl fmt::Display for StateView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tree, f)
    }
}

impl Serialize for StateView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tree.serialize(serializer)
    }
}

/// A value read through a [`StateView`]
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded {
    /// Nested record, still read-only
    View(StateView),

    /// Owned copy of a sequence
    Array(Vec<Value>),

    /// Scalar leaf
    Scalar(Value),
}

impl Guarded {
    fn wrap(value: &Value) -> Self {
        match value {
            Value::Object(_) => Guarded::View(guard(value)),
            Value::Array(items) => Guarded::Array(items.as_ref().clone()),
            scalar => Guarded::Scalar(scalar.clone()),
        }
    }

    pub fn as_view(&self) -> Option<&StateView> {
        match self {
            Guarded::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_view(self) -> Option<StateView> {
        match self {
            Guarded::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Guarded::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Guarded::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Guarded::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Value::as_i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Value::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    /// Rebuild a plain value from whatever was read
    pub fn to_value(&self) -> Value {
        match self {
            Guarded::View(view) => view.to_value(),
            Guarded::Array(items) => Value::from(items.clone()),
            Guarded::Scalar(value) => value.clone(),
        }
    }
}
