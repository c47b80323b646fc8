//! Deep-partial updates
//!
//! A [`Patch`] describes what changed in a state tree, never what stays
//! the same. Record patches name only the fields they touch; every field
//! is itself a patch, so nested records merge recursively.

use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A recursively optional description of a change to a state tree
#[derive(Debug, Clone)]
pub enum Patch {
    /// Merge these fields into a record; absent fields stay untouched
    Record(BTreeMap<String, Patch>),

    /// Replace the node with this value (arrays follow the merge policy)
    Set(Value),

    /// Update or remove the elements of a sequence matching a predicate
    Elements(ElementEdit),
}

impl Patch {
    /// A record patch that changes nothing
    pub fn empty() -> Self {
        Patch::Record(BTreeMap::new())
    }

    /// Replace the node with `value`
    pub fn set(value: impl Into<Value>) -> Self {
        Patch::Set(value.into())
    }

    /// Add a field to a record patch.
    ///
    /// Calling this on a non-record patch discards it and starts a new
    /// record patch.
    pub fn field(self, key: impl Into<String>, patch: impl Into<Patch>) -> Self {
        let key = key.into();
        let patch = patch.into();
        match self {
            Patch::Record(mut fields) => {
                fields.insert(key, patch);
                Patch::Record(fields)
            }
            _ => Patch::Record(BTreeMap::from([(key, patch)])),
        }
    }

    /// Merge `patch` into every sequence element matching `predicate`
    pub fn update_where<F>(predicate: F, patch: impl Into<Patch>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Patch::Elements(ElementEdit {
            predicate: Arc::new(predicate),
            action: ElementAction::Update(Box::new(patch.into())),
        })
    }

    /// Drop every sequence element matching `predicate`
    pub fn remove_where<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Patch::Elements(ElementEdit {
            predicate: Arc::new(predicate),
            action: ElementAction::Remove,
        })
    }

    /// True for a record patch with no fields
    pub fn is_empty(&self) -> bool {
        matches!(self, Patch::Record(fields) if fields.is_empty())
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Patch::Record(_))
    }
}

impl Default for Patch {
    fn default() -> Self {
        Patch::empty()
    }
}

/// Predicate-driven edit of sequence elements
#[derive(Clone)]
pub struct ElementEdit {
    predicate: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    action: ElementAction,
}

impl ElementEdit {
    pub fn matches(&self, element: &Value) -> bool {
        (self.predicate)(element)
    }

    pub fn action(&self) -> &ElementAction {
        &self.action
    }
}

impl fmt::Debug for ElementEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementEdit")
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

/// What happens to a matching element
#[derive(Debug, Clone)]
pub enum ElementAction {
    Update(Box<Patch>),
    Remove,
}

impl From<Value> for Patch {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(record) => Patch::Record(
                record
                    .iter()
                    .map(|(k, v)| (k.clone(), Patch::from(v.clone())))
                    .collect(),
            ),
            other => Patch::Set(other),
        }
    }
}

impl From<serde_json::Value> for Patch {
    fn from(json: serde_json::Value) -> Self {
        Patch::from(Value::from(json))
    }
}

macro_rules! from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Patch {
                fn from(v: $ty) -> Self {
                    Patch::Set(Value::from(v))
                }
            }
        )*
    };
}

from_scalar!(bool, i32, i64, u32, u64, usize, f64, &str, String, Vec<Value>);
