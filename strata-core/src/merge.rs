//! Deep merge of a state tree with a partial update
//!
//! The merge never mutates its inputs. Every subtree the patch does not
//! change is shared with `base`, and when nothing changes at all the
//! result is `base` itself, which is what lets the store detect no-op
//! updates by identity.

use std::sync::Arc;
use strata_types::{ElementAction, ElementEdit, Patch, Record, Value};

/// Merge `patch` into `base`.
///
/// With `merge_arrays` an array in the patch is appended to the array it
/// lands on; otherwise it replaces it.
pub fn merge(base: &Value, patch: &Patch, merge_arrays: bool) -> Value {
    match patch {
        Patch::Record(fields) => merge_record(base, fields, merge_arrays),
        Patch::Set(value) => merge_leaf(base, value, merge_arrays),
        Patch::Elements(edit) => edit_elements(base, edit, merge_arrays),
    }
}

fn merge_record(
    base: &Value,
    fields: &std::collections::BTreeMap<String, Patch>,
    merge_arrays: bool,
) -> Value {
    let source = base.as_record();
    let mut next: Option<Record> = None;

    for (key, field) in fields {
        let current = source.and_then(|record| record.get(key));

        let merged = match current {
            Some(current) => merge(current, field, merge_arrays),
            // nothing to edit under an absent key
            None if matches!(field, Patch::Elements(_)) => continue,
            None => merge(&Value::Null, field, merge_arrays),
        };

        if current.is_some_and(|current| current.same(&merged)) {
            continue;
        }

        next.get_or_insert_with(|| source.cloned().unwrap_or_default())
            .insert(key.clone(), merged);
    }

    match (next, source) {
        (Some(record), _) => Value::Object(Arc::new(record)),
        (None, Some(_)) => base.clone(),
        // a record patch over a scalar or sequence yields a record
        (None, None) => Value::empty_record(),
    }
}

fn merge_leaf(base: &Value, value: &Value, merge_arrays: bool) -> Value {
    let next = match (base, value) {
        (Value::Array(existing), Value::Array(incoming)) if merge_arrays => {
            if incoming.is_empty() {
                return base.clone();
            }
            let mut items = Vec::with_capacity(existing.len() + incoming.len());
            items.extend(existing.iter().cloned());
            items.extend(incoming.iter().cloned());
            Value::Array(Arc::new(items))
        }
        _ => value.clone(),
    };

    if next == *base {
        base.clone()
    } else {
        next
    }
}

fn edit_elements(base: &Value, edit: &ElementEdit, merge_arrays: bool) -> Value {
    let Some(items) = base.as_array() else {
        return base.clone();
    };

    let mut changed = false;
    let mut next = Vec::with_capacity(items.len());

    for item in items {
        if !edit.matches(item) {
            next.push(item.clone());
            continue;
        }

        match edit.action() {
            ElementAction::Remove => changed = true,
            ElementAction::Update(patch) => {
                let merged = merge(item, patch, merge_arrays);
                changed |= !merged.same(item);
                next.push(merged);
            }
        }
    }

    if changed {
        Value::Array(Arc::new(next))
    } else {
        base.clone()
    }
}
