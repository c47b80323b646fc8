//! Persistence middleware
//!
//! [`persist`] wraps a state creator. The wrapped creator:
//!
//! 1. runs the inner creator with a `set` handle that writes the full state
//!    to storage after every call, inside the same critical section as the
//!    commit,
//! 2. reads the stored record, migrating it when its version differs from
//!    the configured one,
//! 3. lays the stored top-level fields over the creator's state,
//! 4. commits the result and notifies current listeners exactly once.
//!
//! A missing or unreadable record means "nothing to hydrate". A failing
//! migration fails store creation.

use crate::config::PersistConfig;
use crate::error::{PersistError, PersistResult};
use std::sync::Arc;
use strata_core::{
    GetProperty, IntoSetup, SetOptions, SetState, Setup, StateView, StoreApi, StoreResult,
};
use strata_types::{Record, Value};

/// Decorate `creator` so its store survives restarts.
///
/// The result is itself a state creator and is passed to
/// [`strata_core::create`].
pub fn persist<A, F, R>(
    creator: F,
    config: PersistConfig,
) -> impl FnOnce(SetState, GetProperty, StoreApi) -> StoreResult<Setup<A>>
where
    F: FnOnce(SetState, GetProperty, StoreApi) -> R,
    R: IntoSetup<A>,
{
    move |set, get, api| {
        let config = Arc::new(config);

        let api = {
            let config = config.clone();
            api.with_reset_persistence(move || reset(&config))
        };

        let persisting = {
            let config = config.clone();
            let api = api.clone();
            // commit and save under one lock: the stored record is always
            // the latest committed state
            SetState::new(move |update, options| {
                api.atomically(|| {
                    set.set_with(update, options);
                    write_through(&config, &api.get_state());
                })
            })
        };

        let Setup { state, actions } = creator(persisting, get, api.clone()).into_setup()?;

        let state = match hydrate(&config, &api, &state)? {
            Some(hydrated) => hydrated,
            None => state,
        };

        Ok(Setup { state, actions })
    }
}

fn write_through(config: &PersistConfig, state: &StateView) {
    if let Err(err) = config.save(state.as_value()) {
        tracing::warn!(key = %config.key(), "Failed to persist state: {}", err);
    }
}

fn reset(config: &PersistConfig) {
    match config.clear() {
        Ok(()) => tracing::debug!(key = %config.key(), "persisted state removed"),
        Err(err) => {
            tracing::warn!(key = %config.key(), "Failed to remove persisted state: {}", err)
        }
    }
}

/// Returns the committed state, or `None` when there was nothing usable
/// in storage.
fn hydrate(
    config: &PersistConfig,
    api: &StoreApi,
    created: &Value,
) -> PersistResult<Option<Value>> {
    let record = match config.load() {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(None),
        Err(err) => {
            tracing::warn!(key = %config.key(), "Ignoring unreadable persisted state: {}", err);
            return Ok(None);
        }
    };

    let stored_version = record.version;
    let stored = match (config.version, &config.migrate) {
        (Some(target), Some(migrate)) if target != stored_version => {
            tracing::debug!(
                key = %config.key(),
                from = stored_version,
                to = target,
                "migrating persisted state"
            );
            migrate(record).map_err(|source| PersistError::Migration {
                from: stored_version,
                to: target,
                source,
            })?
        }
        _ => record.state,
    };

    let Some(fields) = stored.as_record() else {
        tracing::warn!(
            key = %config.key(),
            kind = stored.kind(),
            "Ignoring persisted state that is not a record"
        );
        return Ok(None);
    };

    let mut merged: Record = created.as_record().cloned().unwrap_or_default();
    merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    let merged = Value::from(merged);

    if let Some(on_hydrate) = &config.on_hydrate {
        on_hydrate(&merged);
    }

    let options = SetOptions::default()
        .with_replace(true)
        .with_merge_arrays(config.merge_arrays_on_hydrate);
    if !api.set_state_with(merged, options) {
        api.listeners().notify_all();
    }

    tracing::debug!(key = %config.key(), version = stored_version, "state hydrated");
    Ok(Some(api.get_state().to_value()))
}
