//! Delete a persisted store.

use super::load_config;
use anyhow::{Context, Result};
use std::path::Path;
use strata_core::{create, Setup, StoreApi};
use strata_persist::{persist, Storage};
use strata_types::Value;

pub fn reset_store(config_path: &Path, key: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let stored = config
        .open_storage()
        .get_item(key)
        .with_context(|| format!("Failed to read persisted store '{}'", key))?;
    if stored.is_none() {
        println!("No persisted store named '{}'", key);
        return Ok(());
    }

    let store = create(persist(
        |_set, _get, api| Setup::new(Value::empty_record(), api),
        config.persist_config(key),
    ))
    .with_context(|| format!("Failed to open store '{}'", key))?;

    let api: &StoreApi = store.actions();
    api.reset_persistence();
    println!("✓ Reset '{}'", key);
    Ok(())
}
