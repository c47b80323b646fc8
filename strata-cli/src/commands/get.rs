//! Read one field of a persisted store through a hydrated store.

use super::load_config;
use anyhow::{bail, Context, Result};
use std::path::Path;
use strata_core::{create, Setup};
use strata_persist::persist;
use strata_types::Value;

pub fn get_field(config_path: &Path, key: &str, field: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let persist_config = config.persist_config(key);

    if persist_config
        .load()
        .with_context(|| format!("Failed to read persisted store '{}'", key))?
        .is_none()
    {
        bail!("No persisted store named '{}'", key);
    }

    let store = create(persist(
        |_set, _get, _api| Setup::from_state(Value::empty_record()),
        persist_config,
    ))
    .with_context(|| format!("Failed to open store '{}'", key))?;

    let value = store
        .get_property(field)
        .with_context(|| format!("Store '{}' has no field '{}'", key, field))?;

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
