//! List persisted stores.

use super::load_config;
use anyhow::{Context, Result};
use std::path::Path;
use strata_persist::Storage;

pub fn list_stores(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let storage = config.open_storage();

    let keys = storage
        .keys()
        .with_context(|| format!("Failed to list {:?}", storage.root()))?;

    if keys.is_empty() {
        println!("No persisted stores in {:?}", storage.root());
        return Ok(());
    }

    for key in keys {
        println!("{}", key);
    }
    Ok(())
}
