//! Decode and print a persisted record.

use super::load_config;
use crate::RecordFormat;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use strata_types::Value;

#[derive(Serialize)]
struct RecordView<'a> {
    key: &'a str,
    version: u32,
    state: &'a Value,
}

pub fn inspect_store(config_path: &Path, key: &str, format: RecordFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let record = config
        .persist_config(key)
        .load()
        .with_context(|| format!("Failed to read persisted store '{}'", key))?
        .with_context(|| format!("No persisted store named '{}'", key))?;

    let view = RecordView {
        key,
        version: record.version,
        state: &record.state,
    };

    match format {
        RecordFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        RecordFormat::Yaml => print!("{}", serde_yaml::to_string(&view)?),
    }
    Ok(())
}
