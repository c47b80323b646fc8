//! CLI command implementations.

pub mod get;
pub mod init;
pub mod inspect;
pub mod list;
pub mod reset;

pub use get::get_field;
pub use init::init_project;
pub use inspect::inspect_store;
pub use list::list_stores;
pub use reset::reset_store;

use crate::config::StrataConfig;
use anyhow::{Context, Result};
use std::path::Path;

fn load_config(config_path: &Path) -> Result<StrataConfig> {
    StrataConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration {:?}", config_path))
}
