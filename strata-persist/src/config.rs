//! Persistence configuration

use crate::codec::{Codec, JsonCodec, PersistedRecord};
use crate::error::PersistResult;
use crate::storage::{MemoryStorage, Storage};
use std::fmt;
use std::sync::Arc;
use strata_core::BoxError;
use strata_types::Value;

pub(crate) type MigrateFn = Arc<dyn Fn(PersistedRecord) -> Result<Value, BoxError> + Send + Sync>;
pub(crate) type HydrateFn = Arc<dyn Fn(&Value) + Send + Sync>;

/// How and where a store is persisted
#[derive(Clone)]
pub struct PersistConfig {
    pub(crate) key: String,
    pub(crate) version: Option<u32>,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) migrate: Option<MigrateFn>,
    pub(crate) on_hydrate: Option<HydrateFn>,
    pub(crate) merge_arrays_on_hydrate: bool,
}

impl PersistConfig {
    /// Persist under `key`, as JSON, in the process-wide memory storage
    pub fn new(key: impl Into<String>) -> Self {
        PersistConfig {
            key: key.into(),
            version: None,
            codec: Arc::new(JsonCodec),
            storage: MemoryStorage::global(),
            migrate: None,
            on_hydrate: None,
            merge_arrays_on_hydrate: false,
        }
    }

    /// Schema version written with every record and compared on hydration
    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Upgrade a record stored under a different version.
    ///
    /// Only consulted when a version is configured and differs from the
    /// stored one. An error fails store creation.
    pub fn migrate<F>(mut self, migrate: F) -> Self
    where
        F: Fn(PersistedRecord) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.migrate = Some(Arc::new(migrate));
        self
    }

    /// Observe the hydrated state before it is committed
    pub fn on_hydrate<F>(mut self, on_hydrate: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on_hydrate = Some(Arc::new(on_hydrate));
        self
    }

    /// Concatenate array fields when committing the hydrated state
    pub fn merge_arrays_on_hydrate(mut self, merge_arrays: bool) -> Self {
        self.merge_arrays_on_hydrate = merge_arrays;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Version written with records; 1 when none is configured
    pub fn write_version(&self) -> u32 {
        self.version.unwrap_or(1)
    }

    /// Read and decode the stored record, if any. An empty entry counts as
    /// absent.
    pub fn load(&self) -> PersistResult<Option<PersistedRecord>> {
        match self.storage.get_item(&self.key)? {
            Some(raw) if !raw.trim().is_empty() => self.codec.decode(&raw).map(Some),
            _ => Ok(None),
        }
    }

    /// Encode `state` under the write version and store it
    pub fn save(&self, state: &Value) -> PersistResult<()> {
        let record = PersistedRecord::new(state.clone(), self.write_version());
        let encoded = self.codec.encode(&record)?;
        self.storage.set_item(&self.key, &encoded)?;
        Ok(())
    }

    /// Delete the stored record
    pub fn clear(&self) -> PersistResult<()> {
        self.storage.remove_item(&self.key)?;
        Ok(())
    }
}

impl fmt::Debug for PersistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistConfig")
            .field("key", &self.key)
            .field("version", &self.version)
            .field("codec", &self.codec.name())
            .field("migrate", &self.migrate.is_some())
            .field("on_hydrate", &self.on_hydrate.is_some())
            .field("merge_arrays_on_hydrate", &self.merge_arrays_on_hydrate)
            .finish()
    }
}
