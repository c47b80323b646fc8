//! Persisted record encoding

use crate::error::{PersistError, PersistResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use strata_types::Value;

fn default_version() -> u32 {
    1
}

/// What is written to storage: the full state and the schema version it
/// was written under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(default = "Value::empty_record")]
    pub state: Value,

    #[serde(default = "default_version")]
    pub version: u32,
}

impl PersistedRecord {
    pub fn new(state: Value, version: u32) -> Self {
        PersistedRecord { state, version }
    }
}

/// Turns records into storage strings and back
pub trait Codec: Send + Sync {
    fn encode(&self, record: &PersistedRecord) -> PersistResult<String>;

    fn decode(&self, raw: &str) -> PersistResult<PersistedRecord>;

    /// Short name, used in logs and configuration
    fn name(&self) -> &'static str;
}

/// Plain JSON: `{"state": {...}, "version": n}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, record: &PersistedRecord) -> PersistResult<String> {
        serde_json::to_string(record).map_err(|e| PersistError::Encode(e.to_string()))
    }

    fn decode(&self, raw: &str) -> PersistResult<PersistedRecord> {
        serde_json::from_str(raw).map_err(|e| PersistError::Decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// JSON wrapped in standard base64, so entries are not readable at a glance
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64JsonCodec;

impl Codec for Base64JsonCodec {
    fn encode(&self, record: &PersistedRecord) -> PersistResult<String> {
        let json = JsonCodec.encode(record)?;
        Ok(STANDARD.encode(json))
    }

    fn decode(&self, raw: &str) -> PersistResult<PersistedRecord> {
        let bytes = STANDARD
            .decode(raw.trim())
            .map_err(|e| PersistError::Decode(format!("invalid base64: {}", e)))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| PersistError::Decode(format!("invalid UTF-8: {}", e)))?;
        JsonCodec.decode(&json)
    }

    fn name(&self) -> &'static str {
        "base64"
    }
}
