//! Persistence for strata stores
//!
//! Wrap a state creator with [`persist`] to write the store's full state
//! to a [`Storage`] after every update and to restore it, migrating old
//! versions, when the store is created again.
//!
//! ```rust,ignore
//! use strata_core::prelude::*;
//! use strata_persist::{persist, PersistConfig};
//! use serde_json::json;
//!
//! let store = create(persist(
//!     |_set, _get, _api| Setup::from_state(Value::from(json!({ "friends": [] }))),
//!     PersistConfig::new("friends").version(2).migrate(|record| {
//!         // upgrade `record.state` from `record.version`
//!         Ok(record.state)
//!     }),
//! ))?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod middleware;
pub mod storage;

pub use codec::{Base64JsonCodec, Codec, JsonCodec, PersistedRecord};
pub use config::PersistConfig;
pub use error::{PersistError, PersistResult, StorageError};
pub use middleware::persist;
pub use storage::{FileStorage, MemoryStorage, Storage};
