//! Persistence errors

use strata_core::{BoxError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to encode persisted state: {0}")]
    Encode(String),

    #[error("Failed to decode persisted state: {0}")]
    Decode(String),

    #[error("Migration from version {from} to {to} failed: {source}")]
    Migration {
        from: u32,
        to: u32,
        #[source]
        source: BoxError,
    },
}

impl From<PersistError> for StoreError {
    fn from(err: PersistError) -> Self {
        StoreError::initialization(err)
    }
}

pub type PersistResult<T> = Result<T, PersistError>;
