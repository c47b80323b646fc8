//! Store errors

use thiserror::Error;

/// Boxed error carried out of a failing state creator
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The state creator failed; no store was produced
    #[error("Store failed to initialize: {0}")]
    Initialization(#[source] BoxError),
}

impl StoreError {
    /// Wrap any error raised while building a store
    pub fn initialization(err: impl Into<BoxError>) -> Self {
        StoreError::Initialization(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
