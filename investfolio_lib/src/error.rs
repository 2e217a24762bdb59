//! Error type for position assembly and caching.

use investfolio_model::ModelError;

use crate::store::StoreError;

/// Errors surfaced by the positions factory and its data sources.
///
/// A failed computation is returned to the caller and never memoized, so
/// the next `get` for the same key retries the fetch.
#[derive(thiserror::Error, Debug)]
pub enum PositionsError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    /// A non-SQLite data source failed (used by alternative backends and
    /// test doubles).
    #[error("data access error: {0}")]
    DataAccess(String),
}
