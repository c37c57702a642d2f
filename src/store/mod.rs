//! Metadata store interface and implementations.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::{SqliteConfig, SqliteStore};

use crate::data::FrameRecord;
use crate::query::Query;
use thiserror::Error;

/// Errors raised by a metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened or reached.
    #[error("metadata store unavailable at {location}: {reason}")]
    Unavailable { location: String, reason: String },

    /// The store was reachable but rejected the query.
    #[error("metadata query failed: {0}")]
    QueryFailed(String),

    /// A record lacks its identifier.
    #[error("record without identifier: {0}")]
    MissingIdentifier(String),
}

/// Read-only, queryable collection of obslog records.
pub trait MetadataStore: Send + Sync {
    /// Return all records matching the query, in the store's natural order.
    fn query(&self, query: &Query) -> Result<Vec<FrameRecord>, StoreError>;
}
