//! Failures reported by collection handles and backends.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// A failed store operation. Backends translate driver errors into these variants.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// A value did not fit the BSON or JSON shape it was decoded into.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The backend could not be built, e.g. an unparsable connection string.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document violating a unique index already exists in the collection.
    /// The first argument describes the conflicting key, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The document has an invalid structure (e.g. not a BSON document).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A filter, projection, sort or update descriptor could not be applied.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// An aggregation pipeline stage could not be built or executed.
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),
    /// Anything else the driver reports, as text.
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(error: BsonError) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(error: SerdeJsonError) -> Self {
        Self::Serialization(error.to_string())
    }
}
