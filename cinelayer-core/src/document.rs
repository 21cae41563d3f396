//! Core traits for documents and projected views of documents.
//!
//! A [`Document`] is a full record stored in a named collection. A [`Projection`]
//! is a reduced view of a document defined by the set of fields it includes; the
//! store is asked for exactly those fields and the result is decoded into the view.

use bson::{
    Document as BsonDocument,
    de::deserialize_from_document,
    ser::serialize_to_document,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Core trait that all documents stored in a document store must implement.
///
/// # Example
///
/// ```ignore
/// use cinelayer_core::document::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Review {
///     pub id: i64,
///     pub body: String,
/// }
///
/// impl Document for Review {
///     fn collection_name() -> &'static str {
///         "reviews"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns the default name of the collection this document belongs to.
    ///
    /// This should be a static, lowercase identifier (e.g., "movies").
    fn collection_name() -> &'static str;
}

/// A reduced view of a stored document, defined by a fixed field-inclusion set.
///
/// Field names use dot notation for nested values (e.g. `"casts.cast.name"`).
pub trait Projection: DeserializeOwned + Send + Sync + 'static {
    /// The fields the store must return for this view.
    fn fields() -> &'static [&'static str];

    /// The inclusion set as owned strings, ready for a [`Query`](crate::query::Query).
    fn field_list() -> Vec<String> {
        Self::fields()
            .iter()
            .map(|field| field.to_string())
            .collect()
    }
}

/// Extension trait providing conversion utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON document for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_document(&self) -> DocumentStoreResult<BsonDocument>;

    /// Creates a document from a stored BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_document(document: BsonDocument) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_document(&self) -> DocumentStoreResult<BsonDocument> {
        Ok(serialize_to_document(self)?)
    }

    fn from_document(document: BsonDocument) -> DocumentStoreResult<Self> {
        decode(document)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Decodes a raw BSON document into any deserializable shape
/// (a full document, a projection, or an aggregation row).
pub fn decode<T: DeserializeOwned>(document: BsonDocument) -> DocumentStoreResult<T> {
    deserialize_from_document(document).map_err(DocumentStoreError::from)
}

/// Decodes every document of a result set, failing on the first malformed one.
pub fn decode_all<T: DeserializeOwned>(
    documents: impl IntoIterator<Item = BsonDocument>,
) -> DocumentStoreResult<Vec<T>> {
    documents
        .into_iter()
        .map(decode)
        .collect()
}

/// Converts a JSON object into a BSON document.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] when the value is not an object.
pub fn json_to_document(value: Value) -> DocumentStoreResult<BsonDocument> {
    if !value.is_object() {
        return Err(DocumentStoreError::InvalidDocument(format!(
            "expected a JSON object, found {value}"
        )));
    }

    Ok(serialize_to_document(&value)?)
}
