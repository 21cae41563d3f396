//! Collection handles for document store operations.
//!
//! A collection handle pairs a backend with a collection name. Handles own their
//! backend value; pass `&backend` or `Arc<backend>` to share one backend between
//! several handles.
//!
//! # Collection Types
//!
//! - [`Collection`] - Untyped handle exchanging raw BSON documents
//! - [`TypedCollection`] - Handle decoding results into a specific [`Document`] type
//!
//! # Example
//!
//! ```ignore
//! use cinelayer_core::{collection::TypedCollection, query::Filter};
//!
//! let movies = TypedCollection::<_, Movie>::new("movies", &backend);
//! let heat = movies.find_one(Some(Filter::eq("id", 949))).await?;
//! ```

use bson::Document as BsonDocument;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::{
    backend::{StoreBackend, UpdateOutcome},
    document::{Document, DocumentExt, Projection, decode, decode_all},
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Expr, Query},
    update::Update,
};

/// An untyped collection handle.
///
/// All documents are represented as BSON documents, providing maximum flexibility
/// but without compile-time type safety.
#[derive(Debug, Clone)]
pub struct Collection<B: StoreBackend> {
    name: String,
    backend: B,
}

impl<B: StoreBackend> Collection<B> {
    /// Creates a handle for the named collection.
    pub fn new(name: impl Into<String>, backend: B) -> Self {
        Self { name: name.into(), backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend this handle talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consumes the handle and returns its backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Queries raw documents.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<BsonDocument>> {
        self.backend
            .find(query, &self.name)
            .await
    }

    /// Returns the first document matching the filter.
    pub async fn find_one(&self, filter: Option<Expr>) -> DocumentStoreResult<Option<BsonDocument>> {
        self.backend
            .find_one(filter, &self.name)
            .await
    }

    /// Returns `true` when a document matches the filter.
    pub async fn exists(&self, filter: Expr) -> DocumentStoreResult<bool> {
        self.backend
            .exists(filter, &self.name)
            .await
    }

    /// Counts matching documents (all documents when `filter` is `None`).
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count(filter, &self.name)
            .await
    }

    /// Inserts one raw document.
    pub async fn insert_one(&self, document: BsonDocument) -> DocumentStoreResult<()> {
        self.backend
            .insert_one(document, &self.name)
            .await
    }

    /// Applies a partial update to the first matching document.
    pub async fn update_one(&self, filter: Expr, update: Update) -> DocumentStoreResult<UpdateOutcome> {
        self.backend
            .update_one(filter, update, &self.name)
            .await
    }

    /// Deletes matching documents.
    pub async fn delete(&self, filter: Expr) -> DocumentStoreResult<u64> {
        self.backend
            .delete(filter, &self.name)
            .await
    }

    /// Runs an aggregation pipeline and returns the raw rows.
    pub async fn aggregate(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<BsonDocument>> {
        self.backend
            .aggregate(pipeline, &self.name)
            .await
    }

    /// Runs an aggregation pipeline and decodes every row into `R`.
    pub async fn aggregate_as<R: DeserializeOwned>(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<R>> {
        decode_all(self.aggregate(pipeline).await?)
    }

    /// Creates an index on a field of this collection.
    pub async fn add_index(&self, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.backend
            .add_index(&self.name, field, unique)
            .await
    }

    /// Drops this collection and all its documents.
    pub async fn drop(&self) -> DocumentStoreResult<()> {
        self.backend
            .drop_collection(&self.name)
            .await
    }
}

/// A type-safe collection handle for a specific document type.
///
/// Full documents decode into `D`; projected queries decode into any [`Projection`].
#[derive(Debug, Clone)]
pub struct TypedCollection<B: StoreBackend, D: Document> {
    inner: Collection<B>,
    _marker: PhantomData<D>,
}

impl<B: StoreBackend, D: Document> TypedCollection<B, D> {
    /// Creates a typed handle for the named collection.
    pub fn new(name: impl Into<String>, backend: B) -> Self {
        Self {
            inner: Collection::new(name, backend),
            _marker: PhantomData,
        }
    }

    /// Creates a typed handle using the document type's default collection name.
    pub fn with_default_name(backend: B) -> Self {
        Self::new(D::collection_name(), backend)
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the untyped handle for raw access.
    pub fn untyped(&self) -> &Collection<B> {
        &self.inner
    }

    /// Consumes the handle and returns its backend.
    pub fn into_backend(self) -> B {
        self.inner.into_backend()
    }

    /// Queries full documents. Any projection on the query is ignored.
    pub async fn find(&self, mut query: Query) -> DocumentStoreResult<Vec<D>> {
        query.projection = None;
        decode_all(self.inner.find(query).await?)
    }

    /// Queries documents restricted to the projection's fields and decodes them into `P`.
    pub async fn find_projected<P: Projection>(&self, mut query: Query) -> DocumentStoreResult<Vec<P>> {
        query.projection = Some(P::field_list());
        decode_all(self.inner.find(query).await?)
    }

    /// Returns the first matching document, decoded.
    pub async fn find_one(&self, filter: Option<Expr>) -> DocumentStoreResult<Option<D>> {
        self.inner
            .find_one(filter)
            .await?
            .map(decode)
            .transpose()
    }

    /// Returns `true` when a document matches the filter.
    pub async fn exists(&self, filter: Expr) -> DocumentStoreResult<bool> {
        self.inner.exists(filter).await
    }

    /// Counts matching documents.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.inner.count(filter).await
    }

    /// Serializes and inserts one document.
    pub async fn insert(&self, document: &D) -> DocumentStoreResult<()> {
        self.inner
            .insert_one(document.to_document()?)
            .await
    }

    /// Applies a partial update to the first matching document.
    pub async fn update_one(&self, filter: Expr, update: Update) -> DocumentStoreResult<UpdateOutcome> {
        self.inner.update_one(filter, update).await
    }

    /// Deletes matching documents.
    pub async fn delete(&self, filter: Expr) -> DocumentStoreResult<u64> {
        self.inner.delete(filter).await
    }

    /// Runs an aggregation pipeline and decodes every row into `R`.
    pub async fn aggregate_as<R: DeserializeOwned>(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<R>> {
        self.inner.aggregate_as(pipeline).await
    }

    /// Creates an index on a field of this collection.
    pub async fn add_index(&self, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.inner.add_index(field, unique).await
    }
}
