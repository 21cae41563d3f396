//! Storage backend abstraction for the document store.
//!
//! This module defines the trait that abstracts over storage implementations,
//! allowing the same collection handles and services to run against an
//! in-memory backend or a real document database.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for the
//! operations a single-collection data-access layer needs: filtered `find`
//! with projection/sort/pagination, existence checks, counts, single-document
//! insert, partial update, delete, and aggregation pipelines. Implementations
//! are required to be thread-safe (`Send + Sync`) and support concurrent access.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use cinelayer_core::{backend::StoreBackend, query::{Filter, Query}};
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! backend.insert_one(doc! { "id": 1, "title": "Heat" }, "movies").await?;
//! let found = backend.find_one(Some(Filter::eq("id", 1)), "movies").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Document;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Expr, Query},
    update::Update,
};

/// Acknowledgement of a partial update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of documents matched by the filter (0 or 1).
    pub matched: u64,
    /// Number of documents actually changed.
    pub modified: u64,
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Operations are independent requests; no ordering is guaranteed between
/// calls issued concurrently.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Backends forward driver failures as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) and
/// report unique-index violations as
/// [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Queries documents in a collection.
    ///
    /// Applies the query's filter, sort keys, offset, limit and projection, in that order.
    /// A missing collection yields an empty result.
    ///
    /// # Arguments
    ///
    /// * `query` - The [`Query`] describing the request
    /// * `collection` - The name of the collection to query
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>>;

    /// Returns the first document matching the filter, or `None`.
    ///
    /// An absent filter matches any document.
    async fn find_one(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Returns `true` when at least one document matches the filter.
    async fn exists(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool>;

    /// Counts the documents matching the filter (all documents when `None`).
    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64>;

    /// Inserts one document, creating the collection if needed.
    ///
    /// Fails with `DocumentAlreadyExists` when the document violates a unique index.
    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<()>;

    /// Merges the update's assignments into the first document matching the filter.
    ///
    /// Matching nothing is not an error; the outcome reports `matched == 0`.
    async fn update_one(
        &self,
        filter: Expr,
        update: Update,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome>;

    /// Deletes every document matching the filter and returns how many were removed.
    async fn delete(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64>;

    /// Runs an aggregation pipeline over the collection and returns the resulting rows.
    async fn aggregate(
        &self,
        pipeline: Pipeline,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Creates an index on a field. With `unique` set, later inserts that repeat an
    /// indexed value fail with `DocumentAlreadyExists`.
    ///
    /// # Note
    ///
    /// If existing documents already violate the constraint the backend may return an error.
    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()>;

    /// Drops a collection and all its documents. Dropping a missing collection is a no-op.
    ///
    /// # Warning
    ///
    /// This operation is irreversible.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op; backends holding external
    /// connections should override it.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        (*self).find(query, collection).await
    }

    async fn find_one(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        (*self).find_one(filter, collection).await
    }

    async fn exists(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool> {
        (*self).exists(filter, collection).await
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        (*self).count(filter, collection).await
    }

    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<()> {
        (*self).insert_one(document, collection).await
    }

    async fn update_one(
        &self,
        filter: Expr,
        update: Update,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome> {
        (*self)
            .update_one(filter, update, collection)
            .await
    }

    async fn delete(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        (*self).delete(filter, collection).await
    }

    async fn aggregate(
        &self,
        pipeline: Pipeline,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        (*self).aggregate(pipeline, collection).await
    }

    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        (*self)
            .add_index(collection, field, unique)
            .await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (*self).drop_collection(name).await
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend,
{
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        (**self).find(query, collection).await
    }

    async fn find_one(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<Option<Document>> {
        (**self).find_one(filter, collection).await
    }

    async fn exists(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool> {
        (**self).exists(filter, collection).await
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        (**self).count(filter, collection).await
    }

    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<()> {
        (**self).insert_one(document, collection).await
    }

    async fn update_one(
        &self,
        filter: Expr,
        update: Update,
        collection: &str,
    ) -> DocumentStoreResult<UpdateOutcome> {
        (**self)
            .update_one(filter, update, collection)
            .await
    }

    async fn delete(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        (**self).delete(filter, collection).await
    }

    async fn aggregate(
        &self,
        pipeline: Pipeline,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        (**self).aggregate(pipeline, collection).await
    }

    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        (**self)
            .add_index(collection, field, unique)
            .await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (**self).drop_collection(name).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
