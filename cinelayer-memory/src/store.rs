//! In-memory storage implementation for document stores.
//!
//! This module provides a simple in-memory backend that keeps each collection's
//! documents as BSON in insertion order, guarded by an async-safe read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document};

use cinelayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Expr, Query},
    update::Update,
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator},
    executor::{PipelineExecutor, sort_rows},
    path,
};

#[derive(Debug, Default)]
struct CollectionData {
    /// Documents in insertion order; natural order for unsorted reads.
    documents: Vec<Document>,
    /// Field paths carrying a unique index.
    unique_fields: Vec<String>,
}

impl CollectionData {
    fn position(&self, filter: Option<&Expr>) -> DocumentStoreResult<Option<usize>> {
        let Some(filter) = filter else {
            return Ok((!self.documents.is_empty()).then_some(0));
        };

        Ok(
            DocumentEvaluator::match_flags(self.documents.iter(), filter)?
                .into_iter()
                .position(|matched| matched)
        )
    }

    fn matching(&self, filter: Option<&Expr>) -> DocumentStoreResult<Vec<&Document>> {
        match filter {
            Some(filter) => DocumentEvaluator::filter_documents(self.documents.iter(), filter),
            None => Ok(self.documents.iter().collect()),
        }
    }

    /// Fails when `candidate` repeats a uniquely indexed value of any document
    /// other than the one at `skip`.
    fn check_unique(&self, candidate: &Document, skip: Option<usize>, collection: &str) -> DocumentStoreResult<()> {
        let null = Bson::Null;

        for field in &self.unique_fields {
            let value = path::get_path(candidate, field).unwrap_or(&null);
            let expected = Comparable::from(value);

            let conflict = self.documents
                .iter()
                .enumerate()
                .filter(|(index, _)| Some(*index) != skip)
                .any(|(_, existing)| {
                    Comparable::from(path::get_path(existing, field).unwrap_or(&null)) == expected
                });

            if conflict {
                return Err(DocumentStoreError::DocumentAlreadyExists(
                    format!("{field}={value}"),
                    collection.to_string(),
                ));
            }
        }

        Ok(())
    }
}

type StoreMap = HashMap<String, CollectionData>;


/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a fully functional
/// document store that operates entirely in memory using async-aware read-write locks.
/// Filters, sorting, pagination, partial updates, unique indexes and aggregation
/// pipelines all behave like a document database would for the supported operators.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a collection; indexes only enforce uniqueness.
/// This is meant for tests, development and small libraries.
///
/// # Example
///
/// ```ignore
/// use cinelayer_memory::InMemoryStore;
/// use cinelayer_core::{backend::StoreBackend, query::Filter};
/// use bson::doc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     store.insert_one(doc! { "id": 949, "title": "Heat" }, "movies").await?;
///
///     let heat = store.find_one(Some(Filter::eq("id", 949)), "movies").await?;
///     assert!(heat.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents and index metadata
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    ///
    /// ```ignore
    /// use cinelayer_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder().build().await.unwrap();
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let data = match store.get(collection) {
            Some(data) => data,
            None => return Ok(vec![]),
        };

        let mut documents = data
            .matching(query.filter.as_ref())?
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        sort_rows(&mut documents, &query.sort);

        Ok(
            documents
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .map(|document| match &query.projection {
                    Some(fields) => path::include_paths(&document, fields),
                    None => document,
                })
                .collect()
        )
    }

    async fn find_one(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let data = match store.get(collection) {
            Some(data) => data,
            None => return Ok(None),
        };

        Ok(
            data.position(filter.as_ref())?
                .map(|index| data.documents[index].clone())
        )
    }

    async fn exists(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(data) => Ok(data.position(Some(&filter))?.is_some()),
            None => Ok(false),
        }
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;

        match store.get(collection) {
            Some(data) => Ok(data.matching(filter.as_ref())?.len() as u64),
            None => Ok(0),
        }
    }

    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let data = store
            .entry(collection.to_string())
            .or_default();

        data.check_unique(&document, None, collection)?;
        data.documents.push(document);

        Ok(())
    }

    async fn update_one(&self, filter: Expr, update: Update, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        let mut store = self.store.write().await;
        let data = match store.get_mut(collection) {
            Some(data) => data,
            None => return Ok(UpdateOutcome::default()),
        };

        let Some(index) = data.position(Some(&filter))? else {
            return Ok(UpdateOutcome::default());
        };

        let mut updated = data.documents[index].clone();
        for (field, value) in update.assignments() {
            path::set_path(&mut updated, field, value.clone());
        }

        if updated == data.documents[index] {
            return Ok(UpdateOutcome { matched: 1, modified: 0 });
        }

        data.check_unique(&updated, Some(index), collection)?;
        data.documents[index] = updated;

        Ok(UpdateOutcome { matched: 1, modified: 1 })
    }

    async fn delete(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let data = match store.get_mut(collection) {
            Some(data) => data,
            None => return Ok(0),
        };

        let flags = DocumentEvaluator::match_flags(data.documents.iter(), &filter)?;
        let before = data.documents.len();

        let mut flags = flags.into_iter();
        data.documents.retain(|_| !flags.next().unwrap_or(false));

        Ok((before - data.documents.len()) as u64)
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let rows = {
            let store = self.store.read().await;
            match store.get(collection) {
                Some(data) => data.documents.clone(),
                None => return Ok(vec![]),
            }
        };

        PipelineExecutor::new(rows).run(&pipeline)
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let data = store
            .entry(collection.to_string())
            .or_default();

        if !unique || data.unique_fields.iter().any(|existing| existing == field) {
            return Ok(());
        }

        let mut seen = CollectionData {
            documents: Vec::new(),
            unique_fields: vec![field.to_string()],
        };
        for document in &data.documents {
            seen.check_unique(document, None, collection)?;
            seen.documents.push(document.clone());
        }

        data.unique_fields.push(field.to_string());
        tracing::debug!(collection, field, "created unique index");

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        if self.store.write().await.remove(name).is_some() {
            tracing::debug!(collection = name, "dropped collection");
        }

        Ok(())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use cinelayer_memory::InMemoryStore;
/// use cinelayer_core::backend::StoreBackendBuilder;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryStore::builder().build().await.unwrap();
/// }
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use cinelayer_core::{
        pipeline::{Accumulator, GroupKey},
        query::{Filter, QueryBuilder, Sort, SortDirection},
    };

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();

        for document in [
            doc! { "id": 1, "title": "Heat", "release_date": "1995-12-15", "genres": [ { "name": "Crime" } ] },
            doc! { "id": 2, "title": "Ronin", "release_date": "1998-09-25", "genres": [ { "name": "Action" } ] },
            doc! { "id": 3, "title": "Casino", "release_date": "1995-11-22", "genres": [ { "name": "Crime" } ] },
        ] {
            store.insert_one(document, "movies").await.unwrap();
        }

        store
    }

    #[tokio::test]
    async fn find_sorts_paginates_and_projects() {
        let store = seeded().await;
        let query = QueryBuilder::new()
            .sort("release_date", SortDirection::Desc)
            .offset(1)
            .limit(1)
            .project(["title"])
            .build();

        let found = store.find(query, "movies").await.unwrap();

        assert_eq!(found, vec![doc! { "title": "Heat" }]);
    }

    #[tokio::test]
    async fn missing_collection_reads_empty() {
        let store = InMemoryStore::new();

        assert!(store.find(Query::default(), "movies").await.unwrap().is_empty());
        assert_eq!(store.count(None, "movies").await.unwrap(), 0);
        assert!(!store.exists(Filter::eq("id", 1), "movies").await.unwrap());
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let store = seeded().await;
        store.add_index("movies", "id", true).await.unwrap();

        let result = store.insert_one(doc! { "id": 2_i64, "title": "Again" }, "movies").await;

        assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
        assert_eq!(store.count(None, "movies").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unique_index_over_existing_duplicates_fails() {
        let store = seeded().await;
        store.insert_one(doc! { "id": 1, "title": "Heat (copy)" }, "movies").await.unwrap();

        let result = store.add_index("movies", "id", true).await;

        assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
    }

    #[tokio::test]
    async fn update_merges_nested_fields() {
        let store = seeded().await;
        let update = Update::set("tags.queued", true).unwrap();

        let outcome = store.update_one(Filter::eq("id", 2), update.clone(), "movies").await.unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let again = store.update_one(Filter::eq("id", 2), update, "movies").await.unwrap();
        assert_eq!(again, UpdateOutcome { matched: 1, modified: 0 });

        let ronin = store.find_one(Some(Filter::eq("id", 2)), "movies").await.unwrap().unwrap();
        assert_eq!(ronin.get_document("tags").unwrap(), &doc! { "queued": true });
    }

    #[tokio::test]
    async fn update_without_match_reports_nothing() {
        let store = seeded().await;
        let update = Update::set("watched", true).unwrap();

        let outcome = store.update_one(Filter::eq("id", 99), update, "movies").await.unwrap();

        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn delete_removes_every_match() {
        let store = seeded().await;

        let removed = store.delete(Filter::regex("release_date", "^1995", false), "movies").await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.count(None, "movies").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn aggregate_runs_over_a_snapshot() {
        let store = seeded().await;
        let pipeline = Pipeline::new()
            .unwind("genres")
            .group(GroupKey::field("genres.name"), [("count", Accumulator::count())])
            .sort([Sort::desc("count")]);

        let rows = store.aggregate(pipeline, "movies").await.unwrap();

        assert_eq!(rows, vec![
            doc! { "_id": "Crime", "count": 2 },
            doc! { "_id": "Action", "count": 1 },
        ]);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryStore::builder().build().await.unwrap();
        let clone = store.clone();

        clone.insert_one(doc! { "id": 5 }, "movies").await.unwrap();

        assert_eq!(store.count(None, "movies").await.unwrap(), 1);

        store.drop_collection("movies").await.unwrap();
        store.drop_collection("movies").await.unwrap();
        assert_eq!(clone.count(None, "movies").await.unwrap(), 0);
    }
}
