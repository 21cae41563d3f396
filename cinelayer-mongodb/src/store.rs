use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, doc};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions},
};
use cinelayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Expr, Query},
    update::Update,
};

use crate::{pipeline::MongoPipelineTranslator, query::MongoQueryTranslator};

const DUPLICATE_KEY: i32 = 11000;

/// A [`StoreBackend`] over one MongoDB database.
///
/// Stored documents keep their server-assigned `_id`, but it is stripped from
/// everything returned.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    /// Connects lazily: the builder parses `dsn` and the driver dials on first use.
    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn handle(&self, collection: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection)
    }

    /// Drops the server-generated `_id`; movies are addressed by their numeric `id`.
    fn restore_document(mut document: Document) -> Document {
        document.remove("_id");
        document
    }
}

fn backend_error(error: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(error.to_string())
}

/// Maps a driver error, reporting unique-index violations as `DocumentAlreadyExists`.
fn write_error(error: MongoError, collection: &str) -> DocumentStoreError {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == DUPLICATE_KEY => {
            DocumentStoreError::DocumentAlreadyExists(failure.message.clone(), collection.to_string())
        },
        _ => backend_error(error),
    }
}

/// Paging, sort and projection for a find, or `None` when the limit allows no documents.
fn find_options(query: &Query) -> Option<FindOptions> {
    let mut options = FindOptions::default();

    match query.limit {
        Some(0) => return None,
        Some(limit) => options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX)),
        None => {},
    }
    if let Some(skip) = query.offset {
        options.skip = Some(u64::try_from(skip).unwrap_or(u64::MAX));
    }
    options.sort = MongoQueryTranslator::sort(query);
    options.projection = MongoQueryTranslator::projection(query);

    Some(options)
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let filter = MongoQueryTranslator::filter(query.filter.as_ref())?;

        // The server reads a zero limit as "unbounded".
        let Some(options) = find_options(&query) else {
            tracing::debug!(collection, %filter, "find with limit 0 skipped");
            return Ok(Vec::new());
        };
        tracing::debug!(collection, %filter, "find");

        Ok(
            self.handle(collection)
                .find(filter)
                .with_options(options)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(Self::restore_document)
                .collect()
        )
    }

    async fn find_one(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<Option<Document>> {
        Ok(
            self.handle(collection)
                .find_one(MongoQueryTranslator::filter(filter.as_ref())?)
                .await
                .map_err(backend_error)?
                .map(Self::restore_document)
        )
    }

    async fn exists(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool> {
        Ok(
            self.handle(collection)
                .find_one(MongoQueryTranslator::filter(Some(&filter))?)
                .projection(doc! { "_id": 1 })
                .await
                .map_err(backend_error)?
                .is_some()
        )
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.handle(collection)
            .count_documents(MongoQueryTranslator::filter(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn insert_one(&self, document: Document, collection: &str) -> DocumentStoreResult<()> {
        self.handle(collection)
            .insert_one(document)
            .await
            .map_err(|e| write_error(e, collection))?;

        Ok(())
    }

    async fn update_one(&self, filter: Expr, update: Update, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        if update.is_empty() {
            let matched = self.exists(filter, collection).await?;
            return Ok(UpdateOutcome { matched: matched as u64, modified: 0 });
        }

        let assignments = update
            .assignments()
            .iter()
            .cloned()
            .collect::<Document>();

        let result = self.handle(collection)
            .update_one(
                MongoQueryTranslator::filter(Some(&filter))?,
                doc! { "$set": assignments },
            )
            .await
            .map_err(|e| write_error(e, collection))?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        Ok(
            self.handle(collection)
                .delete_many(MongoQueryTranslator::filter(Some(&filter))?)
                .await
                .map_err(backend_error)?
                .deleted_count
        )
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let stages = MongoPipelineTranslator::translate(&pipeline)?;
        tracing::debug!(collection, stages = stages.len(), "aggregate");

        self.handle(collection)
            .aggregate(stages)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.handle(collection)
            .create_index(
                IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                    .unique(unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(|e| write_error(e, collection))?;

        tracing::debug!(collection, field, unique, "ensured index");

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.handle(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        tracing::debug!(database = %self.database, "closing client");
        self.client.shutdown().await;

        Ok(())
    }
}

/// Builds a [`MongoDbStore`] from a connection string.
#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        tracing::info!(database = %self.database, "connecting to document database");

        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
