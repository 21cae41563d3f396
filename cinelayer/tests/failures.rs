mod common;

use async_trait::async_trait;
use cinelayer::{
    bson::Document as BsonDocument,
    pipeline::Pipeline,
    prelude::*,
};
use common::init_tracing;

/// How [`BrokenStore`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Breakage {
    /// Every call fails as if the server were unreachable.
    Unreachable,
    /// Reads succeed on an empty collection; writes fail.
    ReadOnly,
    /// Reads succeed on an empty collection; inserts hit a unique index.
    DuplicateOnWrite,
}

#[derive(Debug)]
struct BrokenStore {
    breakage: Breakage,
}

impl BrokenStore {
    fn new(breakage: Breakage) -> Self {
        Self { breakage }
    }

    fn refused<T>(&self) -> DocumentStoreResult<T> {
        Err(DocumentStoreError::Backend("connection refused".to_string()))
    }

    fn read<T: Default>(&self) -> DocumentStoreResult<T> {
        match self.breakage {
            Breakage::Unreachable => self.refused(),
            Breakage::ReadOnly | Breakage::DuplicateOnWrite => Ok(T::default()),
        }
    }
}

#[async_trait]
impl StoreBackend for BrokenStore {
    async fn find(&self, _query: Query, _collection: &str) -> DocumentStoreResult<Vec<BsonDocument>> {
        self.read()
    }

    async fn find_one(&self, _filter: Option<Expr>, _collection: &str) -> DocumentStoreResult<Option<BsonDocument>> {
        self.read()
    }

    async fn exists(&self, _filter: Expr, _collection: &str) -> DocumentStoreResult<bool> {
        self.read()
    }

    async fn count(&self, _filter: Option<Expr>, _collection: &str) -> DocumentStoreResult<u64> {
        self.read()
    }

    async fn insert_one(&self, _document: BsonDocument, collection: &str) -> DocumentStoreResult<()> {
        match self.breakage {
            Breakage::DuplicateOnWrite => Err(DocumentStoreError::DocumentAlreadyExists(
                "E11000 duplicate key error".to_string(),
                collection.to_string(),
            )),
            _ => self.refused(),
        }
    }

    async fn update_one(&self, _filter: Expr, _update: Update, _collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        self.refused()
    }

    async fn delete(&self, _filter: Expr, _collection: &str) -> DocumentStoreResult<u64> {
        self.refused()
    }

    async fn aggregate(&self, _pipeline: Pipeline, _collection: &str) -> DocumentStoreResult<Vec<BsonDocument>> {
        self.read()
    }

    async fn add_index(&self, _collection: &str, _field: &str, _unique: bool) -> DocumentStoreResult<()> {
        self.refused()
    }

    async fn drop_collection(&self, _name: &str) -> DocumentStoreResult<()> {
        self.refused()
    }
}

fn service(breakage: Breakage) -> MovieService<BrokenStore> {
    init_tracing();
    MovieService::new(BrokenStore::new(breakage))
}

fn is_backend_failure<T>(result: &MovieResult<T>) -> bool {
    matches!(result, Err(MovieError::Store(DocumentStoreError::Backend(_))))
}

#[tokio::test]
async fn unreachable_store_errors_pass_through() {
    let movies = service(Breakage::Unreachable);

    assert!(is_backend_failure(&movies.get_by_id(949).await));
    assert!(is_backend_failure(&movies.insert(Movie::new(949, "Heat")).await));
    assert!(is_backend_failure(&movies.stats(StatsOptions::default()).await));
    assert!(is_backend_failure(&movies.stats(StatsOptions::all()).await));
    assert!(is_backend_failure(&movies.query(None, None, None, None).thin().await));
    assert!(is_backend_failure(&movies.actors(None).await));
    assert!(is_backend_failure(&movies.search("heat", None).await));
}

#[tokio::test]
async fn failed_write_after_existence_check_passes_through() {
    let movies = service(Breakage::ReadOnly);

    assert_eq!(movies.get_by_id(949).await.unwrap(), None);
    assert!(is_backend_failure(&movies.insert(Movie::new(949, "Heat")).await));
    assert!(is_backend_failure(&movies.toggle_watched(949, true).await));
    assert!(is_backend_failure(&movies.remove(949).await));
    assert!(is_backend_failure(&movies.ensure_indexes().await));
}

#[tokio::test]
async fn unique_index_violation_reports_duplicate_movie() {
    let movies = service(Breakage::DuplicateOnWrite);

    let result = movies.insert(Movie::new(949, "Heat")).await;

    assert!(matches!(result, Err(MovieError::DuplicateMovie(949))));
}

#[tokio::test]
async fn store_errors_keep_their_message() {
    let movies = service(Breakage::Unreachable);

    let error = movies.get_by_id(949).await.unwrap_err();

    assert!(error.to_string().contains("connection refused"));
}
