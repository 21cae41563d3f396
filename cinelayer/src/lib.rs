//! cinelayer: a thin data-access layer for a movie catalog kept in a document database.
//!
//! This crate is the entry point of the workspace. It provides the movie models,
//! the [`MovieService`](service::MovieService) with its queries, writes, search and
//! reports, and re-exports the core document layer and the storage backends.
//!
//! # Features
//!
//! - **Typed movie records** - Full [`Movie`](models::Movie) records and the projected [`ThinMovie`](models::ThinMovie) list view
//! - **Lazy paginated queries** - [`MovieQuery`](service::MovieQuery) runs only when asked for thin, full or raw output
//! - **Search** - Prefix and word-start matching on titles and actor names
//! - **Reports** - Genre, actor, year and watch-ratio aggregations
//! - **Multiple backends** - In-memory storage and MongoDB (behind the `mongodb` feature)
//!
//! # Quick Start
//!
//! ```ignore
//! use cinelayer::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let movies = MovieService::new(InMemoryStore::builder().build().await?);
//!     movies.ensure_indexes().await?;
//!
//!     movies.insert(
//!         Movie::new(949, "Heat")
//!             .with_release_date("1995-12-15")
//!             .with_genres([Genre::new(80, "Crime")]),
//!     ).await?;
//!
//!     movies.set_tag(949, Tag::Favorited, bson::DateTime::now()).await?;
//!
//!     let favorites = movies.favorites().await?;
//!     let found = movies.search("hea", None).await?;
//!     let stats = movies.stats(StatsOptions::all()).await?;
//!
//!     println!("{favorites:?} {found:?} {stats:?}");
//!
//!     movies.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! [`MovieServiceConfig::from_env`](config::MovieServiceConfig::from_env) reads
//! `CINELAYER_COLLECTION`, `CINELAYER_PAGE_SIZE`, `CINELAYER_FILMOGRAPHY_LIMIT`,
//! `CINELAYER_ACTOR_LIMIT`, `CINELAYER_SEARCH_LIMIT` and `CINELAYER_GENRE_WATCHED`.
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod aggregates;
pub mod config;
pub mod error;
pub mod models;
pub mod prelude;
pub mod search;
pub mod service;
pub mod stats;

pub use cinelayer_core::{backend, collection, document, pipeline, query, update};
pub use cinelayer_core::error as store_error;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use cinelayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use cinelayer_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
