//! In-memory document storage backend for cinelayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! testing, and small catalogs.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion-ordered storage** - Unsorted reads return documents in the order they were added
//! - **Query support** - Filtering (including case-insensitive regex), multi-key sorting, pagination and projection
//! - **Unique indexes** - Duplicate values on an indexed field are rejected
//! - **Aggregation** - Project, unwind, group, match, sort and limit stages
//!
//! # Quick Start
//!
//! ```ignore
//! use cinelayer_core::{backend::StoreBackendBuilder, collection::Collection};
//! use cinelayer_memory::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let movies = Collection::new("movies", backend);
//!
//!     movies.insert_one(bson::doc! { "id": 949, "title": "Heat" }).await?;
//!     assert_eq!(movies.count(None).await?, 1);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as cinelayer_memory;

mod evaluator;
mod executor;
mod path;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
