//! MongoDB backend implementation for cinelayer.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait,
//! translating filter expressions, sort/projection options and aggregation
//! pipelines into MongoDB's native syntax.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! cinelayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Native queries** - Filters, regex search, sorting and paging run in MongoDB's query engine
//! - **Aggregation** - Pipelines are executed server-side
//! - **Unique indexes** - Duplicate key violations surface as `DocumentAlreadyExists`
//!
//! # Example
//!
//! ```ignore
//! use cinelayer::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "cinelayer")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as cinelayer_mongodb;

mod pipeline;
mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
