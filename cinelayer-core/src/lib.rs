//! Core of the cinelayer project: a thin, backend-agnostic document access layer.
//!
//! This crate provides:
//!
//! - **Document traits** ([`document`]) - Full documents and projected views
//! - **Store backend abstraction** ([`backend`]) - The async trait every backend implements
//! - **Query and filtering API** ([`query`]) - Filter expressions, projection, sort and pagination
//! - **Partial updates** ([`update`]) - Validated field assignments
//! - **Aggregation pipelines** ([`pipeline`]) - Stage descriptors and a visitor for backends
//! - **Collection handles** ([`collection`]) - Untyped and typed access to one collection
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use cinelayer_core::{collection::TypedCollection, document::Document, query::Filter};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Review {
//!     pub id: i64,
//!     pub body: String,
//! }
//!
//! impl Document for Review {
//!     fn collection_name() -> &'static str {
//!         "reviews"
//!     }
//! }
//!
//! let reviews = TypedCollection::<_, Review>::with_default_name(backend);
//! let first = reviews.find_one(Some(Filter::eq("id", 1))).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as cinelayer_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod update;
