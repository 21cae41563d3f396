//! Errors reported by the movie service.

use cinelayer_core::error::DocumentStoreError;
use thiserror::Error;

/// Everything that can go wrong in a [`MovieService`](crate::service::MovieService) call.
///
/// A missing movie is not an error: lookups return `Ok(None)` or an empty list.
#[derive(Error, Debug)]
pub enum MovieError {
    /// A movie with this id is already stored.
    #[error("Movie {0} already exists")]
    DuplicateMovie(i64),
    /// A movie or actor id given as a string did not parse as an integer.
    #[error("Invalid id: {0:?}")]
    InvalidId(String),
    /// A custom tag key that would not address a single field of the tag map.
    #[error("Invalid tag key: {0:?}")]
    InvalidTag(String),
    /// A configuration value could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
    /// The store failed; the underlying error is passed through unchanged.
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// A specialized `Result` type for movie service operations.
pub type MovieResult<T> = Result<T, MovieError>;
