//! Convenient re-exports of commonly used types from cinelayer.
//!
//! ```ignore
//! use cinelayer::prelude::*;
//! ```

pub use cinelayer_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    collection::{Collection, TypedCollection},
    document::{Document, DocumentExt, Projection},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    update::Update,
};

pub use crate::{
    aggregates::GenreWatchedCount,
    config::MovieServiceConfig,
    error::{MovieError, MovieResult},
    models::{ActorCount, ActorKey, CastMember, Casts, Genre, GenreCount, IntoMovieId, Movie, SearchResults, Tag, ThinMovie, YearCount},
    service::{MovieQuery, MovieService},
    stats::{GenreStat, LibraryStats, StatsOptions},
};
