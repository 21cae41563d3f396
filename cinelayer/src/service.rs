//! The movie catalog service.
//!
//! [`MovieService`] owns one collection handle on a [`StoreBackend`] and exposes
//! the catalog operations: lookups, paginated queries, writes, tagging, search,
//! and the reporting aggregations.
//!
//! # Example
//!
//! ```ignore
//! use cinelayer::{prelude::*, memory::InMemoryStore};
//!
//! let movies = MovieService::new(InMemoryStore::new());
//! movies.insert(Movie::new(949, "Heat")).await?;
//!
//! let recent = movies.query(None, None, None, None).thin().await?;
//! let heat = movies.get_by_id("949").await?;
//! ```

use bson::{Bson, DateTime, Document as BsonDocument};

use cinelayer_core::{
    backend::{StoreBackend, UpdateOutcome},
    collection::TypedCollection,
    document::Projection,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Filter, Query, QueryBuilder, Sort, SortDirection},
    update::Update,
};

use crate::{
    aggregates::{self, GenreWatchedCount},
    config::MovieServiceConfig,
    error::{MovieError, MovieResult},
    models::{ActorCount, GenreCount, IntoMovieId, Movie, SearchResults, Tag, ThinMovie, YearCount},
    search::search_filter,
    stats::{GenreStat, GenreWatchRow, LibraryStats, StatsOptions, reduce_genre_stats},
};

/// Logs a store failure at the service boundary and wraps it.
fn store_failure(operation: &'static str, collection: &str, error: DocumentStoreError) -> MovieError {
    tracing::error!(operation, collection, %error, "store operation failed");
    MovieError::Store(error)
}

/// Data-access layer for the movie collection.
#[derive(Debug)]
pub struct MovieService<B: StoreBackend> {
    movies: TypedCollection<B, Movie>,
    config: MovieServiceConfig,
}

impl<B: StoreBackend> MovieService<B> {
    /// Creates a service over the default `movies` collection.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, MovieServiceConfig::default())
    }

    pub fn with_config(backend: B, config: MovieServiceConfig) -> Self {
        Self {
            movies: TypedCollection::new(config.collection.clone(), backend),
            config,
        }
    }

    pub fn config(&self) -> &MovieServiceConfig {
        &self.config
    }

    /// The collection handle, for operations the service does not wrap.
    pub fn collection(&self) -> &TypedCollection<B, Movie> {
        &self.movies
    }

    fn logged<T>(&self, operation: &'static str, result: DocumentStoreResult<T>) -> MovieResult<T> {
        result.map_err(|error| store_failure(operation, self.movies.name(), error))
    }

    /// The first movie matching the filter (any movie when `None`).
    pub async fn find_one(&self, filter: Option<Expr>) -> MovieResult<Option<Movie>> {
        self.logged("find_one", self.movies.find_one(filter).await)
    }

    /// Looks a movie up by id. String ids are parsed first.
    pub async fn get_by_id(&self, id: impl IntoMovieId) -> MovieResult<Option<Movie>> {
        let id = id.into_movie_id()?;

        self.find_one(Some(Filter::eq("id", id))).await
    }

    pub async fn check_if_exists(&self, filter: Expr) -> MovieResult<bool> {
        self.logged("check_if_exists", self.movies.exists(filter).await)
    }

    /// Builds a paginated query without running it.
    ///
    /// Defaults: newest additions first (`addedToDb` descending), no skip, and the
    /// configured page size. Results use the thin view unless
    /// [`MovieQuery::full`] is requested.
    pub fn query(
        &self,
        filter: Option<Expr>,
        sort: Option<Vec<Sort>>,
        skip: Option<usize>,
        limit: Option<usize>,
    ) -> MovieQuery<'_, B> {
        let query = QueryBuilder::new()
            .maybe_filter(filter)
            .sort_by(sort.unwrap_or_else(|| vec![Sort::desc("addedToDb")]))
            .offset(skip.unwrap_or(0))
            .limit(limit.unwrap_or(self.config.page_size))
            .project(ThinMovie::field_list())
            .build();

        MovieQuery { movies: &self.movies, query }
    }

    /// Stores a new movie, stamping `addedToDb` with the current time.
    ///
    /// Fails with [`MovieError::DuplicateMovie`] when the id is taken. The check
    /// runs before the write, so two concurrent inserts of one id can both pass it;
    /// after [`ensure_indexes`](Self::ensure_indexes) the store rejects the second.
    pub async fn insert(&self, mut movie: Movie) -> MovieResult<Movie> {
        let id = movie.id;

        if self.check_if_exists(Filter::eq("id", id)).await? {
            tracing::warn!(id, "movie already exists");
            return Err(MovieError::DuplicateMovie(id));
        }

        movie.added_to_db = Some(DateTime::now());

        match self.movies.insert(&movie).await {
            Ok(()) => {
                tracing::debug!(id, title = %movie.title, "inserted movie");
                Ok(movie)
            },
            Err(DocumentStoreError::DocumentAlreadyExists(_, _)) => {
                tracing::warn!(id, "movie already exists");
                Err(MovieError::DuplicateMovie(id))
            },
            Err(error) => Err(store_failure("insert", self.movies.name(), error)),
        }
    }

    /// Merges the update into the movie with the given id.
    pub async fn update(&self, id: impl IntoMovieId, update: Update) -> MovieResult<UpdateOutcome> {
        let id = id.into_movie_id()?;
        let outcome = self.logged("update", self.movies.update_one(Filter::eq("id", id), update).await)?;

        tracing::debug!(id, matched = outcome.matched, modified = outcome.modified, "updated movie");
        Ok(outcome)
    }

    /// Deletes the movie with the given id and returns how many documents went away.
    pub async fn remove(&self, id: impl IntoMovieId) -> MovieResult<u64> {
        let id = id.into_movie_id()?;
        let removed = self.logged("remove", self.movies.delete(Filter::eq("id", id)).await)?;

        tracing::debug!(id, removed, "removed movie");
        Ok(removed)
    }

    /// Writes `value` under the tag's key in the movie's tag map.
    pub async fn set_tag(&self, id: impl IntoMovieId, tag: Tag, value: impl Into<Bson>) -> MovieResult<UpdateOutcome> {
        let update = Update::set(tag.path()?, value)?;

        self.update(id, update).await
    }

    pub async fn toggle_watched(&self, id: impl IntoMovieId, watched: bool) -> MovieResult<UpdateOutcome> {
        self.update(id, Update::set("watched", watched)?).await
    }

    /// Every movie crediting the actor, newest release first.
    pub async fn filmography(&self, actor_id: impl IntoMovieId) -> MovieResult<Vec<ThinMovie>> {
        let actor_id = actor_id.into_movie_id()?;

        self.query(
            Some(Filter::eq("casts.cast.id", actor_id)),
            Some(vec![Sort::desc("release_date")]),
            Some(0),
            Some(self.config.filmography_limit),
        )
        .thin()
        .await
    }

    /// Movies whose title starts with the term or has a word starting with it.
    pub async fn search_titles(&self, term: &str, limit: Option<usize>) -> MovieResult<Vec<ThinMovie>> {
        self.query(
            Some(search_filter("title", term)),
            None,
            None,
            Some(limit.unwrap_or(self.config.search_limit)),
        )
        .thin()
        .await
    }

    /// Actors whose name starts with the term or has a word starting with it.
    pub async fn search_actors(&self, term: &str, limit: Option<usize>) -> MovieResult<Vec<ActorCount>> {
        let pipeline = aggregates::search_actors(term, limit.unwrap_or(self.config.search_limit));

        self.logged("search_actors", self.movies.aggregate_as(pipeline).await)
    }

    /// Title and actor search for one term, run concurrently.
    ///
    /// `limit` caps each list separately and falls back to the configured search limit.
    pub async fn search(&self, term: &str, limit: Option<usize>) -> MovieResult<SearchResults> {
        let (movies, actors) = futures::try_join!(
            self.search_titles(term, limit),
            self.search_actors(term, limit),
        )?;

        Ok(SearchResults { movies, actors })
    }

    /// Movies carrying a non-null value for the tag, highest value first.
    pub async fn tagged(&self, tag: &Tag) -> MovieResult<Vec<ThinMovie>> {
        let path = tag.path()?;
        let query = QueryBuilder::new()
            .filter(Filter::ne(path.as_str(), Bson::Null))
            .sort(path.as_str(), SortDirection::Desc)
            .project(ThinMovie::field_list())
            .build();

        MovieQuery { movies: &self.movies, query }
            .thin()
            .await
    }

    pub async fn favorites(&self) -> MovieResult<Vec<ThinMovie>> {
        self.tagged(&Tag::Favorited).await
    }

    pub async fn queue(&self) -> MovieResult<Vec<ThinMovie>> {
        self.tagged(&Tag::Queued).await
    }

    /// Movies per genre, using the configured watched sub-count mode.
    pub async fn genres(&self) -> MovieResult<Vec<GenreCount>> {
        self.genres_with(self.config.genre_watched).await
    }

    pub async fn genres_with(&self, watched: GenreWatchedCount) -> MovieResult<Vec<GenreCount>> {
        self.logged("genres", self.movies.aggregate_as(aggregates::genres(watched)).await)
    }

    /// The most credited actors; `None` uses the configured limit.
    pub async fn actors(&self, limit: Option<usize>) -> MovieResult<Vec<ActorCount>> {
        let pipeline = aggregates::actors(limit.unwrap_or(self.config.actor_limit));

        self.logged("actors", self.movies.aggregate_as(pipeline).await)
    }

    pub async fn years(&self) -> MovieResult<Vec<YearCount>> {
        self.logged("years", self.movies.aggregate_as(aggregates::years()).await)
    }

    /// Watched/unwatched totals and ratio per genre.
    pub async fn genre_stats(&self) -> MovieResult<Vec<GenreStat>> {
        let rows = self.logged(
            "genre_stats",
            self.movies.aggregate_as::<GenreWatchRow>(aggregates::genre_stats()).await,
        )?;

        Ok(reduce_genre_stats(rows))
    }

    /// Library totals, plus the breakdowns selected in `options`. Sub-requests run concurrently.
    pub async fn stats(&self, options: StatsOptions) -> MovieResult<LibraryStats> {
        let total = async {
            self.logged("stats", self.movies.count(None).await)
        };
        let watched = async {
            self.logged("stats", self.movies.count(Some(Filter::eq("watched", true))).await)
        };
        let genres = async {
            if options.genres {
                self.genre_stats().await.map(Some)
            } else {
                Ok(None)
            }
        };
        let years = async {
            if options.years {
                self.years().await.map(Some)
            } else {
                Ok(None)
            }
        };

        let (total, watched, genres, years) = futures::try_join!(total, watched, genres, years)?;

        Ok(LibraryStats {
            total,
            watched,
            unwatched: total.saturating_sub(watched),
            genres,
            years,
        })
    }

    /// Creates a unique index on `id`, so the store itself rejects duplicate inserts.
    pub async fn ensure_indexes(&self) -> MovieResult<()> {
        self.logged("ensure_indexes", self.movies.add_index("id", true).await)
    }

    /// Releases the backend.
    pub async fn shutdown(self) -> MovieResult<()> {
        let collection = self.movies.name().to_string();

        self.movies
            .into_backend()
            .shutdown()
            .await
            .map_err(|error| store_failure("shutdown", &collection, error))
    }
}

/// A movie query that has not run yet.
///
/// Nothing touches the store until one of [`thin`](Self::thin), [`full`](Self::full)
/// or [`raw`](Self::raw) is awaited.
#[derive(Debug)]
pub struct MovieQuery<'a, B: StoreBackend> {
    movies: &'a TypedCollection<B, Movie>,
    query: Query,
}

impl<'a, B: StoreBackend> MovieQuery<'a, B> {
    /// The descriptor that will be sent.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Runs the query and returns the list view.
    pub async fn thin(self) -> MovieResult<Vec<ThinMovie>> {
        self.movies
            .find_projected::<ThinMovie>(self.query)
            .await
            .map_err(|error| store_failure("query", self.movies.name(), error))
    }

    /// Runs the query and returns complete movies.
    pub async fn full(self) -> MovieResult<Vec<Movie>> {
        self.movies
            .find(self.query)
            .await
            .map_err(|error| store_failure("query", self.movies.name(), error))
    }

    /// Runs the query and returns the stored documents restricted to the thin fields.
    pub async fn raw(self) -> MovieResult<Vec<BsonDocument>> {
        self.movies
            .untyped()
            .find(self.query)
            .await
            .map_err(|error| store_failure("query", self.movies.name(), error))
    }
}
