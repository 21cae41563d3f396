use std::str::FromStr;

use crate::{
    aggregates::GenreWatchedCount,
    error::{MovieError, MovieResult},
};

/// Settings of a [`MovieService`](crate::service::MovieService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieServiceConfig {
    pub collection: String,
    /// Default limit of [`MovieService::query`](crate::service::MovieService::query).
    pub page_size: usize,
    pub filmography_limit: usize,
    pub actor_limit: usize,
    pub search_limit: usize,
    pub genre_watched: GenreWatchedCount,
}

impl Default for MovieServiceConfig {
    fn default() -> Self {
        Self {
            collection: "movies".to_string(),
            page_size: 20,
            filmography_limit: 2000,
            actor_limit: 200,
            search_limit: 5,
            genre_watched: GenreWatchedCount::Omit,
        }
    }
}

impl MovieServiceConfig {
    /// Reads `CINELAYER_*` variables, using defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::Config`] when a variable is set but cannot be parsed.
    pub fn from_env() -> MovieResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MovieResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            collection: lookup("CINELAYER_COLLECTION")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.collection),
            page_size: limit(&lookup, "CINELAYER_PAGE_SIZE", defaults.page_size)?,
            filmography_limit: limit(&lookup, "CINELAYER_FILMOGRAPHY_LIMIT", defaults.filmography_limit)?,
            actor_limit: limit(&lookup, "CINELAYER_ACTOR_LIMIT", defaults.actor_limit)?,
            search_limit: limit(&lookup, "CINELAYER_SEARCH_LIMIT", defaults.search_limit)?,
            genre_watched: match lookup("CINELAYER_GENRE_WATCHED") {
                Some(value) => GenreWatchedCount::from_str(&value)?,
                None => defaults.genre_watched,
            },
        })
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_filmography_limit(mut self, limit: usize) -> Self {
        self.filmography_limit = limit;
        self
    }

    pub fn with_actor_limit(mut self, limit: usize) -> Self {
        self.actor_limit = limit;
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn with_genre_watched(mut self, mode: GenreWatchedCount) -> Self {
        self.genre_watched = mode;
        self
    }
}

/// A positive integer variable.
fn limit(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: usize) -> MovieResult<usize> {
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };

    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(MovieError::Config(format!("{name} must be a positive integer, got {raw:?}"))),
    }
}
