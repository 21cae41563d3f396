//! The reporting pipelines run against the movie collection.
//!
//! Each function builds a fresh [`Pipeline`]; the service runs it and decodes
//! the rows into the types in [`models`](crate::models).

use std::{fmt, str::FromStr};

use cinelayer_core::{
    pipeline::{Accumulator, Expression, GroupKey, Pipeline, ProjectField},
    query::Sort,
};

use crate::{error::MovieError, search::search_filter};

const ACTOR_FIELDS: [&str; 4] = [
    "casts.cast.name",
    "casts.cast.id",
    "casts.cast.profile_path",
    "title",
];

/// How the genre report computes its `watched` sub-count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenreWatchedCount {
    /// No sub-count.
    #[default]
    Omit,
    /// Sums the constant `0`: what older catalogs reported, kept for compatibility.
    LegacyConstant,
    /// Counts the movies of each genre whose `watched` flag is `true`.
    PerDocument,
}

impl FromStr for GenreWatchedCount {
    type Err = MovieError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "omit" => Ok(GenreWatchedCount::Omit),
            "legacy" => Ok(GenreWatchedCount::LegacyConstant),
            "per-document" => Ok(GenreWatchedCount::PerDocument),
            other => Err(MovieError::Config(format!(
                "unknown genre watched-count mode {other:?} (expected omit, legacy or per-document)"
            ))),
        }
    }
}

impl fmt::Display for GenreWatchedCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenreWatchedCount::Omit => "omit",
            GenreWatchedCount::LegacyConstant => "legacy",
            GenreWatchedCount::PerDocument => "per-document",
        })
    }
}

/// `watched == true ? 1 : 0`, evaluated per row.
fn watched_flag() -> Expression {
    Expression::cond(
        Expression::eq(Expression::field("watched"), Expression::literal(true)),
        Expression::literal(1_i32),
        Expression::literal(0_i32),
    )
}

/// Movies per genre name, most common first.
pub fn genres(watched: GenreWatchedCount) -> Pipeline {
    let mut fields = vec!["genres", "title"];
    let mut accumulators = vec![("count", Accumulator::count())];

    match watched {
        GenreWatchedCount::Omit => {},
        GenreWatchedCount::LegacyConstant => {
            fields.push("watched");
            accumulators.push(("watched", Accumulator::sum(Expression::literal(0_i32))));
        },
        GenreWatchedCount::PerDocument => {
            fields.push("watched");
            accumulators.push(("watched", Accumulator::sum(watched_flag())));
        },
    }

    Pipeline::new()
        .project_fields(fields)
        .unwind("genres")
        .group(GroupKey::field("genres.name"), accumulators)
        .sort([Sort::desc("count")])
}

fn actor_groups() -> Pipeline {
    Pipeline::new()
        .project_fields(ACTOR_FIELDS)
        .unwind("casts.cast")
        .group(
            GroupKey::compound([
                ("id", Expression::field("casts.cast.id")),
                ("name", Expression::field("casts.cast.name")),
                ("profile_path", Expression::field("casts.cast.profile_path")),
            ]),
            [("count", Accumulator::count())],
        )
}

/// The `limit` actors credited in the most movies.
pub fn actors(limit: usize) -> Pipeline {
    actor_groups()
        .sort([Sort::desc("count")])
        .limit(limit)
}

/// Actors whose name matches the search term, most credited first.
pub fn search_actors(term: &str, limit: usize) -> Pipeline {
    actor_groups()
        .match_expr(search_filter("_id.name", term))
        .sort([Sort::desc("count")])
        .limit(limit)
}

/// Movies per release year, newest first.
pub fn years() -> Pipeline {
    Pipeline::new()
        .project([(
            "year",
            ProjectField::Computed(Expression::substr(Expression::field("release_date"), 0, 4)),
        )])
        .group(GroupKey::field("year"), [("count", Accumulator::count())])
        .sort([Sort::desc("_id")])
}

/// Movies per (genre, watched flag) pair; see [`reduce_genre_stats`](crate::stats::reduce_genre_stats).
pub fn genre_stats() -> Pipeline {
    Pipeline::new()
        .project_fields(["genres", "title", "watched"])
        .unwind("genres")
        .group(
            GroupKey::compound([
                ("id", Expression::field("genres.name")),
                ("watched", Expression::field("watched")),
            ]),
            [("count", Accumulator::count())],
        )
        .sort([Sort::desc("count")])
}
