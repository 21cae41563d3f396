//! Movie records, projected views and aggregation rows.
//!
//! Field names follow the stored documents, which use TMDB naming plus the
//! catalog's own `tags`, `watched` and `addedToDb` fields.

use bson::{Bson, DateTime, Document as BsonDocument};
use serde::{Deserialize, Serialize};

use cinelayer_core::document::{Document, Projection};

use crate::error::{MovieError, MovieResult};

/// Fields returned for list and search results.
pub const THIN_FIELDS: [&str; 8] = [
    "id",
    "title",
    "release_date",
    "poster_path",
    "genres",
    "tags",
    "watched",
    "addedToDb",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
}

impl Genre {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self { id: Some(id), name: name.into() }
    }
}

/// One credited actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
}

impl CastMember {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Credits embedded in a movie. Crew entries are kept as stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Casts {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crew: Vec<BsonDocument>,
}

/// A complete movie record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    /// `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub casts: Casts,
    /// Freeform markers such as `favorited` or `queued`, usually holding the time they were set.
    #[serde(default)]
    pub tags: BsonDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched: Option<bool>,
    #[serde(rename = "addedToDb", default, skip_serializing_if = "Option::is_none")]
    pub added_to_db: Option<DateTime>,
}

impl Movie {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_release_date(mut self, release_date: impl Into<String>) -> Self {
        self.release_date = Some(release_date.into());
        self
    }

    pub fn with_genres(mut self, genres: impl IntoIterator<Item = Genre>) -> Self {
        self.genres = genres.into_iter().collect();
        self
    }

    pub fn with_cast(mut self, cast: impl IntoIterator<Item = CastMember>) -> Self {
        self.casts.cast = cast.into_iter().collect();
        self
    }

    pub fn with_watched(mut self, watched: bool) -> Self {
        self.watched = Some(watched);
        self
    }

    pub fn with_tag(mut self, tag: &str, value: impl Into<Bson>) -> Self {
        self.tags.insert(tag, value.into());
        self
    }
}

impl Document for Movie {
    fn collection_name() -> &'static str {
        "movies"
    }
}

/// The list/search view of a movie, restricted to [`THIN_FIELDS`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThinMovie {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub tags: BsonDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched: Option<bool>,
    #[serde(rename = "addedToDb", default, skip_serializing_if = "Option::is_none")]
    pub added_to_db: Option<DateTime>,
}

impl Projection for ThinMovie {
    fn fields() -> &'static [&'static str] {
        &THIN_FIELDS
    }
}

impl From<Movie> for ThinMovie {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            release_date: movie.release_date,
            poster_path: movie.poster_path,
            genres: movie.genres,
            tags: movie.tags,
            watched: movie.watched,
            added_to_db: movie.added_to_db,
        }
    }
}

/// A key in a movie's tag map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Favorited,
    Queued,
    Custom(String),
}

impl Tag {
    /// The key inside the tag map.
    pub fn key(&self) -> &str {
        match self {
            Tag::Favorited => "favorited",
            Tag::Queued => "queued",
            Tag::Custom(key) => key,
        }
    }

    /// The dotted document path of this tag, e.g. `tags.favorited`.
    ///
    /// # Errors
    ///
    /// Returns [`MovieError::InvalidTag`] for custom keys that are empty, contain `.`
    /// or a NUL byte, or start with `$`.
    pub fn path(&self) -> MovieResult<String> {
        let key = self.key();

        if key.is_empty() || key.contains('.') || key.contains('\0') || key.starts_with('$') {
            return Err(MovieError::InvalidTag(key.to_string()));
        }

        Ok(format!("tags.{key}"))
    }
}

/// Conversion of caller-supplied identifiers into numeric movie or actor ids.
///
/// Strings are trimmed and parsed as base-10 integers; anything else is rejected.
pub trait IntoMovieId {
    fn into_movie_id(self) -> MovieResult<i64>;
}

impl IntoMovieId for i64 {
    fn into_movie_id(self) -> MovieResult<i64> {
        Ok(self)
    }
}

impl IntoMovieId for i32 {
    fn into_movie_id(self) -> MovieResult<i64> {
        Ok(i64::from(self))
    }
}

impl IntoMovieId for u32 {
    fn into_movie_id(self) -> MovieResult<i64> {
        Ok(i64::from(self))
    }
}

impl IntoMovieId for &str {
    fn into_movie_id(self) -> MovieResult<i64> {
        self.trim()
            .parse::<i64>()
            .map_err(|_| MovieError::InvalidId(self.to_string()))
    }
}

impl IntoMovieId for String {
    fn into_movie_id(self) -> MovieResult<i64> {
        self.as_str().into_movie_id()
    }
}

impl IntoMovieId for &String {
    fn into_movie_id(self) -> MovieResult<i64> {
        self.as_str().into_movie_id()
    }
}

/// Search results for one term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub movies: Vec<ThinMovie>,
    pub actors: Vec<ActorCount>,
}

/// Number of movies in one genre, with the watched sub-count when requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreCount {
    #[serde(rename = "_id")]
    pub name: Option<String>,
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched: Option<i64>,
}

/// Grouping key of the actor aggregations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorKey {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

/// Number of movies an actor appears in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorCount {
    #[serde(rename = "_id")]
    pub actor: ActorKey,
    pub count: i64,
}

/// Number of movies released in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCount {
    /// The first four characters of `release_date`; empty when the date is missing.
    #[serde(rename = "_id")]
    pub year: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinelayer_core::document::DocumentExt;

    #[test]
    fn movie_serializes_stored_field_names() {
        let movie = Movie::new(949, "Heat")
            .with_release_date("1995-12-15")
            .with_genres([Genre::new(80, "Crime")])
            .with_watched(true);

        let document = movie.to_document().unwrap();

        assert_eq!(document.get_i64("id").unwrap(), 949);
        assert_eq!(document.get_str("release_date").unwrap(), "1995-12-15");
        assert!(document.get("addedToDb").is_none());
        assert!(document.get("poster_path").is_none());
        assert_eq!(Movie::from_document(document).unwrap(), movie);
    }

    #[test]
    fn movie_converts_through_json() {
        let movie = Movie::new(603, "The Matrix").with_release_date("1999-03-30");

        let json = movie.to_json().unwrap();

        assert_eq!(json["id"], 603);
        assert_eq!(json["title"], "The Matrix");
        assert_eq!(Movie::from_json(json).unwrap(), movie);
        assert!(Movie::from_json(serde_json::json!({ "title": "No id" })).is_err());
    }

    #[test]
    fn movies_live_in_the_movies_collection() {
        let movies = cinelayer_core::collection::TypedCollection::<_, Movie>::with_default_name(
            cinelayer_memory::InMemoryStore::new(),
        );

        assert_eq!(movies.name(), "movies");
    }

    #[test]
    fn thin_movie_decodes_from_narrow_integers() {
        let thin: ThinMovie = cinelayer_core::document::decode(bson::doc! {
            "id": 603_i32,
            "title": "The Matrix",
            "genres": [ { "id": 28_i32, "name": "Action" } ],
        })
        .unwrap();

        assert_eq!(thin.id, 603);
        assert_eq!(thin.genres, vec![Genre::new(28, "Action")]);
        assert!(thin.tags.is_empty());
    }

    #[test]
    fn tag_paths() {
        assert_eq!(Tag::Favorited.path().unwrap(), "tags.favorited");
        assert_eq!(Tag::Custom("seen_in_theater".into()).path().unwrap(), "tags.seen_in_theater");

        for key in ["", "a.b", "$set", "nul\0"] {
            assert!(matches!(Tag::Custom(key.into()).path(), Err(MovieError::InvalidTag(_))));
        }
    }

    #[test]
    fn string_ids_are_parsed_strictly() {
        assert_eq!("550".into_movie_id().unwrap(), 550);
        assert_eq!(" 550 ".to_string().into_movie_id().unwrap(), 550);
        assert!(matches!("55O".into_movie_id(), Err(MovieError::InvalidId(_))));
        assert!(matches!("".into_movie_id(), Err(MovieError::InvalidId(_))));
    }
}
