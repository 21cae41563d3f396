//! Watch statistics assembled from counts and aggregation rows.

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::models::YearCount;

/// One row of the [`genre_stats`](crate::aggregates::genre_stats) pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreWatchRow {
    #[serde(rename = "_id")]
    pub key: GenreWatchKey,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenreWatchKey {
    #[serde(default)]
    pub id: Option<String>,
    /// The stored flag as found; absent when the movie has none.
    #[serde(default)]
    pub watched: Option<Bson>,
}

/// Watched and unwatched totals for one genre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreStat {
    pub genre: Option<String>,
    pub watched: u64,
    pub unwatched: u64,
    pub total: u64,
    /// `watched / total`, or `None` for an empty genre.
    pub ratio: Option<f64>,
}

impl GenreStat {
    pub fn new(genre: Option<String>, watched: u64, unwatched: u64) -> Self {
        let total = watched + unwatched;
        let ratio = (total > 0).then(|| watched as f64 / total as f64);

        Self { genre, watched, unwatched, total, ratio }
    }

    /// The ratio with four decimals, or `"NaN"` when it is undefined.
    pub fn ratio_label(&self) -> String {
        match self.ratio {
            Some(ratio) => format!("{ratio:.4}"),
            None => "NaN".to_string(),
        }
    }
}

/// Folds the per-(genre, watched) rows into one record per genre.
///
/// Only rows whose flag is `true` count as watched. Genres keep the order in
/// which they first appear.
pub fn reduce_genre_stats(rows: impl IntoIterator<Item = GenreWatchRow>) -> Vec<GenreStat> {
    let mut tallies: Vec<(Option<String>, u64, u64)> = Vec::new();

    for row in rows {
        let count = u64::try_from(row.count).unwrap_or(0);
        let watched = matches!(row.key.watched, Some(Bson::Boolean(true)));

        let index = match tallies.iter().position(|(genre, _, _)| *genre == row.key.id) {
            Some(index) => index,
            None => {
                tallies.push((row.key.id, 0, 0));
                tallies.len() - 1
            },
        };

        let (_, seen, unseen) = &mut tallies[index];
        if watched {
            *seen += count;
        } else {
            *unseen += count;
        }
    }

    tallies
        .into_iter()
        .map(|(genre, watched, unwatched)| GenreStat::new(genre, watched, unwatched))
        .collect()
}

/// Which breakdowns [`MovieService::stats`](crate::service::MovieService::stats) includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsOptions {
    pub genres: bool,
    pub years: bool,
}

impl StatsOptions {
    /// Totals plus both breakdowns.
    pub fn all() -> Self {
        Self { genres: true, years: true }
    }

    pub fn with_genres(mut self, genres: bool) -> Self {
        self.genres = genres;
        self
    }

    pub fn with_years(mut self, years: bool) -> Self {
        self.years = years;
        self
    }
}

/// Library-wide counts with optional breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total: u64,
    pub watched: u64,
    pub unwatched: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<GenreStat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<Vec<YearCount>>,
}
