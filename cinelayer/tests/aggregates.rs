mod common;

use cinelayer::{bson::doc, memory::InMemoryStore, prelude::*};
use common::{seed, service, service_with};
use serde_json::{Value, json};

fn library() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "title": "Heat",
            "release_date": "1995-12-15",
            "watched": true,
            "genres": [{ "id": 28, "name": "Action" }, { "id": 18, "name": "Drama" }],
            "casts": { "cast": [{ "id": 1158, "name": "Al Pacino" }, { "id": 380, "name": "Robert De Niro" }] },
        }),
        json!({
            "id": 2,
            "title": "Rush Hour",
            "release_date": "1998-09-18",
            "genres": [{ "id": 35, "name": "Comedy" }, { "id": 28, "name": "Action" }],
            "casts": { "cast": [{ "id": 18897, "name": "Jackie Chan" }] },
        }),
        json!({
            "id": 3,
            "title": "Ronin",
            "release_date": "1998-09-25",
            "watched": false,
            "casts": { "cast": [{ "id": 380, "name": "Robert De Niro" }] },
        }),
        json!({ "id": 4, "title": "Untitled" }),
    ]
}

async fn seeded() -> MovieService<InMemoryStore> {
    let movies = service();
    seed(&movies, library()).await;
    movies
}

fn genre_names(genres: &[GenreCount]) -> Vec<(&str, i64)> {
    genres
        .iter()
        .map(|genre| (genre.name.as_deref().unwrap_or_default(), genre.count))
        .collect()
}

#[tokio::test]
async fn genres_are_counted_most_common_first() {
    let movies = seeded().await;

    let genres = movies.genres().await.unwrap();

    assert_eq!(genre_names(&genres), [("Action", 2), ("Drama", 1), ("Comedy", 1)]);
    assert!(genres.iter().all(|genre| genre.watched.is_none()));
}

#[tokio::test]
async fn legacy_watched_count_is_always_zero() {
    let movies = seeded().await;

    let genres = movies.genres_with(GenreWatchedCount::LegacyConstant).await.unwrap();

    assert_eq!(genre_names(&genres), [("Action", 2), ("Drama", 1), ("Comedy", 1)]);
    assert!(genres.iter().all(|genre| genre.watched == Some(0)));
}

#[tokio::test]
async fn per_document_watched_count_uses_the_flag() {
    let movies = seeded().await;

    let genres = movies.genres_with(GenreWatchedCount::PerDocument).await.unwrap();
    let watched = genres
        .iter()
        .map(|genre| genre.watched)
        .collect::<Vec<_>>();

    assert_eq!(watched, [Some(1), Some(1), Some(0)]);
}

#[tokio::test]
async fn configured_watched_mode_is_used_by_default() {
    let movies = service_with(MovieServiceConfig::default().with_genre_watched(GenreWatchedCount::PerDocument));
    seed(&movies, library()).await;

    let genres = movies.genres().await.unwrap();

    assert_eq!(genres[0].name.as_deref(), Some("Action"));
    assert_eq!(genres[0].watched, Some(1));
}

#[tokio::test]
async fn actors_are_ranked_by_credits() {
    let movies = seeded().await;

    let actors = movies.actors(None).await.unwrap();

    assert_eq!(actors.len(), 3);
    assert_eq!(actors[0].actor.name.as_deref(), Some("Robert De Niro"));
    assert_eq!(actors[0].actor.id, Some(380));
    assert_eq!(actors[0].count, 2);
    assert!(actors[1..].iter().all(|actor| actor.count == 1));

    let top = movies.actors(Some(1)).await.unwrap();
    assert_eq!(top, actors[..1]);
}

#[tokio::test]
async fn actor_ids_of_any_integer_width_count_together() {
    let movies = service();
    movies
        .collection()
        .untyped()
        .insert_one(doc! {
            "id": 1_i32,
            "title": "Heat",
            "casts": { "cast": [{ "id": 1158_i32, "name": "Al Pacino" }] },
        })
        .await
        .unwrap();
    movies
        .insert(Movie::new(2, "Scarface").with_cast([CastMember::new(1158, "Al Pacino")]))
        .await
        .unwrap();

    let actors = movies.actors(None).await.unwrap();
    assert_eq!(actors.len(), 1);
    assert_eq!(actors[0].actor.id, Some(1158));
    assert_eq!(actors[0].count, 2);

    let found = movies.search_actors("al", None).await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn actor_limit_comes_from_config() {
    let movies = service_with(MovieServiceConfig::default().with_actor_limit(2));
    seed(&movies, library()).await;

    assert_eq!(movies.actors(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn years_are_grouped_newest_first() {
    let movies = seeded().await;

    let years = movies
        .years()
        .await
        .unwrap()
        .into_iter()
        .map(|year| (year.year, year.count))
        .collect::<Vec<_>>();

    assert_eq!(years, [
        ("1998".to_string(), 2),
        ("1995".to_string(), 1),
        (String::new(), 1),
    ]);
}

#[tokio::test]
async fn genre_stats_split_watched_and_unwatched() {
    let movies = service();
    seed(&movies, vec![
        json!({ "id": 1, "title": "A", "watched": true, "genres": [{ "name": "Drama" }] }),
        json!({ "id": 2, "title": "B", "watched": true, "genres": [{ "name": "Drama" }] }),
        json!({ "id": 3, "title": "C", "watched": true, "genres": [{ "name": "Drama" }] }),
        json!({ "id": 4, "title": "D", "watched": false, "genres": [{ "name": "Drama" }] }),
        json!({ "id": 5, "title": "E", "genres": [{ "name": "Horror" }] }),
    ])
    .await;

    let stats = movies.genre_stats().await.unwrap();

    assert_eq!(stats.len(), 2);

    assert_eq!(stats[0].genre.as_deref(), Some("Drama"));
    assert_eq!((stats[0].watched, stats[0].unwatched, stats[0].total), (3, 1, 4));
    assert_eq!(stats[0].ratio, Some(0.75));
    assert_eq!(stats[0].ratio_label(), "0.7500");

    assert_eq!(stats[1].genre.as_deref(), Some("Horror"));
    assert_eq!((stats[1].watched, stats[1].unwatched), (0, 1));
    assert_eq!(stats[1].ratio_label(), "0.0000");
}

#[tokio::test]
async fn stats_totals_without_breakdowns() {
    let movies = seeded().await;

    let stats = movies.stats(StatsOptions::default()).await.unwrap();

    assert_eq!((stats.total, stats.watched, stats.unwatched), (4, 1, 3));
    assert_eq!(stats.genres, None);
    assert_eq!(stats.years, None);
}

#[tokio::test]
async fn stats_with_every_breakdown() {
    let movies = seeded().await;

    let stats = movies.stats(StatsOptions::all()).await.unwrap();

    let genres = stats.genres.unwrap();
    assert_eq!(genres.len(), 3);
    assert!(genres.iter().all(|genre| genre.total >= 1));

    let years = stats.years.unwrap();
    assert_eq!(years[0].year, "1998");

    let only_years = movies
        .stats(StatsOptions::default().with_years(true))
        .await
        .unwrap();
    assert!(only_years.genres.is_none());
    assert_eq!(only_years.years.map(|years| years.len()), Some(3));
}

#[tokio::test]
async fn reports_on_an_empty_catalog_are_empty() {
    let movies = service();

    assert!(movies.genres().await.unwrap().is_empty());
    assert!(movies.actors(None).await.unwrap().is_empty());
    assert!(movies.years().await.unwrap().is_empty());
    assert!(movies.genre_stats().await.unwrap().is_empty());
    assert_eq!(movies.stats(StatsOptions::all()).await.unwrap(), LibraryStats {
        total: 0,
        watched: 0,
        unwatched: 0,
        genres: Some(vec![]),
        years: Some(vec![]),
    });
}
