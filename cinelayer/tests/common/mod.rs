#![allow(dead_code)]

use cinelayer::{
    document::json_to_document,
    memory::InMemoryStore,
    prelude::*,
};
use serde_json::Value;

/// Routes `tracing` output through the test harness; set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn service() -> MovieService<InMemoryStore> {
    init_tracing();
    MovieService::new(InMemoryStore::new())
}

pub fn service_with(config: MovieServiceConfig) -> MovieService<InMemoryStore> {
    init_tracing();
    MovieService::with_config(InMemoryStore::new(), config)
}

/// Stores documents exactly as given, bypassing `MovieService::insert`.
pub async fn seed(service: &MovieService<InMemoryStore>, documents: Vec<Value>) {
    for document in documents {
        service
            .collection()
            .untyped()
            .insert_one(json_to_document(document).unwrap())
            .await
            .unwrap();
    }
}

pub fn titles(movies: &[ThinMovie]) -> Vec<&str> {
    movies.iter().map(|movie| movie.title.as_str()).collect()
}

pub fn ids(movies: &[ThinMovie]) -> Vec<i64> {
    movies.iter().map(|movie| movie.id).collect()
}
