//! Dotted field path helpers over BSON documents.

use bson::{Bson, Document};

/// Resolves a dotted path the way document stores do for filters: intermediate
/// arrays are traversed element by element, so one path can yield several values.
///
/// A terminal array is returned as a single value; callers decide whether to
/// look inside it.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments = path.split('.').collect::<Vec<_>>();
    let mut found = Vec::new();

    if let Some((head, rest)) = segments.split_first() {
        if let Some(value) = document.get(*head) {
            collect(value, rest, &mut found);
        }
    }

    found
}

fn collect<'a>(value: &'a Bson, segments: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(inner) => {
            if let Some(next) = inner.get(*head) {
                collect(next, rest, found);
            }
        }
        Bson::Array(items) => {
            for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                collect(item, segments, found);
            }
        }
        _ => {}
    }
}

/// Resolves a dotted path through embedded documents only.
pub(crate) fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Writes a value at a dotted path, creating (or replacing non-document)
/// intermediate values with empty documents.
pub(crate) fn set_path(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

/// Builds a copy of the document holding only the listed paths.
///
/// Nesting is preserved, and embedded arrays of documents are projected element-wise,
/// so `["casts.cast.name"]` keeps `{casts: {cast: [{name}, ...]}}`.
pub(crate) fn include_paths(document: &Document, paths: &[String]) -> Document {
    let split = paths
        .iter()
        .map(|path| path.split('.').collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let borrowed = split
        .iter()
        .map(Vec::as_slice)
        .collect::<Vec<_>>();

    include_segments(document, &borrowed)
}

fn include_segments(document: &Document, paths: &[&[&str]]) -> Document {
    let mut projected = Document::new();

    for (key, value) in document {
        let tails = paths
            .iter()
            .filter(|path| path.first() == Some(&key.as_str()))
            .map(|path| &path[1..])
            .collect::<Vec<_>>();

        if tails.is_empty() {
            continue;
        }

        if tails.iter().any(|tail| tail.is_empty()) {
            projected.insert(key.clone(), value.clone());
        } else if let Some(value) = include_nested(value, &tails) {
            projected.insert(key.clone(), value);
        }
    }

    projected
}

fn include_nested(value: &Bson, paths: &[&[&str]]) -> Option<Bson> {
    match value {
        Bson::Document(inner) => Some(Bson::Document(include_segments(inner, paths))),
        Bson::Array(items) => Some(Bson::Array(
            items
                .iter()
                .filter_map(|item| include_nested(item, paths))
                .collect(),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn movie() -> Document {
        doc! {
            "id": 949,
            "title": "Heat",
            "tags": { "favorited": true },
            "casts": {
                "cast": [
                    { "id": 1158, "name": "Al Pacino", "character": "Hanna" },
                    { "id": 380, "name": "Robert De Niro", "character": "McCauley" },
                ],
            },
        }
    }

    #[test]
    fn lookup_traverses_embedded_arrays() {
        let movie = movie();
        let ids = lookup(&movie, "casts.cast.id");

        assert_eq!(ids, vec![&Bson::Int32(1158), &Bson::Int32(380)]);
    }

    #[test]
    fn lookup_of_missing_path_is_empty() {
        let movie = movie();

        assert!(lookup(&movie, "casts.crew.id").is_empty());
        assert!(lookup(&movie, "title.length").is_empty());
    }

    #[test]
    fn get_path_reads_nested_documents() {
        let movie = movie();

        assert_eq!(get_path(&movie, "tags.favorited"), Some(&Bson::Boolean(true)));
        assert_eq!(get_path(&movie, "casts.cast.id"), None);
    }

    #[test]
    fn set_path_creates_intermediate_documents() {
        let mut movie = doc! { "id": 1, "tags": Bson::Null };
        set_path(&mut movie, "tags.queued", Bson::Int64(42));
        set_path(&mut movie, "watched", Bson::Boolean(true));

        assert_eq!(movie, doc! { "id": 1, "tags": { "queued": 42_i64 }, "watched": true });
    }

    #[test]
    fn include_paths_projects_array_elements() {
        let movie = movie();
        let projected = include_paths(
            &movie,
            &["title".to_string(), "casts.cast.name".to_string()],
        );

        assert_eq!(
            projected,
            doc! {
                "title": "Heat",
                "casts": { "cast": [ { "name": "Al Pacino" }, { "name": "Robert De Niro" } ] },
            }
        );
    }
}
