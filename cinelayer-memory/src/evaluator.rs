//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for filter expressions and the
//! value ordering used for sorting, following document-store semantics:
//! dotted paths traverse embedded arrays, a field matches when any of its
//! values matches, and a missing field compares equal to `null`.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, DateTime, Document};
use regex::{Regex, RegexBuilder};

use cinelayer_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
};

use crate::path;


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64. Values of different kinds never compare
/// equal and are not ordered for filters; for sorting, [`Comparable::sort_cmp`]
/// orders kinds by canonical BSON type order.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(f64),
    String(&'a str),
    Map(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    Bool(bool),
    DateTime(DateTime),
    /// Types with no meaningful comparison here (binary, object ids, ...).
    Other,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            _ => Comparable::Other,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Canonical BSON sort rank of the value's kind.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Other => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
        }
    }

    /// Total order used for sorting: kinds by BSON type order, then values within a kind.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    let ordering = left.sort_cmp(right);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                a.len().cmp(&b.len())
            },
            (Comparable::Map(a), Comparable::Map(b)) => {
                for ((left_key, left), (right_key, right)) in a.iter().zip(b.iter()) {
                    let ordering = left_key
                        .cmp(right_key)
                        .then_with(|| left.sort_cmp(right));
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                a.len().cmp(&b.len())
            },
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Compiled regular expressions, keyed by pattern and case flag.
#[derive(Default)]
pub(crate) struct RegexCache {
    compiled: HashMap<(String, bool), Regex>,
}

impl RegexCache {
    fn get(&mut self, pattern: &str, case_insensitive: bool) -> DocumentStoreResult<&Regex> {
        let key = (pattern.to_string(), case_insensitive);

        if !self.compiled.contains_key(&key) {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| DocumentStoreError::InvalidQuery(format!("invalid regex {pattern:?}: {e}")))?;
            self.compiled.insert(key.clone(), regex);
        }

        self.compiled
            .get(&key)
            .ok_or_else(|| DocumentStoreError::InvalidQuery(format!("invalid regex {pattern:?}")))
    }
}

pub(crate) struct DocumentEvaluator<'a, 'c> {
    document: &'a Document,
    regexes: &'c mut RegexCache,
}

impl<'a, 'c> DocumentEvaluator<'a, 'c> {
    pub fn new(document: &'a Document, regexes: &'c mut RegexCache) -> Self {
        Self { document, regexes }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns the documents matching `expr`, in their original order.
    pub fn filter_documents<'d>(
        documents: impl IntoIterator<Item = &'d Document>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<&'d Document>> {
        let mut regexes = RegexCache::default();
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document, &mut regexes).evaluate(expr)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    /// Evaluates `expr` against each document, returning one flag per document.
    pub fn match_flags<'d>(
        documents: impl IntoIterator<Item = &'d Document>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<bool>> {
        let mut regexes = RegexCache::default();

        documents
            .into_iter()
            .map(|document| DocumentEvaluator::new(document, &mut regexes).evaluate(expr))
            .collect()
    }

    /// Every candidate value for a path, with terminal arrays also contributing their elements.
    fn candidates(&self, field: &str) -> Vec<&'a Bson> {
        let mut values = Vec::new();

        for value in path::lookup(self.document, field) {
            values.push(value);
            if let Bson::Array(items) = value {
                values.extend(items.iter());
            }
        }

        values
    }

    fn matches_eq(&self, field: &str, value: &Bson) -> bool {
        let candidates = self.candidates(field);
        let expected = Comparable::from(value);

        if candidates.is_empty() {
            return expected == Comparable::Null;
        }

        candidates
            .into_iter()
            .any(|candidate| Comparable::from(candidate) == expected)
    }
}

impl<'a, 'c> QueryVisitor for DocumentEvaluator<'a, 'c> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(!path::lookup(self.document, field).is_empty() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        match op {
            FieldOp::Eq => Ok(self.matches_eq(field, value)),
            FieldOp::Ne => Ok(!self.matches_eq(field, value)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                let expected = Comparable::from(value);

                Ok(
                    self.candidates(field)
                        .into_iter()
                        .any(|candidate| match Comparable::from(candidate).partial_cmp(&expected) {
                            Some(ordering) => match op {
                                FieldOp::Gt => ordering == Ordering::Greater,
                                FieldOp::Gte => ordering != Ordering::Less,
                                FieldOp::Lt => ordering == Ordering::Less,
                                _ => ordering != Ordering::Greater,
                            },
                            None => false,
                        })
                )
            },
            FieldOp::AnyOf | FieldOp::NoneOf => {
                let Bson::Array(values) = value else {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "{op:?} on {field} requires an array of values"
                    )));
                };
                let any = values
                    .iter()
                    .any(|value| self.matches_eq(field, value));

                Ok(if *op == FieldOp::AnyOf { any } else { !any })
            },
        }
    }

    fn visit_regex(&mut self, field: &str, pattern: &str, case_insensitive: bool) -> Result<Self::Output, Self::Error> {
        let candidates = self.candidates(field);
        let regex = self.regexes.get(pattern, case_insensitive)?;

        Ok(
            candidates
                .into_iter()
                .any(|candidate| matches!(candidate, Bson::String(s) if regex.is_match(s)))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use cinelayer_core::query::Filter;

    fn evaluate(document: &Document, expr: &Expr) -> bool {
        let mut regexes = RegexCache::default();
        DocumentEvaluator::new(document, &mut regexes)
            .evaluate(expr)
            .unwrap()
    }

    #[test]
    fn numeric_equality_ignores_integer_width() {
        let movie = doc! { "id": 603_i32 };

        assert!(evaluate(&movie, &Filter::eq("id", 603_i64)));
        assert!(evaluate(&movie, &Filter::eq("id", 603.0)));
        assert!(!evaluate(&movie, &Filter::eq("id", 604_i64)));
    }

    #[test]
    fn equality_matches_any_embedded_array_element() {
        let movie = doc! {
            "casts": { "cast": [ { "id": 6384 }, { "id": 2975 } ] },
        };

        assert!(evaluate(&movie, &Filter::eq("casts.cast.id", 2975)));
        assert!(!evaluate(&movie, &Filter::eq("casts.cast.id", 1)));
    }

    #[test]
    fn not_null_requires_a_present_non_null_value() {
        let tagged = doc! { "tags": { "favorited": DateTime::from_millis(1_000) } };
        let cleared = doc! { "tags": { "favorited": Bson::Null } };
        let untagged = doc! { "tags": {} };

        let expr = Filter::ne("tags.favorited", Bson::Null);

        assert!(evaluate(&tagged, &expr));
        assert!(!evaluate(&cleared, &expr));
        assert!(!evaluate(&untagged, &expr));
    }

    #[test]
    fn regex_honours_case_flag() {
        let movie = doc! { "title": "Batman Begins" };

        assert!(evaluate(&movie, &Filter::regex("title", "^bat", true)));
        assert!(!evaluate(&movie, &Filter::regex("title", "^bat", false)));
    }

    #[test]
    fn invalid_regex_is_a_query_error() {
        let movie = doc! { "title": "Heat" };
        let mut regexes = RegexCache::default();

        let result = DocumentEvaluator::new(&movie, &mut regexes)
            .evaluate(&Filter::regex("title", "(", false));

        assert!(matches!(result, Err(DocumentStoreError::InvalidQuery(_))));
    }

    #[test]
    fn range_filters_do_not_cross_types() {
        let movie = doc! { "release_date": "1995-12-15" };

        assert!(evaluate(&movie, &Filter::gte("release_date", "1995-01-01")));
        assert!(!evaluate(&movie, &Filter::gte("release_date", 1995)));
    }

    #[test]
    fn upper_bounds_include_or_exclude_the_limit() {
        let movie = doc! { "runtime": 170 };

        assert!(evaluate(&movie, &Filter::lte("runtime", 170)));
        assert!(!evaluate(&movie, &Filter::lt("runtime", 170)));
        assert!(evaluate(&movie, &Filter::lt("runtime", 170.5)));
    }

    #[test]
    fn exists_checks_presence_of_nested_paths() {
        let watched = doc! { "id": 1, "watched": true, "tags": { "queued": DateTime::from_millis(1) } };
        let fresh = doc! { "id": 2 };

        assert!(evaluate(&watched, &Filter::exists("tags.queued")));
        assert!(!evaluate(&fresh, &Filter::exists("tags.queued")));
        assert!(evaluate(&fresh, &Filter::not_exists("watched")));
        assert!(!evaluate(&watched, &Filter::not_exists("watched")));
    }

    #[test]
    fn sort_order_places_dates_above_booleans() {
        let date = Bson::DateTime(DateTime::from_millis(0));
        let flag = Bson::Boolean(true);
        let missing = Bson::Null;

        assert_eq!(Comparable::from(&date).sort_cmp(&Comparable::from(&flag)), Ordering::Greater);
        assert_eq!(Comparable::from(&flag).sort_cmp(&Comparable::from(&missing)), Ordering::Greater);
    }
}
