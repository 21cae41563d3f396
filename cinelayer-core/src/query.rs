//! Find descriptors: filter expressions plus projection, sort keys and paging.
//!
//! A [`Query`] is plain data. Backends walk its filter through [`QueryVisitor`]
//! and apply the remaining fields themselves.
//!
//! # Query Building
//!
//! ```ignore
//! use cinelayer_core::query::{Query, Filter, SortDirection};
//!
//! let filmography = Query::builder()
//!     .filter(Filter::eq("casts.cast.id", 819))
//!     .project(["id", "title"])
//!     .sort("release_date", SortDirection::Desc)
//!     .offset(0)
//!     .limit(20)
//!     .build();
//! ```
//!
//! # Filters
//!
//! [`Filter`] builds the leaves (`eq`, `ne`, `gt`, `gte`, `lt`, `lte`, `regex`,
//! `exists`, `not_exists`, `any_of`, `none_of`) and joins them (`and`, `or`).
//!
//! Field names use dot notation and traverse embedded arrays, so
//! `Filter::eq("casts.cast.id", 819)` matches a document if any cast member has id 819.

use bson::Bson;

use crate::error::DocumentStoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    /// Largest first; `addedToDb` descending lists the newest additions first.
    Desc,
}

impl SortDirection {
    /// The numeric form used by document stores (`1` / `-1`).
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1_i32,
        }
    }
}

/// One sort key: the field to sort by and in which direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// Dotted path of the key.
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Sort { field: field.into(), direction }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Sort::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Sort::new(field, SortDirection::Desc)
    }
}

/// How a field is compared with the filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equality. Against an array field, any element may match.
    Eq,
    /// Not equal to. A missing field counts as `null`.
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Field value is one of the given values.
    AnyOf,
    /// Field value is none of the given values.
    NoneOf,
}

/// A predicate over stored documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// `(path, true)` requires the path to be present, `(path, false)` absent.
    Exists(String, bool),
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
    /// Regular expression match on a string field.
    Regex {
        /// The field name to match.
        field: String,
        /// The pattern, in the common subset of PCRE and Rust regex syntax.
        pattern: String,
        /// Whether the match ignores case.
        case_insensitive: bool,
    },
}

impl Expr {
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Self::Field { field, op, value }
    }

    /// Conjunction; an existing `And` grows instead of nesting.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Self::And(mut all) => {
                all.push(other);
                Self::And(all)
            },
            single => Self::And(vec![single, other]),
        }
    }

    /// Disjunction; an existing `Or` grows instead of nesting.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Self::Or(mut any) => {
                any.push(other);
                Self::Or(any)
            },
            single => Self::Or(vec![single, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Everything a `find` request needs.
///
/// Backends apply the parts in order: filter, sort, offset, limit, projection.
/// An absent filter matches every document; an absent projection returns whole documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Expr>,
    /// Fields to include in each returned document.
    pub projection: Option<Vec<String>>,
    /// Sort keys, applied in order.
    pub sort: Vec<Sort>,
    /// Documents skipped after sorting.
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl Query {
    /// Matches everything, unsorted and unbounded.
    pub fn new() -> Self {
        Query::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Constructors for filter leaves and combinators.
pub struct Filter;

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Eq, value)
    }

    /// `Filter::ne(field, Bson::Null)` selects documents where the field is present and not null.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Lte, value)
    }

    fn compare(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), op, value.into())
    }

    /// The pattern is passed through untouched; escape user input before building it.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>, case_insensitive: bool) -> Expr {
        Expr::Regex {
            field: field.into(),
            pattern: pattern.into(),
            case_insensitive,
        }
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// All of `exprs`; an empty list matches everything.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(Vec::from_iter(exprs))
    }

    /// Any of `exprs`; an empty list matches nothing.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(Vec::from_iter(exprs))
    }

    /// Matches documents where the field equals any of the given values.
    pub fn any_of(field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Bson>>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::AnyOf,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents where the field equals none of the given values.
    pub fn none_of(field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Bson>>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::NoneOf,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }
}

/// Fluent construction of a [`Query`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(self, filter: Expr) -> Self {
        self.maybe_filter(Some(filter))
    }

    /// Sets the filter, or clears it when `None`.
    pub fn maybe_filter(mut self, filter: Option<Expr>) -> Self {
        self.query.filter = filter;
        self
    }

    /// Restricts the returned documents to the given fields.
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Appends a sort key. Keys are applied in the order they were added.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort::new(field, direction));
        self
    }

    /// Replaces all sort keys.
    pub fn sort_by(mut self, sort: Vec<Sort>) -> Self {
        self.query.sort = sort;
        self
    }

    pub fn offset(mut self, skip: usize) -> Self {
        self.query.offset = Some(skip);
        self
    }

    pub fn limit(mut self, max: usize) -> Self {
        self.query.limit = Some(max);
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks a filter tree. Backends implement one method per node kind and call
/// [`visit_expr`](Self::visit_expr) on the root.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error>;
    fn visit_regex(&mut self, field: &str, pattern: &str, case_insensitive: bool) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
            Expr::Regex { field, pattern, case_insensitive } => {
                self.visit_regex(field, pattern, *case_insensitive)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_sort_keys_in_order() {
        let query = Query::builder()
            .sort("release_date", SortDirection::Desc)
            .sort("title", SortDirection::Asc)
            .build();

        assert_eq!(
            query.sort,
            vec![Sort::desc("release_date"), Sort::asc("title")]
        );
    }

    #[test]
    fn empty_builder_matches_everything() {
        let query = Query::builder().build();

        assert!(query.filter.is_none());
        assert!(query.projection.is_none());
        assert!(query.sort.is_empty());
        assert_eq!(query.offset, None);
        assert_eq!(query.limit, None);
    }

    #[test]
    fn and_flattens_into_existing_conjunction() {
        let expr = Filter::eq("a", 1)
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected a conjunction, got {other:?}"),
        }
    }

    #[test]
    fn any_of_wraps_values_in_an_array() {
        let expr = Filter::any_of("id", [1_i64, 2, 3]);

        assert_eq!(
            expr,
            Expr::field(
                "id".to_string(),
                FieldOp::AnyOf,
                Bson::Array(vec![Bson::Int64(1), Bson::Int64(2), Bson::Int64(3)]),
            )
        );
    }

    #[test]
    fn sort_direction_numeric_form() {
        assert_eq!(SortDirection::Asc.as_i32(), 1);
        assert_eq!(SortDirection::Desc.as_i32(), -1);
    }
}
