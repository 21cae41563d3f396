//! Aggregation pipeline descriptors.
//!
//! A [`Pipeline`] is an ordered sequence of [`Stage`]s handed to a backend's
//! aggregation executor. Pipelines are plain values: build one per request and
//! pass it by value.
//!
//! ```ignore
//! use cinelayer_core::pipeline::{Pipeline, Accumulator, GroupKey, Expression};
//! use cinelayer_core::query::Sort;
//!
//! let pipeline = Pipeline::new()
//!     .project_fields(["genres", "title"])
//!     .unwind("genres")
//!     .group(GroupKey::field("genres.name"), [("count", Accumulator::count())])
//!     .sort([Sort::desc("count")]);
//! ```
//!
//! Backends interpret pipelines through [`StageVisitor`].

use bson::Bson;

use crate::{
    error::DocumentStoreError,
    query::{Expr, Sort},
};

/// A value computed per row inside a pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// The value at a dotted field path of the current row (`null` when missing).
    Field(String),
    /// A constant.
    Literal(Bson),
    /// Substring of a string value, by byte offset and length.
    /// Non-string inputs yield an empty string.
    Substr {
        input: Box<Expression>,
        start: usize,
        length: usize,
    },
    /// `true` when both sides are equal.
    Eq(Box<Expression>, Box<Expression>),
    /// `then` when `condition` is `true`, otherwise `otherwise`.
    Cond {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
}

impl Expression {
    pub fn field(path: impl Into<String>) -> Self {
        Expression::Field(path.into())
    }

    pub fn literal(value: impl Into<Bson>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn substr(input: Expression, start: usize, length: usize) -> Self {
        Expression::Substr { input: Box::new(input), start, length }
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Expression::Eq(Box::new(left), Box::new(right))
    }

    pub fn cond(condition: Expression, then: Expression, otherwise: Expression) -> Self {
        Expression::Cond {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }
}

/// How a `$project` stage treats one output field.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectField {
    /// Copy the field (dotted paths keep their nesting).
    Include,
    /// Compute the field from an expression of the input row.
    Computed(Expression),
}

/// The grouping key of a `$group` stage.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// Group by one field path.
    Field(String),
    /// Group by a composite key; each entry becomes a field of `_id`.
    Compound(Vec<(String, Expression)>),
}

impl GroupKey {
    pub fn field(path: impl Into<String>) -> Self {
        GroupKey::Field(path.into())
    }

    pub fn compound<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Expression)>,
        S: Into<String>,
    {
        GroupKey::Compound(
            fields
                .into_iter()
                .map(|(name, expr)| (name.into(), expr))
                .collect(),
        )
    }
}

/// A `$group` accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Numeric sum of an expression over the group; non-numeric values count as zero.
    Sum(Expression),
}

impl Accumulator {
    /// `Σ 1`: the number of rows in the group.
    pub fn count() -> Self {
        Accumulator::Sum(Expression::literal(1_i32))
    }

    pub fn sum(expr: Expression) -> Self {
        Accumulator::Sum(expr)
    }
}

/// One step of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Reshape each row, keeping only the listed fields.
    Project(Vec<(String, ProjectField)>),
    /// Emit one row per element of the array at the path.
    /// Rows where the path is missing, null or an empty array are dropped.
    Unwind(String),
    /// Group rows by key, computing accumulators. The key is stored under `_id`.
    Group {
        key: GroupKey,
        accumulators: Vec<(String, Accumulator)>,
    },
    /// Keep rows matching a filter expression.
    Match(Expr),
    /// Order rows by the given keys. Equal rows keep their relative order.
    Sort(Vec<Sort>),
    /// Keep at most this many rows.
    Limit(usize),
}

/// An ordered sequence of stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<Stage> {
        self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Appends an arbitrary stage.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn project<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ProjectField)>,
        S: Into<String>,
    {
        self.stage(Stage::Project(
            fields
                .into_iter()
                .map(|(name, field)| (name.into(), field))
                .collect(),
        ))
    }

    /// Shorthand for a projection that only includes fields.
    pub fn project_fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project(fields.into_iter().map(|name| (name, ProjectField::Include)))
    }

    pub fn unwind(self, path: impl Into<String>) -> Self {
        self.stage(Stage::Unwind(path.into()))
    }

    pub fn group<I, S>(self, key: GroupKey, accumulators: I) -> Self
    where
        I: IntoIterator<Item = (S, Accumulator)>,
        S: Into<String>,
    {
        self.stage(Stage::Group {
            key,
            accumulators: accumulators
                .into_iter()
                .map(|(name, acc)| (name.into(), acc))
                .collect(),
        })
    }

    pub fn match_expr(self, filter: Expr) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn sort(self, keys: impl IntoIterator<Item = Sort>) -> Self {
        self.stage(Stage::Sort(keys.into_iter().collect()))
    }

    pub fn limit(self, limit: usize) -> Self {
        self.stage(Stage::Limit(limit))
    }
}

/// Visitor over pipeline stages, implemented by backends to execute or translate them.
pub trait StageVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_project(&mut self, fields: &[(String, ProjectField)]) -> Result<Self::Output, Self::Error>;
    fn visit_unwind(&mut self, path: &str) -> Result<Self::Output, Self::Error>;
    fn visit_group(
        &mut self,
        key: &GroupKey,
        accumulators: &[(String, Accumulator)],
    ) -> Result<Self::Output, Self::Error>;
    fn visit_match(&mut self, filter: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_sort(&mut self, keys: &[Sort]) -> Result<Self::Output, Self::Error>;
    fn visit_limit(&mut self, limit: usize) -> Result<Self::Output, Self::Error>;

    fn visit_stage(&mut self, stage: &Stage) -> Result<Self::Output, Self::Error> {
        match stage {
            Stage::Project(fields) => self.visit_project(fields),
            Stage::Unwind(path) => self.visit_unwind(path),
            Stage::Group { key, accumulators } => self.visit_group(key, accumulators),
            Stage::Match(filter) => self.visit_match(filter),
            Stage::Sort(keys) => self.visit_sort(keys),
            Stage::Limit(limit) => self.visit_limit(*limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;

    #[test]
    fn builder_appends_stages_in_order() {
        let pipeline = Pipeline::new()
            .project_fields(["genres", "title"])
            .unwind("genres")
            .group(GroupKey::field("genres.name"), [("count", Accumulator::count())])
            .match_expr(Filter::gt("count", 1))
            .sort([Sort::desc("count")])
            .limit(10);

        let kinds = pipeline
            .stages()
            .iter()
            .map(|stage| match stage {
                Stage::Project(_) => "project",
                Stage::Unwind(_) => "unwind",
                Stage::Group { .. } => "group",
                Stage::Match(_) => "match",
                Stage::Sort(_) => "sort",
                Stage::Limit(_) => "limit",
            })
            .collect::<Vec<_>>();

        assert_eq!(kinds, ["project", "unwind", "group", "match", "sort", "limit"]);
    }

    #[test]
    fn into_stages_hands_over_the_stage_list() {
        let pipeline = Pipeline::new().unwind("casts.cast").limit(5);
        let expected = pipeline.stages().to_vec();

        assert_eq!(pipeline.into_stages(), expected);
    }

    #[test]
    fn count_accumulator_sums_one() {
        assert_eq!(
            Accumulator::count(),
            Accumulator::Sum(Expression::Literal(Bson::Int32(1)))
        );
    }

    #[test]
    fn compound_key_keeps_field_order() {
        let key = GroupKey::compound([
            ("id", Expression::field("genres.name")),
            ("watched", Expression::field("watched")),
        ]);

        match key {
            GroupKey::Compound(fields) => {
                let names = fields.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
                assert_eq!(names, ["id", "watched"]);
            }
            other => panic!("expected a compound key, got {other:?}"),
        }
    }
}
