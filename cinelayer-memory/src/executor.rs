//! Aggregation pipeline execution over in-memory rows.
//!
//! [`PipelineExecutor`] walks a [`Pipeline`] stage by stage through the
//! [`StageVisitor`] interface, rewriting its working set of rows in place.

use std::cmp::Ordering;
use bson::{Bson, Document};

use cinelayer_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Accumulator, Expression, GroupKey, Pipeline, ProjectField, StageVisitor},
    query::{Expr, Sort, SortDirection},
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator},
    path,
};


/// Executes pipelines against a snapshot of documents.
#[derive(Debug, Default)]
pub(crate) struct PipelineExecutor {
    rows: Vec<Document>,
}

impl PipelineExecutor {
    pub fn new(rows: Vec<Document>) -> Self {
        Self { rows }
    }

    /// Runs every stage in order and returns the resulting rows.
    pub fn run(mut self, pipeline: &Pipeline) -> DocumentStoreResult<Vec<Document>> {
        for stage in pipeline.stages() {
            self.visit_stage(stage)?;
        }

        Ok(self.rows)
    }
}

/// Running total of a `$sum` accumulator.
///
/// Integer inputs stay integral; the first double promotes the result.
#[derive(Debug, Default, Clone, Copy)]
struct Total {
    integral: i64,
    fractional: f64,
    wide: bool,
    floating: bool,
}

impl Total {
    fn add(&mut self, value: &Bson) {
        match value {
            Bson::Int32(n) => self.integral = self.integral.saturating_add(i64::from(*n)),
            Bson::Int64(n) => {
                self.integral = self.integral.saturating_add(*n);
                self.wide = true;
            },
            Bson::Double(n) => {
                self.fractional += n;
                self.floating = true;
            },
            _ => {},
        }
    }

    fn into_bson(self) -> Bson {
        if self.floating {
            Bson::Double(self.integral as f64 + self.fractional)
        } else if self.wide {
            Bson::Int64(self.integral)
        } else {
            i32::try_from(self.integral)
                .map(Bson::Int32)
                .unwrap_or(Bson::Int64(self.integral))
        }
    }
}

/// Evaluates a pipeline expression against one row.
pub(crate) fn evaluate(expr: &Expression, row: &Document) -> Bson {
    match expr {
        Expression::Field(field) => path::get_path(row, field)
            .cloned()
            .unwrap_or(Bson::Null),
        Expression::Literal(value) => value.clone(),
        Expression::Substr { input, start, length } => {
            let substring = match evaluate(input, row) {
                Bson::String(s) => {
                    let end = start.saturating_add(*length).min(s.len());
                    s.get(*start..end)
                        .unwrap_or_default()
                        .to_string()
                },
                _ => String::new(),
            };

            Bson::String(substring)
        },
        Expression::Eq(left, right) => {
            let left = evaluate(left, row);
            let right = evaluate(right, row);

            Bson::Boolean(Comparable::from(&left) == Comparable::from(&right))
        },
        Expression::Cond { condition, then, otherwise } => {
            if is_truthy(&evaluate(condition, row)) {
                evaluate(then, row)
            } else {
                evaluate(otherwise, row)
            }
        },
    }
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(flag) => *flag,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}

fn compare_rows(left: &Document, right: &Document, keys: &[Sort]) -> Ordering {
    for key in keys {
        let null = Bson::Null;
        let a = Comparable::from(path::get_path(left, &key.field).unwrap_or(&null));
        let b = Comparable::from(path::get_path(right, &key.field).unwrap_or(&null));

        let ordering = match key.direction {
            SortDirection::Asc => a.sort_cmp(&b),
            SortDirection::Desc => b.sort_cmp(&a),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Sorts rows by the given keys, keeping the relative order of equal rows.
pub(crate) fn sort_rows(rows: &mut [Document], keys: &[Sort]) {
    if !keys.is_empty() {
        rows.sort_by(|a, b| compare_rows(a, b, keys));
    }
}

impl StageVisitor for PipelineExecutor {
    type Output = ();
    type Error = DocumentStoreError;

    fn visit_project(&mut self, fields: &[(String, ProjectField)]) -> Result<Self::Output, Self::Error> {
        let mut included = fields
            .iter()
            .filter(|(_, field)| matches!(field, ProjectField::Include))
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();
        included.push("_id".to_string());

        for row in self.rows.iter_mut() {
            let mut projected = path::include_paths(row, &included);

            for (name, field) in fields {
                if let ProjectField::Computed(expr) = field {
                    path::set_path(&mut projected, name, evaluate(expr, row));
                }
            }

            *row = projected;
        }

        Ok(())
    }

    fn visit_unwind(&mut self, field: &str) -> Result<Self::Output, Self::Error> {
        let mut unwound = Vec::with_capacity(self.rows.len());

        for row in self.rows.drain(..) {
            let items = match path::get_path(&row, field) {
                Some(Bson::Array(items)) => items.clone(),
                None | Some(Bson::Null) => continue,
                Some(_) => {
                    unwound.push(row);
                    continue;
                },
            };

            for item in items {
                let mut copy = row.clone();
                path::set_path(&mut copy, field, item);
                unwound.push(copy);
            }
        }

        self.rows = unwound;
        Ok(())
    }

    fn visit_group(
        &mut self,
        key: &GroupKey,
        accumulators: &[(String, Accumulator)],
    ) -> Result<Self::Output, Self::Error> {
        let mut groups: Vec<(Bson, Vec<Total>)> = Vec::new();

        for row in &self.rows {
            let key_value = match key {
                GroupKey::Field(field) => evaluate(&Expression::Field(field.clone()), row),
                GroupKey::Compound(fields) => Bson::Document(
                    fields
                        .iter()
                        .map(|(name, expr)| (name.clone(), evaluate(expr, row)))
                        .collect::<Document>()
                ),
            };

            let slot = match groups.iter().position(|(existing, _)| same_group(existing, &key_value)) {
                Some(slot) => slot,
                None => {
                    groups.push((key_value, vec![Total::default(); accumulators.len()]));
                    groups.len() - 1
                },
            };

            for ((_, accumulator), total) in accumulators.iter().zip(groups[slot].1.iter_mut()) {
                match accumulator {
                    Accumulator::Sum(expr) => total.add(&evaluate(expr, row)),
                }
            }
        }

        self.rows = groups
            .into_iter()
            .map(|(key_value, totals)| {
                let mut row = Document::new();
                row.insert("_id", key_value);
                for ((name, _), total) in accumulators.iter().zip(totals) {
                    row.insert(name.clone(), total.into_bson());
                }
                row
            })
            .collect();

        Ok(())
    }

    fn visit_match(&mut self, filter: &Expr) -> Result<Self::Output, Self::Error> {
        let flags = DocumentEvaluator::match_flags(self.rows.iter(), filter)?;
        let mut flags = flags.into_iter();

        self.rows.retain(|_| flags.next().unwrap_or(false));
        Ok(())
    }

    fn visit_sort(&mut self, keys: &[Sort]) -> Result<Self::Output, Self::Error> {
        sort_rows(&mut self.rows, keys);
        Ok(())
    }

    fn visit_limit(&mut self, limit: usize) -> Result<Self::Output, Self::Error> {
        self.rows.truncate(limit);
        Ok(())
    }
}

/// Group keys match by value, so `1`, `1_i64` and `1.0` share a group.
fn same_group(existing: &Bson, key: &Bson) -> bool {
    existing == key || Comparable::from(existing) == Comparable::from(key)
}
