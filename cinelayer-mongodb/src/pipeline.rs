//! Aggregation pipeline translation to MongoDB stage documents.

use bson::{Bson, Document, doc};

use cinelayer_core::{
    error::DocumentStoreError,
    pipeline::{Accumulator, Expression, GroupKey, Pipeline, ProjectField, StageVisitor},
    query::{Expr, QueryVisitor, Sort, SortDirection},
};

use crate::query::MongoQueryTranslator;


/// Translates pipeline stages into MongoDB aggregation stage documents.
pub(crate) struct MongoPipelineTranslator;

impl MongoPipelineTranslator {
    pub fn translate(pipeline: &Pipeline) -> Result<Vec<Document>, DocumentStoreError> {
        pipeline
            .stages()
            .iter()
            .map(|stage| MongoPipelineTranslator.visit_stage(stage))
            .collect()
    }
}

fn expression(expr: &Expression) -> Bson {
    match expr {
        Expression::Field(path) => Bson::String(format!("${path}")),
        Expression::Literal(value @ (Bson::String(_) | Bson::Document(_) | Bson::Array(_))) => {
            Bson::Document(doc! { "$literal": value.clone() })
        },
        Expression::Literal(value) => value.clone(),
        Expression::Substr { input, start, length } => Bson::Document(doc! {
            "$substr": [expression(input), *start as i64, *length as i64],
        }),
        Expression::Eq(left, right) => Bson::Document(doc! {
            "$eq": [expression(left), expression(right)],
        }),
        Expression::Cond { condition, then, otherwise } => Bson::Document(doc! {
            "$cond": [expression(condition), expression(then), expression(otherwise)],
        }),
    }
}

impl StageVisitor for MongoPipelineTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_project(&mut self, fields: &[(String, ProjectField)]) -> Result<Self::Output, Self::Error> {
        if fields.is_empty() {
            return Err(DocumentStoreError::InvalidPipeline("projection lists no fields".to_string()));
        }

        Ok(doc! {
            "$project": fields
                .iter()
                .map(|(name, field)| (name.clone(), match field {
                    ProjectField::Include => Bson::Int32(1),
                    ProjectField::Computed(expr) => expression(expr),
                }))
                .collect::<Document>(),
        })
    }

    fn visit_unwind(&mut self, path: &str) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$unwind": format!("${path}") })
    }

    fn visit_group(
        &mut self,
        key: &GroupKey,
        accumulators: &[(String, Accumulator)],
    ) -> Result<Self::Output, Self::Error> {
        let mut group = doc! {
            "_id": match key {
                GroupKey::Field(path) => Bson::String(format!("${path}")),
                GroupKey::Compound(fields) => Bson::Document(
                    fields
                        .iter()
                        .map(|(name, expr)| (name.clone(), expression(expr)))
                        .collect()
                ),
            },
        };

        for (name, accumulator) in accumulators {
            group.insert(name.clone(), match accumulator {
                Accumulator::Sum(expr) => doc! { "$sum": expression(expr) },
            });
        }

        Ok(doc! { "$group": group })
    }

    fn visit_match(&mut self, filter: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$match": MongoQueryTranslator.visit_expr(filter)? })
    }

    fn visit_sort(&mut self, keys: &[Sort]) -> Result<Self::Output, Self::Error> {
        if keys.is_empty() {
            return Err(DocumentStoreError::InvalidPipeline("sort stage has no keys".to_string()));
        }

        Ok(doc! {
            "$sort": keys
                .iter()
                .map(|key| (key.field.clone(), Bson::Int32(match key.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                })))
                .collect::<Document>(),
        })
    }

    fn visit_limit(&mut self, limit: usize) -> Result<Self::Output, Self::Error> {
        if limit == 0 {
            return Err(DocumentStoreError::InvalidPipeline("limit must be positive".to_string()));
        }

        Ok(doc! { "$limit": limit as i64 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinelayer_core::query::Filter;

    #[test]
    fn year_histogram_translates_to_stage_documents() {
        let pipeline = Pipeline::new()
            .project([("year", ProjectField::Computed(Expression::substr(Expression::field("release_date"), 0, 4)))])
            .group(GroupKey::field("year"), [("count", Accumulator::count())])
            .sort([Sort::desc("_id")]);

        assert_eq!(MongoPipelineTranslator::translate(&pipeline).unwrap(), vec![
            doc! { "$project": { "year": { "$substr": ["$release_date", 0_i64, 4_i64] } } },
            doc! { "$group": { "_id": "$year", "count": { "$sum": 1 } } },
            doc! { "$sort": { "_id": -1 } },
        ]);
    }

    #[test]
    fn per_document_watch_flag_uses_cond() {
        let watched = Expression::cond(
            Expression::eq(Expression::field("watched"), Expression::literal(true)),
            Expression::literal(1_i32),
            Expression::literal(0_i32),
        );
        let pipeline = Pipeline::new()
            .unwind("genres")
            .group(
                GroupKey::compound([("id", Expression::field("genres.name"))]),
                [("count", Accumulator::count()), ("watched", Accumulator::sum(watched))],
            );

        assert_eq!(MongoPipelineTranslator::translate(&pipeline).unwrap(), vec![
            doc! { "$unwind": "$genres" },
            doc! { "$group": {
                "_id": { "id": "$genres.name" },
                "count": { "$sum": 1 },
                "watched": { "$sum": { "$cond": [ { "$eq": ["$watched", true] }, 1, 0 ] } },
            } },
        ]);
    }

    #[test]
    fn string_literals_are_escaped() {
        assert_eq!(
            expression(&Expression::literal("$title")),
            Bson::Document(doc! { "$literal": "$title" })
        );
    }

    #[test]
    fn match_and_limit_stages() {
        let pipeline = Pipeline::new()
            .match_expr(Filter::regex("_id.name", "^al|\\sal", true))
            .limit(5);

        assert_eq!(MongoPipelineTranslator::translate(&pipeline).unwrap(), vec![
            doc! { "$match": { "_id.name": { "$regex": "^al|\\sal", "$options": "i" } } },
            doc! { "$limit": 5_i64 },
        ]);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let result = MongoPipelineTranslator::translate(&Pipeline::new().limit(0));

        assert!(matches!(result, Err(DocumentStoreError::InvalidPipeline(_))));
    }
}
