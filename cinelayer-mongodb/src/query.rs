//! Query translation from cinelayer filter expressions to MongoDB query syntax.
//!
//! This module translates the abstract filter expressions into MongoDB BSON
//! documents for execution by the MongoDB query engine.

use bson::{Document, Bson, doc};

use cinelayer_core::{
    query::{QueryVisitor, Expr, FieldOp, Query, SortDirection},
    error::DocumentStoreError,
};


/// Translates filter expressions into MongoDB query documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// query expressions into MongoDB's native BSON query syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` matches every document.
    pub fn filter(filter: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    /// Sort keys in the order they were added, or `None` when the query is unsorted.
    pub fn sort(query: &Query) -> Option<Document> {
        (!query.sort.is_empty()).then(|| {
            query.sort
                .iter()
                .map(|key| (key.field.clone(), Bson::Int32(match key.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                })))
                .collect()
        })
    }

    /// Inclusion projection for the query's field list.
    pub fn projection(query: &Query) -> Option<Document> {
        query.projection
            .as_ref()
            .map(|fields| fields
                .iter()
                .map(|field| (field.clone(), Bson::Int32(1)))
                .collect()
            )
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // `$not` is field-level only; `$nor` negates a whole clause.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::AnyOf | FieldOp::NoneOf => {
                    if !matches!(value, Bson::Array(_)) {
                        return Err(DocumentStoreError::InvalidQuery(format!(
                            "{op:?} on {field} requires an array of values"
                        )));
                    }

                    if *op == FieldOp::AnyOf {
                        doc! { "$in": value }
                    } else {
                        doc! { "$nin": value }
                    }
                },
            }
        })
    }

    fn visit_regex(&mut self, field: &str, pattern: &str, case_insensitive: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: if case_insensitive {
                doc! { "$regex": pattern, "$options": "i" }
            } else {
                doc! { "$regex": pattern }
            },
        })
    }
}
