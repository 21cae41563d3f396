//! Partial update descriptors.
//!
//! An [`Update`] is an ordered list of `path -> value` assignments merged into a
//! single stored document. Paths use dot notation to reach into embedded
//! documents (`"tags.favorited"`). Paths are validated when added so a caller can
//! never inject store operators through a field name.

use bson::Bson;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// An ordered set of field assignments applied as a partial merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    assignments: Vec<(String, Bson)>,
}

impl Update {
    pub fn new() -> Self {
        Update::default()
    }

    /// Creates an update holding a single assignment.
    pub fn set(path: impl Into<String>, value: impl Into<Bson>) -> DocumentStoreResult<Self> {
        Update::new().and_set(path, value)
    }

    /// Adds an assignment. A later assignment to the same path replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] when the path is not a plain field path.
    pub fn and_set(mut self, path: impl Into<String>, value: impl Into<Bson>) -> DocumentStoreResult<Self> {
        let path = path.into();
        validate_path(&path)?;

        let value = value.into();
        match self.assignments.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, slot)) => *slot = value,
            None => self.assignments.push((path, value)),
        }

        Ok(self)
    }

    /// The assignments in insertion order.
    pub fn assignments(&self) -> &[(String, Bson)] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Checks that a dotted path names plain fields only.
///
/// Rejects empty paths, empty segments (`"a..b"`), segments starting with `$`,
/// and NUL bytes.
pub fn validate_path(path: &str) -> DocumentStoreResult<()> {
    if path.is_empty() {
        return Err(DocumentStoreError::InvalidQuery("field path is empty".to_string()));
    }

    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(DocumentStoreError::InvalidQuery(format!(
                "field path {path:?} contains an empty segment"
            )));
        }
        if segment.starts_with('$') {
            return Err(DocumentStoreError::InvalidQuery(format!(
                "field path {path:?} contains an operator segment"
            )));
        }
        if segment.contains('\0') {
            return Err(DocumentStoreError::InvalidQuery(format!(
                "field path {path:?} contains a NUL byte"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_assignment_replaces_earlier_one() {
        let update = Update::set("watched", true)
            .and_then(|u| u.and_set("tags.queued", Bson::Null))
            .and_then(|u| u.and_set("watched", false))
            .unwrap();

        assert_eq!(
            update.assignments(),
            &[
                ("watched".to_string(), Bson::Boolean(false)),
                ("tags.queued".to_string(), Bson::Null),
            ]
        );
    }

    #[test]
    fn operator_segments_are_rejected() {
        assert!(Update::set("$where", 1).is_err());
        assert!(Update::set("tags.$inc", 1).is_err());
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(validate_path("").is_err());
        assert!(validate_path("tags..favorited").is_err());
        assert!(validate_path("tags.").is_err());
        assert!(validate_path("ta\0gs").is_err());
        assert!(validate_path("tags.favorited").is_ok());
    }
}
