//! Validated fetch requests

use thiserror::Error;
use tv_core::{FetchRequest, SessionId};

use crate::catalog::FieldEntry;
use crate::selection::{extract_field_selection, extract_sort_selection};

/// Rejections raised before any backend call is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No collection selected")]
    NoCollectionSelected,

    #[error("No field(s) selected")]
    NoFieldsSelected,
}

/// A fetch request that passed validation.
///
/// Only [`QuerySpecBuilder::build`] creates one, so a spec always names a
/// collection and at least one field.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    collection: String,
    skip: u64,
    limit: u64,
    included_fields: Vec<String>,
    sort_fields: Vec<bool>,
    session_ids: Option<Vec<SessionId>>,
}

impl QuerySpec {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn included_fields(&self) -> &[String] {
        &self.included_fields
    }

    /// Sort flags, index-aligned with [`QuerySpec::included_fields`]
    pub fn sort_fields(&self) -> &[bool] {
        &self.sort_fields
    }

    pub fn session_ids(&self) -> Option<&[SessionId]> {
        self.session_ids.as_deref()
    }

    /// Names of the included fields flagged for sorting, in catalog order.
    /// This is what the store sorts by (ascending).
    pub fn sort_keys(&self) -> Vec<String> {
        self.included_fields
            .iter()
            .zip(&self.sort_fields)
            .filter(|(_, sorted)| **sorted)
            .map(|(field, _)| field.clone())
            .collect()
    }

    /// Scope the fetch to the given sessions
    pub fn with_sessions(mut self, session_ids: Vec<SessionId>) -> Self {
        self.session_ids = Some(session_ids);
        self
    }

    /// Drop any session scope
    pub fn without_sessions(mut self) -> Self {
        self.session_ids = None;
        self
    }

    /// Store-facing request
    pub fn to_request(&self) -> FetchRequest {
        FetchRequest {
            collection: self.collection.clone(),
            skip: self.skip,
            limit: self.limit,
            fields: self.included_fields.clone(),
            sort: self.sort_keys(),
            sessions: self.session_ids.clone(),
        }
    }
}

/// Assembles a [`QuerySpec`] from the operator's selections
pub struct QuerySpecBuilder;

impl QuerySpecBuilder {
    /// Validate the selection and build the spec.
    ///
    /// Fields that are not included are dropped together with their sort
    /// flag, keeping `included_fields` and `sort_fields` aligned.
    pub fn build(
        collection: Option<&str>,
        fields: &[FieldEntry],
        skip: u64,
        limit: u64,
    ) -> Result<QuerySpec, QueryError> {
        let collection = collection.ok_or(QueryError::NoCollectionSelected)?;

        let included_fields = extract_field_selection(fields);
        if included_fields.is_empty() {
            return Err(QueryError::NoFieldsSelected);
        }
        let sort_fields = extract_sort_selection(fields);

        Ok(QuerySpec {
            collection: collection.to_string(),
            skip,
            limit,
            included_fields,
            sort_fields,
            session_ids: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;

    fn catalog() -> FieldCatalog {
        let mut catalog = FieldCatalog::from_keys("player", ["time", "health", "params.position"]);
        catalog.set_included("time", true);
        catalog.set_sorted("time", true);
        catalog.set_sorted("health", true);
        catalog.set_included("params.position", true);
        catalog
    }

    #[test]
    fn test_requires_collection() {
        let err = QuerySpecBuilder::build(None, catalog().entries(), 0, 10).unwrap_err();
        assert_eq!(err, QueryError::NoCollectionSelected);
    }

    #[test]
    fn test_requires_fields_for_any_window() {
        let empty = FieldCatalog::from_keys("player", ["time", "health"]);
        for (skip, limit) in [(0, 0), (0, 1000), (50, 1), (u64::MAX, u64::MAX)] {
            let err = QuerySpecBuilder::build(Some("player"), empty.entries(), skip, limit).unwrap_err();
            assert_eq!(err, QueryError::NoFieldsSelected);
        }
    }

    #[test]
    fn test_excluded_fields_drop_their_sort_flag() {
        let spec = QuerySpecBuilder::build(Some("player"), catalog().entries(), 5, 20).unwrap();

        assert_eq!(spec.collection(), "player");
        assert_eq!(spec.included_fields(), ["time", "params.position"]);
        assert_eq!(spec.sort_fields(), [true, false]);
        assert_eq!(spec.sort_keys(), vec!["time"]);
        assert_eq!(spec.session_ids(), None);
    }

    #[test]
    fn test_request_carries_sessions_only_when_scoped() {
        let spec = QuerySpecBuilder::build(Some("player"), catalog().entries(), 5, 20).unwrap();
        assert_eq!(spec.to_request().sessions, None);

        let scoped = spec.with_sessions(vec!["s1".into()]);
        let request = scoped.to_request();
        assert_eq!(request.sessions, Some(vec!["s1".to_string()]));
        assert_eq!(request.skip, 5);
        assert_eq!(request.limit, 20);
        assert_eq!(request.sort, vec!["time"]);

        assert_eq!(scoped.without_sessions().to_request().sessions, None);
    }
}
