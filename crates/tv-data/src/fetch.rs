//! Two-phase document retrieval

use std::sync::Arc;

use tracing::{debug, info};
use tv_core::{ConnectionPort, DocumentSet, ParserMode, PortResult};

use crate::query::QuerySpec;
use crate::session::SessionResolver;
use crate::DataError;

/// A completed fetch together with the spec it ran under
#[derive(Debug, Clone)]
pub struct FetchedDocuments {
    pub spec: QuerySpec,
    pub documents: DocumentSet,
}

/// Runs validated specs against the document store
pub struct DocumentFetcher {
    port: Arc<dyn ConnectionPort>,
    sessions: SessionResolver,
}

impl DocumentFetcher {
    pub fn new(port: Arc<dyn ConnectionPort>) -> Self {
        Self {
            sessions: SessionResolver::new(port.clone()),
            port,
        }
    }

    /// Fetch the documents described by `spec`.
    ///
    /// In position mode the session ids are resolved first and attached to
    /// the request; a failed lookup aborts before the document fetch. In
    /// every other mode the request carries no sessions, whatever the spec
    /// held before.
    pub async fn fetch(&self, spec: QuerySpec, mode: &ParserMode) -> Result<FetchedDocuments, DataError> {
        let spec = match mode {
            ParserMode::Position { level_key } => {
                let ids = self.sessions.resolve(level_key).await?;
                spec.with_sessions(ids)
            }
            ParserMode::None | ParserMode::Vector3 => spec.without_sessions(),
        };

        let request = spec.to_request();
        debug!(
            "Fetching {} field(s) from '{}' (skip {}, limit {}, sessions: {:?})",
            request.fields.len(),
            request.collection,
            request.skip,
            request.limit,
            request.sessions.as_ref().map(|s| s.len())
        );

        let documents = match self.port.fetch_documents(&request).await {
            PortResult::Ok(documents) => documents,
            PortResult::Empty => DocumentSet::with_fields(spec.included_fields()),
            PortResult::Failed(reason) => {
                return Err(DataError::Fetch {
                    collection: request.collection,
                    reason,
                })
            }
        };

        info!(
            "Fetched {} document(s) from '{}' via {}",
            documents.max_len(),
            spec.collection(),
            self.port.backend_name()
        );

        Ok(FetchedDocuments { spec, documents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::query::QuerySpecBuilder;
    use crate::sources::{MemoryDocumentStore, PortCall, RecordingPort};
    use serde_json::json;
    use tv_core::Value;

    async fn recording_port() -> Arc<RecordingPort<MemoryDocumentStore>> {
        let store = MemoryDocumentStore::new()
            .with_collection(
                "telemetry",
                "session_start",
                vec![
                    json!({"session_id": "s1", "params": {"level_key": "forest"}}),
                    json!({"session_id": "s2", "params": {"level_key": "desert"}}),
                ],
            )
            .with_collection(
                "telemetry",
                "player",
                vec![
                    json!({"session_id": "s1", "params": {"position": "1 2 3"}}),
                    json!({"session_id": "s2", "params": {"position": "4 5 6"}}),
                    json!({"session_id": "s1"}),
                ],
            );
        store.connect("mongodb://localhost:27017").await;
        store.select_database("telemetry").await;
        Arc::new(RecordingPort::new(store))
    }

    fn spec() -> QuerySpec {
        let mut catalog = FieldCatalog::from_keys("player", ["session_id", "params.position"]);
        catalog.include_all();
        QuerySpecBuilder::build(Some("player"), catalog.entries(), 0, 1000).unwrap()
    }

    #[tokio::test]
    async fn test_position_mode_resolves_sessions_first() {
        let port = recording_port().await;
        let fetcher = DocumentFetcher::new(port.clone());

        let fetched = fetcher.fetch(spec(), &ParserMode::position_for("forest")).await.unwrap();

        let calls = port.calls();
        assert_eq!(
            calls,
            vec![
                PortCall::SessionsIds("forest".into()),
                PortCall::FetchDocuments {
                    collection: "player".into(),
                    sessions: Some(vec!["s1".into()]),
                },
            ]
        );
        assert_eq!(fetched.spec.session_ids(), Some(&["s1".to_string()][..]));
        assert_eq!(
            fetched.documents.column("params.position").unwrap(),
            &[Value::from("1 2 3")]
        );
    }

    #[tokio::test]
    async fn test_other_modes_never_send_sessions() {
        for mode in [ParserMode::None, ParserMode::Vector3] {
            let port = recording_port().await;
            let fetcher = DocumentFetcher::new(port.clone());

            let stale = spec().with_sessions(vec!["old".into()]);
            let fetched = fetcher.fetch(stale, &mode).await.unwrap();

            assert_eq!(
                port.calls(),
                vec![PortCall::FetchDocuments {
                    collection: "player".into(),
                    sessions: None,
                }]
            );
            assert_eq!(fetched.documents.column("session_id").unwrap().len(), 3);
            assert_eq!(fetched.documents.column("params.position").unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_empty_session_list_still_fetches() {
        let port = recording_port().await;
        let fetcher = DocumentFetcher::new(port.clone());

        let fetched = fetcher.fetch(spec(), &ParserMode::position_for("swamp")).await.unwrap();

        assert_eq!(port.calls().len(), 2);
        assert_eq!(fetched.spec.session_ids(), Some(&[][..]));
        assert!(fetched.documents.is_empty());
        assert_eq!(fetched.documents.num_columns(), 2);
    }

    #[tokio::test]
    async fn test_failed_session_lookup_aborts_fetch() {
        let port = Arc::new(RecordingPort::new(MemoryDocumentStore::new()));
        let fetcher = DocumentFetcher::new(port.clone());

        let err = fetcher.fetch(spec(), &ParserMode::position()).await.unwrap_err();

        assert!(matches!(err, DataError::SessionLookup { .. }));
        assert_eq!(port.calls(), vec![PortCall::SessionsIds("level_key".into())]);
    }
}
