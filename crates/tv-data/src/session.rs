//! Session pre-fetch for position mode

use std::sync::Arc;

use tracing::debug;
use tv_core::{ConnectionPort, PortResult, SessionId};

use crate::DataError;

/// Resolves the sessions played on a level
pub struct SessionResolver {
    port: Arc<dyn ConnectionPort>,
}

impl SessionResolver {
    pub fn new(port: Arc<dyn ConnectionPort>) -> Self {
        Self { port }
    }

    /// Look up the session ids for `level_key`.
    ///
    /// An empty answer is a valid "no sessions" result; only a failed
    /// lookup is an error.
    pub async fn resolve(&self, level_key: &str) -> Result<Vec<SessionId>, DataError> {
        match self.port.sessions_ids(level_key).await {
            PortResult::Ok(ids) => {
                debug!("Resolved {} session(s) for level key '{}'", ids.len(), level_key);
                Ok(ids)
            }
            PortResult::Empty => {
                debug!("No sessions for level key '{}'", level_key);
                Ok(Vec::new())
            }
            PortResult::Failed(reason) => Err(DataError::SessionLookup {
                level_key: level_key.to_string(),
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemoryDocumentStore;
    use serde_json::json;

    async fn connected_store() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new().with_collection(
            "telemetry",
            "session_start",
            vec![
                json!({"session_id": "a", "params": {"level_key": "forest"}}),
                json!({"session_id": "b", "params": {"level_key": "desert"}}),
                json!({"session_id": "c", "params": {"level_key": "forest"}}),
            ],
        );
        store.connect("mongodb://localhost:27017").await;
        store.select_database("telemetry").await;
        store
    }

    #[tokio::test]
    async fn test_resolves_sessions_for_level() {
        let resolver = SessionResolver::new(Arc::new(connected_store().await));
        let ids = resolver.resolve("forest").await.unwrap();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_level_is_empty_not_error() {
        let resolver = SessionResolver::new(Arc::new(connected_store().await));
        assert!(resolver.resolve("swamp").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_without_database_fails() {
        let resolver = SessionResolver::new(Arc::new(MemoryDocumentStore::new()));
        let err = resolver.resolve("forest").await.unwrap_err();
        assert!(matches!(err, DataError::SessionLookup { .. }));
    }
}
