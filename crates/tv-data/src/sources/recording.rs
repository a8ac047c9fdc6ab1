//! Port wrapper that records every call

use async_trait::async_trait;
use parking_lot::Mutex;
use tv_core::{ConnectOutcome, ConnectionPort, DocumentSet, FetchRequest, PortResult, SessionId};

/// A call seen by a [`RecordingPort`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    Connect(String),
    SelectDatabase(String),
    FetchFieldKeys(String),
    SessionsIds(String),
    FetchDocuments {
        collection: String,
        sessions: Option<Vec<SessionId>>,
    },
}

/// Forwards to an inner port and keeps the call log, in call order
pub struct RecordingPort<P> {
    inner: P,
    calls: Mutex<Vec<PortCall>>,
}

impl<P: ConnectionPort> RecordingPort<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PortCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: PortCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl<P: ConnectionPort> ConnectionPort for RecordingPort<P> {
    async fn connect(&self, address: &str) -> PortResult<ConnectOutcome> {
        self.record(PortCall::Connect(address.to_string()));
        self.inner.connect(address).await
    }

    async fn select_database(&self, name: &str) -> PortResult<Vec<String>> {
        self.record(PortCall::SelectDatabase(name.to_string()));
        self.inner.select_database(name).await
    }

    async fn fetch_field_keys(&self, collection: &str) -> PortResult<Vec<String>> {
        self.record(PortCall::FetchFieldKeys(collection.to_string()));
        self.inner.fetch_field_keys(collection).await
    }

    async fn sessions_ids(&self, level_key: &str) -> PortResult<Vec<SessionId>> {
        self.record(PortCall::SessionsIds(level_key.to_string()));
        self.inner.sessions_ids(level_key).await
    }

    async fn fetch_documents(&self, request: &FetchRequest) -> PortResult<DocumentSet> {
        self.record(PortCall::FetchDocuments {
            collection: request.collection.clone(),
            sessions: request.sessions.clone(),
        });
        self.inner.fetch_documents(request).await
    }

    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }
}
