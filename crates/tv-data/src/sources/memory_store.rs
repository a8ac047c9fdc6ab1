//! In-memory document store

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use tv_core::ports::{LEVEL_KEY_FIELD, MAX_SESSIONS, POSITION_FIELD, SESSION_COLLECTION, SESSION_ID_FIELD};
use tv_core::{ConnectOutcome, ConnectionPort, DocumentSet, FetchRequest, PortResult, SessionId, Value};

use super::{compare_json, document_keys, lookup_path};

type Collections = IndexMap<String, Vec<JsonValue>>;

#[derive(Debug, Default)]
struct Session {
    address: Option<String>,
    database: Option<String>,
}

/// Document store holding JSON documents in memory.
///
/// Follows the query semantics of a document database: dotted field paths,
/// projection of missing fields as absent values, ascending sorts,
/// skip/limit with a zero limit meaning "no limit".
pub struct MemoryDocumentStore {
    databases: RwLock<IndexMap<String, Collections>>,
    reachable: Option<String>,
    session: RwLock<Session>,
}

impl MemoryDocumentStore {
    /// Store that accepts any server address
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(IndexMap::new()),
            reachable: None,
            session: RwLock::new(Session::default()),
        }
    }

    /// Store that only accepts `address`
    pub fn reachable_at(mut self, address: impl Into<String>) -> Self {
        self.reachable = Some(address.into());
        self
    }

    /// Builder variant of [`MemoryDocumentStore::insert_documents`]
    pub fn with_collection(self, database: &str, collection: &str, documents: Vec<JsonValue>) -> Self {
        self.insert_documents(database, collection, documents);
        self
    }

    /// Append documents, creating database and collection as needed
    pub fn insert_documents(&self, database: &str, collection: &str, documents: Vec<JsonValue>) {
        let mut databases = self.databases.write();
        databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Run `f` on a collection of the selected database
    fn with_selected<T>(&self, collection: &str, f: impl FnOnce(&[JsonValue]) -> PortResult<T>) -> PortResult<T> {
        let session = self.session.read();
        let Some(database) = session.database.as_deref() else {
            return PortResult::Failed("no database selected".to_string());
        };

        let databases = self.databases.read();
        match databases.get(database).and_then(|c| c.get(collection)) {
            Some(documents) => f(documents),
            None => PortResult::Failed(format!("unknown collection '{}'", collection)),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a document passes the session scope of a request
fn in_sessions(document: &JsonValue, sessions: &[SessionId]) -> bool {
    if lookup_path(document, POSITION_FIELD).is_none() {
        return false;
    }
    lookup_path(document, SESSION_ID_FIELD)
        .and_then(JsonValue::as_str)
        .map(|id| sessions.iter().any(|s| s == id))
        .unwrap_or(false)
}

#[async_trait]
impl ConnectionPort for MemoryDocumentStore {
    async fn connect(&self, address: &str) -> PortResult<ConnectOutcome> {
        if let Some(reachable) = &self.reachable {
            if reachable != address {
                return PortResult::Failed(format!("no server at {}", address));
            }
        }

        let mut session = self.session.write();
        if session.address.as_deref() == Some(address) {
            return PortResult::Ok(ConnectOutcome::AlreadyConnected);
        }
        session.address = Some(address.to_string());
        session.database = None;
        PortResult::Ok(ConnectOutcome::Connected)
    }

    async fn select_database(&self, name: &str) -> PortResult<Vec<String>> {
        let mut session = self.session.write();
        if session.address.is_none() {
            return PortResult::Failed("not connected".to_string());
        }

        let databases = self.databases.read();
        let collections: Vec<String> = databases
            .get(name)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        if !collections.is_empty() {
            session.database = Some(name.to_string());
        }
        PortResult::from_vec(collections)
    }

    async fn fetch_field_keys(&self, collection: &str) -> PortResult<Vec<String>> {
        self.with_selected(collection, |documents| match documents.first() {
            Some(first) => PortResult::from_vec(document_keys(first)),
            None => PortResult::Empty,
        })
    }

    async fn sessions_ids(&self, level_key: &str) -> PortResult<Vec<SessionId>> {
        let session = self.session.read();
        let Some(database) = session.database.as_deref() else {
            return PortResult::Failed("no database selected".to_string());
        };

        let databases = self.databases.read();
        let Some(documents) = databases.get(database).and_then(|c| c.get(SESSION_COLLECTION)) else {
            return PortResult::Empty;
        };

        let ids = documents
            .iter()
            .filter(|doc| lookup_path(doc, LEVEL_KEY_FIELD).and_then(JsonValue::as_str) == Some(level_key))
            .filter_map(|doc| lookup_path(doc, SESSION_ID_FIELD).and_then(JsonValue::as_str))
            .take(MAX_SESSIONS)
            .map(str::to_string)
            .collect();
        PortResult::from_vec(ids)
    }

    async fn fetch_documents(&self, request: &FetchRequest) -> PortResult<DocumentSet> {
        self.with_selected(&request.collection, |documents| {
            let mut matched: Vec<&JsonValue> = documents
                .iter()
                .filter(|doc| match &request.sessions {
                    Some(sessions) => in_sessions(doc, sessions),
                    None => true,
                })
                .collect();

            if !request.sort.is_empty() {
                matched.sort_by(|a, b| {
                    request
                        .sort
                        .iter()
                        .map(|key| compare_json(lookup_path(a, key), lookup_path(b, key)))
                        .find(|ordering| ordering.is_ne())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }

            let limit = if request.limit == 0 { usize::MAX } else { request.limit as usize };
            let page: Vec<&JsonValue> = matched
                .into_iter()
                .skip(request.skip as usize)
                .take(limit)
                .collect();

            if page.is_empty() {
                return PortResult::Empty;
            }

            let mut set = DocumentSet::with_fields(&request.fields);
            for document in page {
                for field in &request.fields {
                    if let Some(value) = lookup_path(document, field) {
                        set.push(field, Value::from_json(value));
                    }
                }
            }
            PortResult::Ok(set)
        })
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
