//! Document store port

use async_trait::async_trait;

use super::PortResult;
use crate::document::DocumentSet;

/// Opaque key scoping which documents are visible in position mode
pub type SessionId = String;

/// Collection holding one document per played session
pub const SESSION_COLLECTION: &str = "session_start";

/// Session id field, both in the session collection and in scoped documents
pub const SESSION_ID_FIELD: &str = "session_id";

/// Field of a session document naming the level it was played on
pub const LEVEL_KEY_FIELD: &str = "params.level_key";

/// Only documents carrying this field are returned by a session-scoped fetch
pub const POSITION_FIELD: &str = "params.position";

/// Upper bound on resolved sessions per lookup
pub const MAX_SESSIONS: usize = 3000;

/// Result of a connect call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new connection was opened
    Connected,
    /// The port was already connected to this address
    AlreadyConnected,
}

/// Arguments of a document fetch, as handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub collection: String,
    pub skip: u64,
    /// Zero means no limit
    pub limit: u64,
    /// Projected fields, in column order
    pub fields: Vec<String>,
    /// Fields to sort by, ascending, in priority order
    pub sort: Vec<String>,
    /// Only set in position mode
    pub sessions: Option<Vec<SessionId>>,
}

/// Connection to a document store.
///
/// Every call reports through [`PortResult`] so callers can tell an empty
/// answer from a failure.
#[async_trait]
pub trait ConnectionPort: Send + Sync {
    /// Connect to a server address
    async fn connect(&self, address: &str) -> PortResult<ConnectOutcome>;

    /// Select a database and list its collections
    async fn select_database(&self, name: &str) -> PortResult<Vec<String>>;

    /// List the field keys of a collection
    async fn fetch_field_keys(&self, collection: &str) -> PortResult<Vec<String>>;

    /// Resolve the sessions played on a level
    async fn sessions_ids(&self, level_key: &str) -> PortResult<Vec<SessionId>>;

    /// Fetch a columnar document set
    async fn fetch_documents(&self, request: &FetchRequest) -> PortResult<DocumentSet>;

    /// Short backend name for logs
    fn backend_name(&self) -> &str;
}
