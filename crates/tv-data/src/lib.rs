//! Query, fetch and projection stages of the telemetry pipeline

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod projection;
pub mod query;
pub mod selection;
pub mod session;
pub mod sources;

use arrow::error::ArrowError;
use thiserror::Error;

// Re-exports
pub use catalog::{FieldCatalog, FieldEntry};
pub use config::ViewerConfig;
pub use fetch::{DocumentFetcher, FetchedDocuments};
pub use projection::{Row, RowProjector};
pub use query::{QueryError, QuerySpec, QuerySpecBuilder};
pub use selection::{extract_column, extract_field_selection, extract_sort_selection};
pub use session::SessionResolver;
pub use sources::{MemoryDocumentStore, SqliteDocumentStore};
#[cfg(any(test, feature = "test-util"))]
pub use sources::RecordingPort;

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("SQLite error: {0}")]
    Sqlite(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("session lookup for level key '{level_key}' failed: {reason}")]
    SessionLookup { level_key: String, reason: String },

    #[error("fetch from '{collection}' failed: {reason}")]
    Fetch { collection: String, reason: String },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for DataError {
    fn from(error: rusqlite::Error) -> Self {
        DataError::Sqlite(error.to_string())
    }
}

impl From<toml::de::Error> for DataError {
    fn from(error: toml::de::Error) -> Self {
        DataError::Config(error.to_string())
    }
}
