//! SQLite document store implementation
//!
//! A directory of SQLite files stands in for a document server: each
//! `<name>.db` file is a database, each table a collection, each column a
//! field and each row a document. A NULL column counts as a missing field.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use tracing::debug;
use tv_core::ports::{LEVEL_KEY_FIELD, MAX_SESSIONS, POSITION_FIELD, SESSION_COLLECTION, SESSION_ID_FIELD};
use tv_core::{ConnectOutcome, ConnectionPort, DocumentSet, FetchRequest, PortResult, SessionId, Value};

use crate::DataError;

#[derive(Debug, Default)]
struct Session {
    address: Option<String>,
    database: Option<PathBuf>,
}

/// SQLite-backed document store
pub struct SqliteDocumentStore {
    root: PathBuf,
    session: RwLock<Session>,
}

impl SqliteDocumentStore {
    /// Open a store over a directory of `.db` files
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, DataError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DataError::BackendUnavailable(format!(
                "SQLite data directory '{}' does not exist",
                root.display()
            )));
        }

        Ok(Self {
            root,
            session: RwLock::new(Session::default()),
        })
    }

    fn database_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.db", name))
    }

    /// Read-only connection to the selected database
    fn connection(&self) -> Result<Connection, DataError> {
        let path = self
            .session
            .read()
            .database
            .clone()
            .ok_or_else(|| DataError::Sqlite("no database selected".to_string()))?;
        Self::open_database(&path)
    }

    fn open_database(path: &Path) -> Result<Connection, DataError> {
        Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| DataError::Sqlite(format!("Failed to open database '{}': {}", path.display(), e)))
    }

    /// Quote an identifier for interpolation
    fn quote(identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn list_tables(conn: &Connection) -> Result<Vec<String>, DataError> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Column names of a known table, `None` if the table does not exist
    fn table_columns(conn: &Connection, table: &str) -> Result<Option<Vec<String>>, DataError> {
        if !Self::list_tables(conn)?.iter().any(|t| t == table) {
            return Ok(None);
        }

        let query = format!("PRAGMA table_info({})", Self::quote(table));
        let mut stmt = conn.prepare(&query)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(columns))
    }

    /// `None` for NULL, which marks the field as missing in this document
    fn to_value(value: ValueRef<'_>) -> Option<Value> {
        match value {
            ValueRef::Null => None,
            ValueRef::Integer(i) => Some(Value::Number(i as f64)),
            ValueRef::Real(f) => Some(Value::Number(f)),
            ValueRef::Text(t) => Some(Value::Text(String::from_utf8_lossy(t).into_owned())),
            ValueRef::Blob(_) => Some(Value::Null),
        }
    }

    fn field_keys(&self, collection: &str) -> Result<PortResult<Vec<String>>, DataError> {
        let conn = self.connection()?;
        let Some(columns) = Self::table_columns(&conn, collection)? else {
            return Ok(PortResult::Failed(format!("unknown collection '{}'", collection)));
        };
        let keys = columns.into_iter().filter(|c| c != "_id").collect();
        Ok(PortResult::from_vec(keys))
    }

    fn query_sessions(&self, level_key: &str) -> Result<PortResult<Vec<SessionId>>, DataError> {
        let conn = self.connection()?;
        let Some(columns) = Self::table_columns(&conn, SESSION_COLLECTION)? else {
            return Ok(PortResult::Empty);
        };
        if !columns.iter().any(|c| c == SESSION_ID_FIELD) || !columns.iter().any(|c| c == LEVEL_KEY_FIELD) {
            return Ok(PortResult::Failed(format!(
                "'{}' lacks '{}' or '{}'",
                SESSION_COLLECTION, SESSION_ID_FIELD, LEVEL_KEY_FIELD
            )));
        }

        let query = format!(
            "SELECT {} FROM {} WHERE {} = ?1 LIMIT {}",
            Self::quote(SESSION_ID_FIELD),
            Self::quote(SESSION_COLLECTION),
            Self::quote(LEVEL_KEY_FIELD),
            MAX_SESSIONS
        );
        let mut stmt = conn.prepare(&query)?;
        let mut rows = stmt.query([level_key])?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            match row.get_ref(0)? {
                ValueRef::Text(t) => ids.push(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Integer(i) => ids.push(i.to_string()),
                _ => {}
            }
        }
        Ok(PortResult::from_vec(ids))
    }

    fn query_documents(&self, request: &FetchRequest) -> Result<PortResult<DocumentSet>, DataError> {
        let conn = self.connection()?;
        let Some(columns) = Self::table_columns(&conn, &request.collection)? else {
            return Ok(PortResult::Failed(format!("unknown collection '{}'", request.collection)));
        };
        let has_column = |name: &str| columns.iter().any(|c| c == name);

        // Fields the table does not have are missing from every document
        let present: Vec<&String> = request.fields.iter().filter(|f| has_column(f)).collect();
        if present.is_empty() {
            return Ok(PortResult::Empty);
        }

        let mut params: Vec<rusqlite::types::Value> = Vec::new();
        let mut query = format!(
            "SELECT {} FROM {}",
            present.iter().map(|f| Self::quote(f)).collect::<Vec<_>>().join(", "),
            Self::quote(&request.collection)
        );

        if let Some(sessions) = &request.sessions {
            if sessions.is_empty() || !has_column(POSITION_FIELD) || !has_column(SESSION_ID_FIELD) {
                return Ok(PortResult::Empty);
            }
            let placeholders = vec!["?"; sessions.len()].join(", ");
            query.push_str(&format!(
                " WHERE {} IS NOT NULL AND {} IN ({})",
                Self::quote(POSITION_FIELD),
                Self::quote(SESSION_ID_FIELD),
                placeholders
            ));
            params.extend(sessions.iter().cloned().map(rusqlite::types::Value::Text));
        }

        let sort: Vec<String> = request
            .sort
            .iter()
            .filter(|f| has_column(f))
            .map(|f| format!("{} ASC", Self::quote(f)))
            .collect();
        if !sort.is_empty() {
            query.push_str(&format!(" ORDER BY {}", sort.join(", ")));
        }

        let limit = if request.limit == 0 { -1 } else { i64::try_from(request.limit).unwrap_or(i64::MAX) };
        query.push_str(" LIMIT ? OFFSET ?");
        params.push(rusqlite::types::Value::Integer(limit));
        params.push(rusqlite::types::Value::Integer(i64::try_from(request.skip).unwrap_or(i64::MAX)));

        debug!("SQLite fetch: {}", query);

        let mut stmt = conn.prepare(&query)?;
        let mut rows = stmt.query(params_from_iter(params))?;

        let mut set = DocumentSet::with_fields(&request.fields);
        let mut row_count = 0usize;
        while let Some(row) = rows.next()? {
            row_count += 1;
            for (idx, field) in present.iter().enumerate() {
                if let Some(value) = Self::to_value(row.get_ref(idx)?) {
                    set.push(field, value);
                }
            }
        }

        if row_count == 0 {
            return Ok(PortResult::Empty);
        }
        Ok(PortResult::Ok(set))
    }
}

/// Collapse a store error into a failed port result
fn settle<T>(result: Result<PortResult<T>, DataError>) -> PortResult<T> {
    result.unwrap_or_else(|e| PortResult::Failed(e.to_string()))
}

#[async_trait]
impl ConnectionPort for SqliteDocumentStore {
    async fn connect(&self, address: &str) -> PortResult<ConnectOutcome> {
        let mut session = self.session.write();
        if session.address.as_deref() == Some(address) {
            return PortResult::Ok(ConnectOutcome::AlreadyConnected);
        }
        session.address = Some(address.to_string());
        session.database = None;
        PortResult::Ok(ConnectOutcome::Connected)
    }

    async fn select_database(&self, name: &str) -> PortResult<Vec<String>> {
        if self.session.read().address.is_none() {
            return PortResult::Failed("not connected".to_string());
        }

        let path = self.database_path(name);
        if !path.is_file() {
            return PortResult::Failed(format!("database '{}' not found", name));
        }

        let tables = Self::open_database(&path).and_then(|conn| Self::list_tables(&conn));
        match tables {
            Ok(tables) => {
                self.session.write().database = Some(path);
                PortResult::from_vec(tables)
            }
            Err(e) => PortResult::Failed(e.to_string()),
        }
    }

    async fn fetch_field_keys(&self, collection: &str) -> PortResult<Vec<String>> {
        settle(self.field_keys(collection))
    }

    async fn sessions_ids(&self, level_key: &str) -> PortResult<Vec<SessionId>> {
        settle(self.query_sessions(level_key))
    }

    async fn fetch_documents(&self, request: &FetchRequest) -> PortResult<DocumentSet> {
        settle(self.query_documents(request))
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("telemetry.db")).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE session_start ("session_id" TEXT, "params.level_key" TEXT);
            INSERT INTO session_start VALUES ('s1', 'forest'), ('s2', 'desert'), ('s3', 'forest');
            CREATE TABLE player ("_id" INTEGER, "session_id" TEXT, "params.position" TEXT, "health" REAL);
            INSERT INTO player VALUES
                (1, 's1', '0 0 0', 100.0),
                (2, 's2', '1 1 1', 80.0),
                (3, 's3', '2 2 2', NULL),
                (4, 's1', NULL, 50.0);
            "#,
        )
        .unwrap();
        dir
    }

    async fn connected(dir: &TempDir) -> SqliteDocumentStore {
        let store = SqliteDocumentStore::open(dir.path()).unwrap();
        store.connect("sqlite://local").await;
        store
    }

    fn request(sessions: Option<Vec<SessionId>>) -> FetchRequest {
        FetchRequest {
            collection: "player".into(),
            skip: 0,
            limit: 1000,
            fields: vec!["params.position".into(), "health".into()],
            sort: vec!["health".into()],
            sessions,
        }
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let err = SqliteDocumentStore::open("/definitely/not/here").err().unwrap();
        assert!(matches!(err, DataError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_select_database_lists_tables() {
        let dir = seed();
        let store = connected(&dir).await;

        assert_eq!(
            store.select_database("telemetry").await,
            PortResult::Ok(vec!["player".to_string(), "session_start".to_string()])
        );
        assert!(store.select_database("nope").await.is_failed());
    }

    #[tokio::test]
    async fn test_field_keys_skip_id() {
        let dir = seed();
        let store = connected(&dir).await;
        store.select_database("telemetry").await;

        assert_eq!(
            store.fetch_field_keys("player").await,
            PortResult::Ok(vec![
                "session_id".to_string(),
                "params.position".to_string(),
                "health".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_sessions_by_level() {
        let dir = seed();
        let store = connected(&dir).await;
        store.select_database("telemetry").await;

        assert_eq!(
            store.sessions_ids("forest").await,
            PortResult::Ok(vec!["s1".to_string(), "s3".to_string()])
        );
        assert!(store.sessions_ids("swamp").await.is_empty());
    }

    #[tokio::test]
    async fn test_null_columns_are_missing_fields() {
        let dir = seed();
        let store = connected(&dir).await;
        store.select_database("telemetry").await;

        let PortResult::Ok(set) = store.fetch_documents(&request(None)).await else {
            panic!("expected documents");
        };
        assert_eq!(set.column("params.position").unwrap().len(), 3);
        // NULL health sorts first and is skipped
        assert_eq!(
            set.column("health").unwrap(),
            &[Value::from(50.0), Value::from(80.0), Value::from(100.0)]
        );
    }

    #[tokio::test]
    async fn test_session_scope_requires_position() {
        let dir = seed();
        let store = connected(&dir).await;
        store.select_database("telemetry").await;

        let PortResult::Ok(set) = store.fetch_documents(&request(Some(vec!["s1".into(), "s3".into()]))).await else {
            panic!("expected documents");
        };
        assert_eq!(
            set.column("params.position").unwrap(),
            &[Value::from("2 2 2"), Value::from("0 0 0")]
        );
        assert!(store.fetch_documents(&request(Some(Vec::new()))).await.is_empty());
    }
}
