//! Pipeline state and the operations that change it

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use tv_core::events::{events, EventBus};
use tv_core::{
    ConnectOutcome, ConnectionPort, ConnectionSettings, FetchSettings, ParserMode, PortResult, ViewportBridge,
    ViewportCommand, ViewportError, VisualizationSettings,
};
use tv_data::{
    DataError, DocumentFetcher, FetchedDocuments, FieldCatalog, FieldEntry, QueryError, QuerySpec, QuerySpecBuilder,
    Row, RowProjector,
};
use tv_views::{VisualizationBinder, VisualizationConfig, VisualizationError, VisualizationRegistry};

/// Errors surfaced to the operator
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("No database name given")]
    NoDatabaseName,

    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown row: {0}")]
    UnknownRow(usize),

    #[error("fetch {generation} superseded by fetch {latest}")]
    Superseded { generation: u64, latest: u64 },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Visualization(#[from] VisualizationError),

    #[error("Viewer is shut down")]
    Closed,
}

/// A validated fetch waiting to run
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub generation: u64,
    pub spec: QuerySpec,
    pub mode: ParserMode,
}

/// Copy of the viewer state, for display
#[derive(Debug, Clone, Default)]
pub struct ViewerSnapshot {
    pub address: Option<String>,
    pub database: Option<String>,
    pub collections: Vec<String>,
    pub catalog: Option<FieldCatalog>,
    pub mode: ParserMode,
    pub fetch: FetchSettings,
    pub fetched_fields: Vec<String>,
    pub rows: Vec<Row>,
    pub generation: u64,
}

/// Owns the pipeline state. Every mutation goes through `&mut self`.
pub struct TelemetryViewer {
    port: Arc<dyn ConnectionPort>,
    viewport: Arc<dyn ViewportBridge>,
    fetcher: Arc<DocumentFetcher>,
    binder: VisualizationBinder,
    events: Arc<EventBus>,
    state: ViewerSnapshot,
}

impl TelemetryViewer {
    pub fn new(port: Arc<dyn ConnectionPort>, viewport: Arc<dyn ViewportBridge>, events: Arc<EventBus>) -> Self {
        Self::with_registry(port, viewport, events, VisualizationRegistry::with_defaults())
    }

    pub fn with_registry(
        port: Arc<dyn ConnectionPort>,
        viewport: Arc<dyn ViewportBridge>,
        events: Arc<EventBus>,
        registry: VisualizationRegistry,
    ) -> Self {
        Self {
            fetcher: Arc::new(DocumentFetcher::new(port.clone())),
            binder: VisualizationBinder::new(registry, viewport.clone()),
            port,
            viewport,
            events,
            state: ViewerSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        self.state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }

    pub fn fetcher(&self) -> Arc<DocumentFetcher> {
        self.fetcher.clone()
    }

    /// Fire-and-forget: a refused command is logged, never fatal
    async fn raise(&self, command: ViewportCommand) {
        let event = command.event_name();
        if let Err(e) = self.viewport.raise(command).await {
            match e {
                ViewportError::NotReady => warn!("Viewport host stopped before it was ready, dropped '{}'", event),
                ViewportError::Closed => warn!("Viewport closed, dropped '{}'", event),
            }
        }
    }

    /// Drop everything derived from the current collection
    fn reset_collection(&mut self) {
        self.state.catalog = None;
        self.state.rows.clear();
        self.state.fetched_fields.clear();
        self.state.generation += 1;
    }

    pub async fn connect(&mut self, settings: &ConnectionSettings) -> Result<ConnectOutcome, ViewerError> {
        let address = settings
            .address()
            .ok_or_else(|| ViewerError::ConnectionFailure("ip and port are required".to_string()))?;

        match self.port.connect(&address).await {
            PortResult::Ok(ConnectOutcome::AlreadyConnected) => {
                info!("Already connected to {}", address);
                Ok(ConnectOutcome::AlreadyConnected)
            }
            PortResult::Ok(ConnectOutcome::Connected) => {
                info!("Connected to {} via {}", address, self.port.backend_name());
                self.state.address = Some(address.clone());
                self.state.database = None;
                self.state.collections.clear();
                self.reset_collection();

                self.raise(ViewportCommand::ConnectToDatabase(address.clone())).await;
                self.events.publish(events::Connected { address });
                Ok(ConnectOutcome::Connected)
            }
            PortResult::Empty => Err(ViewerError::ConnectionFailure(format!("no answer from {}", address))),
            PortResult::Failed(reason) => {
                warn!("Connecting to {} failed: {}", address, reason);
                Err(ViewerError::ConnectionFailure(reason))
            }
        }
    }

    /// Select a database and list its collections.
    ///
    /// A database without collections is a failure and leaves the previous
    /// selection in place.
    pub async fn select_database(&mut self, name: &str) -> Result<Vec<String>, ViewerError> {
        let name = name.trim();
        if name.is_empty() {
            warn!("Select database: no database name given");
            return Err(ViewerError::NoDatabaseName);
        }

        let collections = match self.port.select_database(name).await {
            PortResult::Ok(collections) => collections,
            PortResult::Empty => {
                warn!("Database '{}' has no collections", name);
                return Err(ViewerError::ConnectionFailure(format!("database '{}' has no collections", name)));
            }
            PortResult::Failed(reason) => {
                warn!("Selecting database '{}' failed: {}", name, reason);
                return Err(ViewerError::ConnectionFailure(reason));
            }
        };

        info!("Selected database '{}' with {} collection(s)", name, collections.len());
        self.state.database = Some(name.to_string());
        self.state.collections = collections.clone();
        self.reset_collection();

        self.raise(ViewportCommand::SelectDatabase(name.to_string())).await;
        self.events.publish(events::DatabaseSelected {
            name: name.to_string(),
            collection_count: collections.len(),
        });
        Ok(collections)
    }

    /// Select a collection and load a fresh field catalog
    pub async fn select_collection(&mut self, collection: &str) -> Result<&[FieldEntry], ViewerError> {
        if !self.state.collections.iter().any(|c| c == collection) {
            return Err(ViewerError::UnknownCollection(collection.to_string()));
        }

        let keys = match self.port.fetch_field_keys(collection).await {
            PortResult::Ok(keys) => keys,
            PortResult::Empty => Vec::new(),
            PortResult::Failed(reason) => {
                warn!("Fetching field keys of '{}' failed: {}", collection, reason);
                return Err(ViewerError::ConnectionFailure(reason));
            }
        };

        self.reset_collection();
        let catalog = FieldCatalog::from_keys(collection, keys);
        debug!("Collection '{}' has {} field(s)", collection, catalog.len());
        self.events.publish(events::CollectionSelected {
            collection: collection.to_string(),
            field_count: catalog.len(),
        });

        Ok(self.state.catalog.insert(catalog).entries())
    }

    /// Switch parser mode. Rows fetched under the previous mode are dropped
    /// and a fetch issued under it can no longer install rows.
    pub fn set_parser_mode(&mut self, mode: ParserMode) {
        if mode == self.state.mode {
            return;
        }
        info!("Parser mode: {} -> {}", self.state.mode, mode);
        self.state.mode = mode;
        self.state.rows.clear();
        self.state.fetched_fields.clear();
        self.state.generation += 1;
    }

    fn catalog_mut(&mut self) -> Result<&mut FieldCatalog, ViewerError> {
        self.state
            .catalog
            .as_mut()
            .ok_or(ViewerError::Query(QueryError::NoCollectionSelected))
    }

    pub fn set_field_included(&mut self, field: &str, included: bool) -> Result<(), ViewerError> {
        if self.catalog_mut()?.set_included(field, included) {
            Ok(())
        } else {
            Err(ViewerError::UnknownField(field.to_string()))
        }
    }

    pub fn set_field_sorted(&mut self, field: &str, sorted: bool) -> Result<(), ViewerError> {
        if self.catalog_mut()?.set_sorted(field, sorted) {
            Ok(())
        } else {
            Err(ViewerError::UnknownField(field.to_string()))
        }
    }

    pub fn include_all_fields(&mut self) -> Result<usize, ViewerError> {
        let catalog = self.catalog_mut()?;
        catalog.include_all();
        Ok(catalog.len())
    }

    pub fn set_fetch_window(&mut self, window: FetchSettings) {
        self.state.fetch = window;
    }

    /// Validate the current selection and claim a new generation.
    ///
    /// Rejections happen here, before any port call.
    pub fn prepare_fetch(&mut self) -> Result<PendingFetch, ViewerError> {
        let (collection, entries) = match &self.state.catalog {
            Some(catalog) => (Some(catalog.collection()), catalog.entries()),
            None => (None, &[][..]),
        };

        let spec = QuerySpecBuilder::build(collection, entries, self.state.fetch.skip, self.state.fetch.limit)
            .map_err(|e| {
                warn!("Fetch rejected: {}", e);
                e
            })?;

        self.state.generation += 1;
        Ok(PendingFetch {
            generation: self.state.generation,
            spec,
            mode: self.state.mode.clone(),
        })
    }

    /// Install the result of a fetch, unless a newer one was issued since
    pub fn complete_fetch(
        &mut self,
        generation: u64,
        result: Result<FetchedDocuments, DataError>,
    ) -> Result<usize, ViewerError> {
        if generation != self.state.generation {
            return Err(self.supersede(generation));
        }

        let fetched = result?;
        let rows = RowProjector::project(&fetched.documents);
        let row_count = rows.len();

        self.events.publish(events::DocumentsFetched {
            collection: fetched.spec.collection().to_string(),
            generation,
            row_count,
            column_count: fetched.documents.num_columns(),
        });
        self.state.fetched_fields = fetched.spec.included_fields().to_vec();
        self.state.rows = rows;
        Ok(row_count)
    }

    /// Report a fetch older than the current generation
    pub fn supersede(&self, generation: u64) -> ViewerError {
        let latest = self.state.generation;
        debug!("Dropping fetch {} (latest is {})", generation, latest);
        self.events.publish(events::FetchSuperseded { generation, latest });
        ViewerError::Superseded { generation, latest }
    }

    pub fn set_row_included(&mut self, id: usize, included: bool) -> Result<(), ViewerError> {
        let row = self
            .state
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(ViewerError::UnknownRow(id))?;
        row.is_included = included;
        Ok(())
    }

    pub fn include_all_rows(&mut self) -> usize {
        for row in &mut self.state.rows {
            row.is_included = true;
        }
        self.state.rows.len()
    }

    /// Bind the included rows and raise them on the viewport.
    ///
    /// Returns the number of points sent, `None` if the kind is not registered.
    pub async fn visualize(&self, settings: &VisualizationSettings) -> Result<Option<usize>, ViewerError> {
        let config = VisualizationConfig::from_settings(settings)?;
        let sent = self
            .binder
            .visualize(&self.state.rows, &self.state.fetched_fields, &config, &self.state.mode)
            .await?;

        Ok(sent.map(|(payload, _ack)| {
            let point_count = payload.point_count();
            info!("Visualized {} point(s) as {}", point_count, payload.kind());
            self.events.publish(events::VisualizationDispatched {
                kind: payload.kind().to_string(),
                point_count,
                with_scalars: payload.has_scalars(),
            });
            point_count
        }))
    }

    pub async fn load_level(&self, path: &str) {
        info!("Loading background level '{}'", path);
        self.raise(ViewportCommand::LoadBackgroundLevel(path.to_string())).await;
    }
}
