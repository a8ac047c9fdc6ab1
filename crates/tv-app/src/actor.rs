//! Single-writer command queue in front of [`TelemetryViewer`]

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use tv_core::{ConnectOutcome, ConnectionSettings, FetchSettings, ParserMode, VisualizationSettings};
use tv_data::{DataError, FetchedDocuments, FieldEntry};

use crate::viewer::{TelemetryViewer, ViewerError, ViewerSnapshot};

type Reply<T> = oneshot::Sender<Result<T, ViewerError>>;

enum Command {
    Connect(ConnectionSettings, Reply<ConnectOutcome>),
    SelectDatabase(String, Reply<Vec<String>>),
    SelectCollection(String, Reply<Vec<FieldEntry>>),
    SetParserMode(ParserMode, Reply<()>),
    SetFieldIncluded { field: String, included: bool, reply: Reply<()> },
    SetFieldSorted { field: String, sorted: bool, reply: Reply<()> },
    IncludeAllFields(Reply<usize>),
    SetFetchWindow(FetchSettings, Reply<()>),
    Fetch(Reply<usize>),
    SetRowIncluded { id: usize, included: bool, reply: Reply<()> },
    IncludeAllRows(Reply<usize>),
    Visualize(VisualizationSettings, Reply<Option<usize>>),
    LoadLevel(String, Reply<()>),
    Snapshot(Reply<ViewerSnapshot>),
}

/// A fetch task reporting back
struct Completion {
    generation: u64,
    result: Result<FetchedDocuments, DataError>,
}

/// The latest fetch and the caller waiting on it
struct InFlight {
    generation: u64,
    task: JoinHandle<()>,
    reply: Reply<usize>,
}

/// Owns the viewer and applies commands one at a time.
///
/// Document fetches run in spawned tasks and report back on a separate
/// channel. Only the latest fetch is kept: claiming a newer generation
/// aborts the running task and answers its caller with `Superseded`.
pub struct ViewerActor {
    viewer: TelemetryViewer,
    commands: mpsc::Receiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    in_flight: Option<InFlight>,
}

impl ViewerActor {
    /// Start the actor. It stops once every handle is dropped and no fetch
    /// is in flight.
    pub fn spawn(viewer: TelemetryViewer, capacity: usize) -> (ViewerHandle, JoinHandle<()>) {
        let (sender, commands) = mpsc::channel(capacity);
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let actor = Self {
            viewer,
            commands,
            completions_tx,
            completions,
            in_flight: None,
        };
        (ViewerHandle { sender }, tokio::spawn(actor.run()))
    }

    async fn run(mut self) {
        let mut open = true;
        while open || self.in_flight.is_some() {
            tokio::select! {
                command = self.commands.recv(), if open => match command {
                    Some(command) => {
                        self.handle(command).await;
                        self.abort_stale();
                    }
                    None => open = false,
                },
                Some(done) = self.completions.recv() => self.finish_fetch(done),
            }
        }
        info!("Viewer stopped");
    }

    fn start_fetch(&mut self, reply: Reply<usize>) {
        let pending = match self.viewer.prepare_fetch() {
            Ok(pending) => pending,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };
        self.abort_stale();

        debug!("Starting fetch {}", pending.generation);
        let generation = pending.generation;
        let fetcher = self.viewer.fetcher();
        let completions = self.completions_tx.clone();
        let task = tokio::spawn(async move {
            let result = fetcher.fetch(pending.spec, &pending.mode).await;
            let _ = completions.send(Completion { generation, result });
        });
        self.in_flight = Some(InFlight { generation, task, reply });
    }

    /// Cancel the running fetch if a newer generation was claimed since
    fn abort_stale(&mut self) {
        let latest = self.viewer.generation();
        if !self.in_flight.as_ref().is_some_and(|f| f.generation != latest) {
            return;
        }
        if let Some(stale) = self.in_flight.take() {
            stale.task.abort();
            let _ = stale.reply.send(Err(self.viewer.supersede(stale.generation)));
        }
    }

    fn finish_fetch(&mut self, done: Completion) {
        match self.in_flight.take() {
            Some(fetch) if fetch.generation == done.generation => {
                let result = self.viewer.complete_fetch(done.generation, done.result);
                let _ = fetch.reply.send(result);
            }
            current => {
                // finished just before it was aborted; its caller has its answer
                debug!("Ignoring completion of fetch {}", done.generation);
                self.in_flight = current;
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        let viewer = &mut self.viewer;
        match command {
            Command::Connect(settings, reply) => {
                let _ = reply.send(viewer.connect(&settings).await);
            }
            Command::SelectDatabase(name, reply) => {
                let _ = reply.send(viewer.select_database(&name).await);
            }
            Command::SelectCollection(name, reply) => {
                let _ = reply.send(viewer.select_collection(&name).await.map(<[FieldEntry]>::to_vec));
            }
            Command::SetParserMode(mode, reply) => {
                viewer.set_parser_mode(mode);
                let _ = reply.send(Ok(()));
            }
            Command::SetFieldIncluded { field, included, reply } => {
                let _ = reply.send(viewer.set_field_included(&field, included));
            }
            Command::SetFieldSorted { field, sorted, reply } => {
                let _ = reply.send(viewer.set_field_sorted(&field, sorted));
            }
            Command::IncludeAllFields(reply) => {
                let _ = reply.send(viewer.include_all_fields());
            }
            Command::SetFetchWindow(window, reply) => {
                viewer.set_fetch_window(window);
                let _ = reply.send(Ok(()));
            }
            Command::Fetch(reply) => self.start_fetch(reply),
            Command::SetRowIncluded { id, included, reply } => {
                let _ = reply.send(viewer.set_row_included(id, included));
            }
            Command::IncludeAllRows(reply) => {
                let _ = reply.send(Ok(viewer.include_all_rows()));
            }
            Command::Visualize(settings, reply) => {
                let _ = reply.send(viewer.visualize(&settings).await);
            }
            Command::LoadLevel(path, reply) => {
                viewer.load_level(&path).await;
                let _ = reply.send(Ok(()));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(Ok(viewer.snapshot()));
            }
        }
    }
}

/// Cloneable front end of a [`ViewerActor`]
#[derive(Clone)]
pub struct ViewerHandle {
    sender: mpsc::Sender<Command>,
}

impl ViewerHandle {
    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T, ViewerError> {
        let (reply, response) = oneshot::channel();
        self.sender.send(command(reply)).await.map_err(|_| ViewerError::Closed)?;
        response.await.map_err(|_| ViewerError::Closed)?
    }

    pub async fn connect(&self, settings: ConnectionSettings) -> Result<ConnectOutcome, ViewerError> {
        self.request(|reply| Command::Connect(settings, reply)).await
    }

    pub async fn select_database(&self, name: impl Into<String>) -> Result<Vec<String>, ViewerError> {
        let name = name.into();
        self.request(|reply| Command::SelectDatabase(name, reply)).await
    }

    pub async fn select_collection(&self, name: impl Into<String>) -> Result<Vec<FieldEntry>, ViewerError> {
        let name = name.into();
        self.request(|reply| Command::SelectCollection(name, reply)).await
    }

    pub async fn set_parser_mode(&self, mode: ParserMode) -> Result<(), ViewerError> {
        self.request(|reply| Command::SetParserMode(mode, reply)).await
    }

    pub async fn set_field_included(&self, field: impl Into<String>, included: bool) -> Result<(), ViewerError> {
        let field = field.into();
        self.request(|reply| Command::SetFieldIncluded { field, included, reply })
            .await
    }

    pub async fn set_field_sorted(&self, field: impl Into<String>, sorted: bool) -> Result<(), ViewerError> {
        let field = field.into();
        self.request(|reply| Command::SetFieldSorted { field, sorted, reply })
            .await
    }

    pub async fn include_all_fields(&self) -> Result<usize, ViewerError> {
        self.request(Command::IncludeAllFields).await
    }

    pub async fn set_fetch_window(&self, window: FetchSettings) -> Result<(), ViewerError> {
        self.request(|reply| Command::SetFetchWindow(window, reply)).await
    }

    /// Fetch with the current selection. Resolves to the installed row
    /// count, or [`ViewerError::Superseded`] if a newer fetch was issued.
    pub async fn fetch(&self) -> Result<usize, ViewerError> {
        self.request(Command::Fetch).await
    }

    pub async fn set_row_included(&self, id: usize, included: bool) -> Result<(), ViewerError> {
        self.request(|reply| Command::SetRowIncluded { id, included, reply }).await
    }

    pub async fn include_all_rows(&self) -> Result<usize, ViewerError> {
        self.request(Command::IncludeAllRows).await
    }

    pub async fn visualize(&self, settings: VisualizationSettings) -> Result<Option<usize>, ViewerError> {
        self.request(|reply| Command::Visualize(settings, reply)).await
    }

    pub async fn load_level(&self, path: impl Into<String>) -> Result<(), ViewerError> {
        let path = path.into();
        self.request(|reply| Command::LoadLevel(path, reply)).await
    }

    pub async fn snapshot(&self) -> Result<ViewerSnapshot, ViewerError> {
        self.request(Command::Snapshot).await
    }
}
