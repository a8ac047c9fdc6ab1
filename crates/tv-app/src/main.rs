//! Main application entry point

use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use tv_core::events::{events, handler_from_fn, EventBus};
use tv_core::ConnectionPort;
use tv_data::{RowProjector, SqliteDocumentStore, ViewerConfig};
use tv_views::ChannelViewport;

mod actor;
mod cli;
mod create_sample_db;
mod demo;
mod viewer;

use actor::{ViewerActor, ViewerHandle};
use cli::Args;
use viewer::{TelemetryViewer, ViewerError};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout carries the render host stream
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_backend(args: &Args, config: &ViewerConfig) -> Result<Arc<dyn ConnectionPort>> {
    if args.demo {
        info!("Using the demo database");
        return Ok(Arc::new(demo::demo_store()));
    }

    let dir = config
        .connection
        .data_dir
        .as_ref()
        .context("No backend: pass --demo or --data-dir, or set [connection] data_dir")?;
    let store = SqliteDocumentStore::open(dir)?;
    info!("Using SQLite databases under {}", dir.display());
    Ok(Arc::new(store))
}

fn log_events(events: &EventBus) {
    events.subscribe::<events::DocumentsFetched>(handler_from_fn(|event| {
        if let Some(fetched) = event.as_any().downcast_ref::<events::DocumentsFetched>() {
            debug!(
                "Fetch {} installed {} row(s) x {} column(s) from '{}'",
                fetched.generation, fetched.row_count, fetched.column_count, fetched.collection
            );
        }
    }));
    events.subscribe::<events::VisualizationDispatched>(handler_from_fn(|event| {
        if let Some(sent) = event.as_any().downcast_ref::<events::VisualizationDispatched>() {
            debug!(
                "Dispatched {} with {} point(s), scalars: {}",
                sent.kind, sent.point_count, sent.with_scalars
            );
        }
    }));
}

/// Configured names the catalog or the fetch does not know are skipped
fn skip_unknown(result: Result<(), ViewerError>) -> Result<(), ViewerError> {
    match result {
        Err(e @ (ViewerError::UnknownField(_) | ViewerError::UnknownRow(_))) => {
            warn!("Skipping: {}", e);
            Ok(())
        }
        other => other,
    }
}

/// Connect, fetch, show the rows and visualize them
async fn run_session(handle: &ViewerHandle, config: &ViewerConfig, args: &Args) -> Result<()> {
    handle.load_level(config.level.path.clone()).await?;
    handle.connect(config.connection.settings.clone()).await?;

    let collections = handle
        .select_database(config.connection.settings.database.clone())
        .await?;
    let collection = match &config.fetch.collection {
        Some(collection) => collection.clone(),
        None => collections.first().cloned().context("Database lists no collections")?,
    };
    let entries = handle.select_collection(collection.clone()).await?;
    info!("Collection '{}' has {} field(s)", collection, entries.len());

    let mode = config.parser.to_mode()?;
    info!("Parser: {}", mode.label());
    handle.set_parser_mode(mode).await?;
    if config.fetch.fields.is_empty() {
        handle.include_all_fields().await?;
    }
    for field in &config.fetch.fields {
        skip_unknown(handle.set_field_included(field.as_str(), true).await)?;
    }
    for field in &config.fetch.sort {
        skip_unknown(handle.set_field_sorted(field.as_str(), true).await)?;
    }
    handle.set_fetch_window(config.fetch.window).await?;

    let row_count = handle.fetch().await?;
    let snapshot = handle.snapshot().await?;
    info!("Fetched {} row(s) from '{}'", row_count, collection);

    let batch = RowProjector::to_record_batch(&snapshot.rows, &snapshot.fetched_fields)?;
    eprintln!("{}", pretty_format_batches(&[batch.clone()])?);

    if let Some(path) = args.export_csv.as_deref() {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = arrow::csv::Writer::new(file);
        writer.write(&batch)?;
        info!("Wrote {} row(s) to {}", batch.num_rows(), path.display());
    }

    if config.visualization.position_field.is_none() {
        warn!("No position field configured, skipping visualization");
        return Ok(());
    }

    if args.rows.is_empty() {
        handle.include_all_rows().await?;
    }
    for id in &args.rows {
        skip_unknown(handle.set_row_included(*id, true).await)?;
    }
    match handle.visualize(config.visualization.clone()).await? {
        Some(points) => info!("Sent {} point(s) to the viewport", points),
        None => info!("Visualization kind '{}' is not available", config.visualization.kind),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(dir) = &args.create_sample_db {
        let path = create_sample_db::create_sample_database(dir)?;
        info!("Sample database written to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    args.apply_to(&mut config);

    let port = open_backend(&args, &config)?;

    let (viewport, host) = ChannelViewport::new(64);
    let host_task = tokio::spawn(host.run(std::io::stdout()));
    viewport.wait_ready().await?;

    let events = Arc::new(EventBus::new());
    log_events(&events);

    let viewer = TelemetryViewer::new(port, Arc::new(viewport.clone()), events);
    let (handle, actor_task) = ViewerActor::spawn(viewer, 32);

    let result = run_session(&handle, &config, &args).await;

    drop(handle);
    actor_task.await?;
    drop(viewport);
    let lines = host_task.await??;
    debug!("Render host wrote {} line(s)", lines);

    result
}
