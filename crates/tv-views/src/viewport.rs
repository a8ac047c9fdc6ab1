//! Viewport bridges

use std::io::Write;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use tv_core::ports::EMPTY_LEVEL;
use tv_core::{DispatchAck, ViewportBridge, ViewportCommand, ViewportError};

/// Bridge that queues commands for a [`RenderHost`] task.
///
/// Commands raised before the host is ready wait in the queue and are
/// written after the host's initial level load.
#[derive(Clone)]
pub struct ChannelViewport {
    sender: mpsc::Sender<ViewportCommand>,
    ready: watch::Receiver<bool>,
}

impl ChannelViewport {
    /// Bridge and the host that drains it
    pub fn new(capacity: usize) -> (Self, RenderHost) {
        let (sender, receiver) = mpsc::channel(capacity);
        let (ready_tx, ready_rx) = watch::channel(false);
        (
            Self {
                sender,
                ready: ready_rx,
            },
            RenderHost {
                receiver,
                ready: ready_tx,
            },
        )
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the host has loaded its initial level
    pub async fn wait_ready(&self) -> Result<(), ViewportError> {
        let mut ready = self.ready.clone();
        ready.wait_for(|r| *r).await.map_err(|_| ViewportError::Closed)?;
        Ok(())
    }
}

#[async_trait]
impl ViewportBridge for ChannelViewport {
    async fn raise(&self, command: ViewportCommand) -> Result<DispatchAck, ViewportError> {
        if let Err(e) = self.sender.send(command).await {
            let error = if self.is_ready() {
                ViewportError::Closed
            } else {
                ViewportError::NotReady
            };
            debug!("Viewport refused {}: {}", e.0.event_name(), error);
            return Err(error);
        }
        Ok(DispatchAck::Accepted)
    }
}

/// Receiving end of a [`ChannelViewport`].
///
/// Writes every command as one JSON line: `{"at", "event", "args"}`.
pub struct RenderHost {
    receiver: mpsc::Receiver<ViewportCommand>,
    ready: watch::Sender<bool>,
}

impl RenderHost {
    /// Load the empty level, mark the bridge ready, then drain commands into
    /// `sink` until every bridge is dropped. Returns the number of lines written.
    pub async fn run<W: Write>(mut self, mut sink: W) -> std::io::Result<usize> {
        let mut written = 0;

        Self::write_command(&mut sink, &ViewportCommand::LoadBackgroundLevel(EMPTY_LEVEL.to_string()))?;
        written += 1;
        self.ready.send_replace(true);
        info!("Render host ready");

        while let Some(command) = self.receiver.recv().await {
            debug!("Render host received {}", command.event_name());
            Self::write_command(&mut sink, &command)?;
            written += 1;
        }

        sink.flush()?;
        Ok(written)
    }

    fn write_command<W: Write>(sink: &mut W, command: &ViewportCommand) -> std::io::Result<()> {
        let line = json!({
            "at": Utc::now().to_rfc3339(),
            "event": command.event_name(),
            "args": command.arguments(),
        });
        serde_json::to_writer(&mut *sink, &line)?;
        writeln!(sink)
    }
}

/// Bridge that keeps every raised command in memory
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct RecordingViewport {
    commands: parking_lot::Mutex<Vec<ViewportCommand>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<ViewportCommand> {
        self.commands.lock().clone()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl ViewportBridge for RecordingViewport {
    async fn raise(&self, command: ViewportCommand) -> Result<DispatchAck, ViewportError> {
        self.commands.lock().push(command);
        Ok(DispatchAck::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(sink: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(sink)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_raise_before_ready_is_delivered_after_empty_level() {
        let (viewport, host) = ChannelViewport::new(4);
        assert!(!viewport.is_ready());
        let ack = viewport
            .raise(ViewportCommand::SelectDatabase("telemetry".into()))
            .await
            .unwrap();
        assert_eq!(ack, DispatchAck::Accepted);
        drop(viewport);

        let mut sink = Vec::new();
        assert_eq!(host.run(&mut sink).await.unwrap(), 2);

        let lines = lines(sink);
        assert_eq!(lines[0]["event"], "load_background_level");
        assert_eq!(lines[0]["args"][0], EMPTY_LEVEL);
        assert_eq!(lines[1]["event"], "select_database");
        assert_eq!(lines[1]["args"][0], "telemetry");
    }

    #[tokio::test]
    async fn test_host_dropped_before_ready() {
        let (viewport, host) = ChannelViewport::new(4);
        drop(host);
        let result = viewport.raise(ViewportCommand::SelectDatabase("telemetry".into())).await;
        assert_eq!(result, Err(ViewportError::NotReady));
        assert_eq!(viewport.wait_ready().await, Err(ViewportError::Closed));
    }

    #[tokio::test]
    async fn test_host_writes_json_lines() {
        let (viewport, host) = ChannelViewport::new(4);
        let task = tokio::spawn(async move {
            let mut sink = Vec::new();
            let written = host.run(&mut sink).await.unwrap();
            (written, sink)
        });

        viewport.wait_ready().await.unwrap();
        let ack = viewport
            .raise(ViewportCommand::ConnectToDatabase("mongodb://localhost:27017".into()))
            .await
            .unwrap();
        assert_eq!(ack, DispatchAck::Accepted);
        drop(viewport);

        let (written, sink) = task.await.unwrap();
        assert_eq!(written, 2);

        let lines = lines(sink);
        assert_eq!(lines[0]["event"], "load_background_level");
        assert_eq!(lines[0]["args"][0], EMPTY_LEVEL);
        assert_eq!(lines[1]["event"], "connect_to_database");
        assert!(lines[1]["at"].is_string());
    }

    #[tokio::test]
    async fn test_closed_host() {
        let (viewport, host) = ChannelViewport::new(1);
        let mut sink = Vec::new();
        let runner = tokio::spawn(async move { host.run(&mut sink).await.map(|_| ()) });
        viewport.wait_ready().await.unwrap();
        runner.abort();
        let _ = runner.await;

        let result = viewport.raise(ViewportCommand::SelectDatabase("x".into())).await;
        assert_eq!(result, Err(ViewportError::Closed));
    }
}
