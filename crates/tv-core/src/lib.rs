//! Core functionality for the telemetry viewer
//!
//! This crate provides the shared abstractions of the query/visualize
//! pipeline: parser modes, document values, the ports the pipeline talks
//! through and the event bus.

pub mod document;
pub mod events;
pub mod mode;
pub mod ports;
pub mod state;
pub mod value;

// Re-export commonly used types
pub use document::DocumentSet;
pub use mode::{ParserMode, DEFAULT_LEVEL_KEY};
pub use ports::{
    ConnectOutcome, ConnectionPort, DispatchAck, FetchRequest, PortResult,
    ScalarRange, SessionId, ViewportBridge, ViewportCommand, ViewportError,
};
pub use state::{ConnectionSettings, FetchSettings, VisualizationSettings};
pub use value::Value;
