//! Visualization binding for the telemetry viewer
//!
//! Turns the projected rows of a fetch into viewport commands and carries
//! them to the rendering host.

mod binder;
mod point_cloud;
mod viewport;
mod visualization;

pub use binder::VisualizationBinder;
pub use point_cloud::{PointCloud, PointCloudConfig};
pub use viewport::{ChannelViewport, RenderHost};
#[cfg(any(test, feature = "test-util"))]
pub use viewport::RecordingViewport;
pub use visualization::{Visualization, VisualizationConfig, VisualizationPayload, VisualizationRegistry};

use thiserror::Error;
use tv_core::ViewportError;

/// Errors raised while binding rows to a visualization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisualizationError {
    #[error("field '{0}' is not among the fetched fields")]
    UnknownField(String),

    #[error("No position field selected")]
    MissingPositionField,

    #[error("Scalars enabled but no scalar field selected")]
    MissingScalarField,

    #[error("Nothing fetched yet")]
    NoFetchedFields,

    #[error("Unknown visualization kind: {0}")]
    UnknownKind(String),

    #[error("Viewport error: {0}")]
    Viewport(#[from] ViewportError),
}
