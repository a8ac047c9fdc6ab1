//! Visualization kinds and their registry

use indexmap::IndexMap;
use tv_core::{ParserMode, ScalarRange, Value, ViewportCommand, VisualizationSettings};
use tv_data::Row;

use crate::point_cloud::{PointCloud, PointCloudConfig};
use crate::VisualizationError;

/// Per-kind visualization configuration
#[derive(Debug, Clone, PartialEq)]
pub enum VisualizationConfig {
    PointCloud(PointCloudConfig),
}

impl VisualizationConfig {
    /// Registry key of the kind this config belongs to
    pub fn kind(&self) -> &str {
        match self {
            VisualizationConfig::PointCloud(_) => PointCloud::KIND,
        }
    }

    /// Build from the operator-facing settings
    pub fn from_settings(settings: &VisualizationSettings) -> Result<Self, VisualizationError> {
        match settings.kind.as_str() {
            PointCloud::KIND => {
                let position_field = settings
                    .position_field
                    .clone()
                    .filter(|f| !f.is_empty())
                    .ok_or(VisualizationError::MissingPositionField)?;
                Ok(VisualizationConfig::PointCloud(PointCloudConfig {
                    position_field,
                    use_scalar: settings.use_scalar,
                    scalar_field: settings.scalar_field.clone().filter(|f| !f.is_empty()),
                    min: settings.min,
                    desired: settings.desired,
                    max: settings.max,
                }))
            }
            other => Err(VisualizationError::UnknownKind(other.to_string())),
        }
    }
}

/// Data ready to be raised on the viewport
#[derive(Debug, Clone, PartialEq)]
pub enum VisualizationPayload {
    PointCloud {
        parser: u8,
        positions: Vec<Value>,
        scalars: Option<ScalarRange>,
    },
}

impl VisualizationPayload {
    pub fn kind(&self) -> &str {
        match self {
            VisualizationPayload::PointCloud { .. } => PointCloud::KIND,
        }
    }

    pub fn point_count(&self) -> usize {
        match self {
            VisualizationPayload::PointCloud { positions, .. } => positions.len(),
        }
    }

    pub fn has_scalars(&self) -> bool {
        match self {
            VisualizationPayload::PointCloud { scalars, .. } => scalars.is_some(),
        }
    }

    pub fn into_command(self) -> ViewportCommand {
        match self {
            VisualizationPayload::PointCloud {
                parser,
                positions,
                scalars,
            } => ViewportCommand::VisualizePointCloud {
                parser,
                positions,
                scalars,
            },
        }
    }
}

/// A visualization kind
pub trait Visualization: Send + Sync {
    /// Registry key
    fn kind(&self) -> &str;

    /// Build a payload from the included rows of the last fetch
    fn build(
        &self,
        rows: &[Row],
        included_fields: &[String],
        config: &VisualizationConfig,
        mode: &ParserMode,
    ) -> Result<VisualizationPayload, VisualizationError>;
}

/// Registered visualization kinds, in registration order
pub struct VisualizationRegistry {
    kinds: IndexMap<String, Box<dyn Visualization>>,
}

impl VisualizationRegistry {
    /// Registry with no kinds
    pub fn new() -> Self {
        Self { kinds: IndexMap::new() }
    }

    /// Registry with every built-in kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PointCloud));
        registry
    }

    pub fn register(&mut self, visualization: Box<dyn Visualization>) {
        self.kinds.insert(visualization.kind().to_string(), visualization);
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Visualization> {
        self.kinds.get(kind).map(|v| v.as_ref())
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

impl Default for VisualizationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
