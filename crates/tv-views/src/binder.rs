//! Binds fetched rows to a visualization and raises it on the viewport

use std::sync::Arc;

use tracing::{debug, warn};
use tv_core::{DispatchAck, ParserMode, ViewportBridge};
use tv_data::Row;

use crate::visualization::{VisualizationConfig, VisualizationPayload, VisualizationRegistry};
use crate::VisualizationError;

pub struct VisualizationBinder {
    registry: VisualizationRegistry,
    viewport: Arc<dyn ViewportBridge>,
}

impl VisualizationBinder {
    pub fn new(registry: VisualizationRegistry, viewport: Arc<dyn ViewportBridge>) -> Self {
        Self { registry, viewport }
    }

    /// Build the payload for `config`.
    ///
    /// Returns `Ok(None)` when the kind is not registered; the request is
    /// dropped with a warning.
    pub fn bind(
        &self,
        rows: &[Row],
        included_fields: &[String],
        config: &VisualizationConfig,
        mode: &ParserMode,
    ) -> Result<Option<VisualizationPayload>, VisualizationError> {
        let Some(visualization) = self.registry.get(config.kind()) else {
            warn!("Visualization kind '{}' is not registered, skipping", config.kind());
            return Ok(None);
        };

        if included_fields.is_empty() {
            return Err(VisualizationError::NoFetchedFields);
        }

        visualization.build(rows, included_fields, config, mode).map(Some)
    }

    /// Raise a payload on the viewport. Acceptance is all that is reported.
    pub async fn dispatch(&self, payload: VisualizationPayload) -> Result<DispatchAck, VisualizationError> {
        debug!(
            "Dispatching {} with {} point(s), scalars: {}",
            payload.kind(),
            payload.point_count(),
            payload.has_scalars()
        );
        Ok(self.viewport.raise(payload.into_command()).await?)
    }

    /// [`bind`](Self::bind) then [`dispatch`](Self::dispatch)
    pub async fn visualize(
        &self,
        rows: &[Row],
        included_fields: &[String],
        config: &VisualizationConfig,
        mode: &ParserMode,
    ) -> Result<Option<(VisualizationPayload, DispatchAck)>, VisualizationError> {
        let Some(payload) = self.bind(rows, included_fields, config, mode)? else {
            return Ok(None);
        };
        let ack = self.dispatch(payload.clone()).await?;
        Ok(Some((payload, ack)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_cloud::PointCloudConfig;
    use crate::viewport::RecordingViewport;
    use indexmap::IndexMap;
    use tv_core::{Value, ViewportCommand};

    fn rows() -> Vec<Row> {
        (0..3)
            .map(|id| Row {
                id,
                is_included: true,
                values: IndexMap::from([
                    ("pos".to_string(), Value::from(id as f64)),
                    ("speed".to_string(), Value::from(10.0 * id as f64)),
                ]),
            })
            .collect()
    }

    fn fields() -> Vec<String> {
        vec!["pos".to_string(), "speed".to_string()]
    }

    #[tokio::test]
    async fn test_without_scalars_sends_two_arguments() {
        let viewport = Arc::new(RecordingViewport::new());
        let binder = VisualizationBinder::new(VisualizationRegistry::with_defaults(), viewport.clone());
        let config = VisualizationConfig::PointCloud(PointCloudConfig::new("pos"));

        let sent = binder.visualize(&rows(), &fields(), &config, &ParserMode::None).await.unwrap();
        assert!(sent.is_some());

        let commands = viewport.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].event_name(), "visualize_point_cloud");
        assert_eq!(commands[0].arguments().len(), 2);
    }

    #[tokio::test]
    async fn test_with_scalars_sends_six_arguments() {
        let viewport = Arc::new(RecordingViewport::new());
        let binder = VisualizationBinder::new(VisualizationRegistry::with_defaults(), viewport.clone());
        let config = VisualizationConfig::PointCloud(PointCloudConfig::new("pos").with_scalars("speed", 0.0, 10.0, 20.0));

        binder.visualize(&rows(), &fields(), &config, &ParserMode::Vector3).await.unwrap();

        let commands = viewport.commands();
        let ViewportCommand::VisualizePointCloud { parser, scalars, .. } = &commands[0] else {
            panic!("expected a point cloud");
        };
        assert_eq!(*parser, 1);
        assert_eq!(scalars.as_ref().map(|s| s.scalars.len()), Some(3));
        assert_eq!(commands[0].arguments().len(), 6);
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_skipped() {
        let viewport = Arc::new(RecordingViewport::new());
        let binder = VisualizationBinder::new(VisualizationRegistry::new(), viewport.clone());
        let config = VisualizationConfig::PointCloud(PointCloudConfig::new("pos"));

        let sent = binder.visualize(&rows(), &fields(), &config, &ParserMode::None).await.unwrap();
        assert!(sent.is_none());
        assert!(viewport.commands().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_fetched() {
        let binder = VisualizationBinder::new(VisualizationRegistry::with_defaults(), Arc::new(RecordingViewport::new()));
        let config = VisualizationConfig::PointCloud(PointCloudConfig::new("pos"));

        let err = binder.bind(&[], &[], &config, &ParserMode::None).unwrap_err();
        assert_eq!(err, VisualizationError::NoFetchedFields);
    }
}
