//! Rendering host port

use async_trait::async_trait;
use thiserror::Error;

use crate::value::Value;

/// Level the render host loads once it is ready
pub const EMPTY_LEVEL: &str = "core/editor_slave/resources/levels/empty_level";

/// Scalar column and color range of a point cloud
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRange {
    pub scalars: Vec<Value>,
    pub min: f64,
    pub desired: f64,
    pub max: f64,
}

/// A command raised on the rendering host
#[derive(Debug, Clone, PartialEq)]
pub enum ViewportCommand {
    ConnectToDatabase(String),
    SelectDatabase(String),
    LoadBackgroundLevel(String),
    VisualizePointCloud {
        parser: u8,
        positions: Vec<Value>,
        scalars: Option<ScalarRange>,
    },
}

impl ViewportCommand {
    /// Event name the host dispatches on
    pub fn event_name(&self) -> &'static str {
        match self {
            ViewportCommand::ConnectToDatabase(_) => "connect_to_database",
            ViewportCommand::SelectDatabase(_) => "select_database",
            ViewportCommand::LoadBackgroundLevel(_) => "load_background_level",
            ViewportCommand::VisualizePointCloud { .. } => "visualize_point_cloud",
        }
    }

    /// Positional arguments exactly as the host expects them.
    ///
    /// A point cloud without scalars carries `(parser, positions)`; with
    /// scalars it carries `(parser, positions, scalars, min, desired, max)`.
    pub fn arguments(&self) -> Vec<serde_json::Value> {
        fn values(values: &[Value]) -> serde_json::Value {
            serde_json::Value::Array(values.iter().map(Value::to_json).collect())
        }

        match self {
            ViewportCommand::ConnectToDatabase(s)
            | ViewportCommand::SelectDatabase(s)
            | ViewportCommand::LoadBackgroundLevel(s) => vec![serde_json::Value::from(s.as_str())],
            ViewportCommand::VisualizePointCloud {
                parser,
                positions,
                scalars,
            } => {
                let mut args = vec![serde_json::Value::from(*parser), values(positions)];
                if let Some(range) = scalars {
                    args.push(values(&range.scalars));
                    args.push(serde_json::Value::from(range.min));
                    args.push(serde_json::Value::from(range.desired));
                    args.push(serde_json::Value::from(range.max));
                }
                args
            }
        }
    }
}

/// Acknowledgement that the host accepted a command. Carries no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAck {
    Accepted,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewportError {
    #[error("viewport host stopped before it was ready")]
    NotReady,

    #[error("viewport channel closed")]
    Closed,
}

/// One-way command channel to the rendering host
#[async_trait]
pub trait ViewportBridge: Send + Sync {
    async fn raise(&self, command: ViewportCommand) -> Result<DispatchAck, ViewportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_cloud_argument_shape() {
        let bare = ViewportCommand::VisualizePointCloud {
            parser: 1,
            positions: vec![Value::from(1.0)],
            scalars: None,
        };
        assert_eq!(bare.event_name(), "visualize_point_cloud");
        assert_eq!(bare.arguments().len(), 2);

        let scaled = ViewportCommand::VisualizePointCloud {
            parser: 2,
            positions: vec![Value::from("0 0 0")],
            scalars: Some(ScalarRange {
                scalars: vec![Value::from(4.0)],
                min: 0.0,
                desired: 5.0,
                max: 10.0,
            }),
        };
        let args = scaled.arguments();
        assert_eq!(args.len(), 6);
        assert_eq!(args[0], serde_json::json!(2));
        assert_eq!(args[2], serde_json::json!([4.0]));
        assert_eq!(args[4], serde_json::json!(5.0));
    }

    #[test]
    fn test_string_commands_take_one_argument() {
        let cmd = ViewportCommand::LoadBackgroundLevel(EMPTY_LEVEL.to_string());
        assert_eq!(cmd.arguments(), vec![serde_json::json!(EMPTY_LEVEL)]);
    }
}
