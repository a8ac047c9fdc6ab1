//! File configuration for a viewer session

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tv_core::state::DEFAULT_LEVEL_PATH;
use tv_core::{ConnectionSettings, FetchSettings, ParserMode, VisualizationSettings};

use crate::DataError;

/// Complete configuration of a viewer session, loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub connection: ConnectionConfig,
    pub fetch: FetchConfig,
    pub parser: ParserConfig,
    pub level: LevelConfig,
    pub visualization: VisualizationSettings,
}

/// Server address plus the SQLite data directory, if that backend is used
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    #[serde(flatten)]
    pub settings: ConnectionSettings,
    pub data_dir: Option<PathBuf>,
}

/// Which collection and fields to fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub collection: Option<String>,
    #[serde(flatten)]
    pub window: FetchSettings,
    /// Fields to include
    pub fields: Vec<String>,
    /// Included fields to sort by
    pub sort: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// `none`, `position` or `vector3`
    pub mode: String,
    /// Only read in position mode
    pub level_key: Option<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            mode: "vector3".to_string(),
            level_key: None,
        }
    }
}

impl ParserConfig {
    pub fn to_mode(&self) -> Result<ParserMode, DataError> {
        let mode: ParserMode = self.mode.parse().map_err(DataError::Config)?;
        Ok(match (mode, &self.level_key) {
            (ParserMode::Position { .. }, Some(key)) => ParserMode::position_for(key.clone()),
            (mode, _) => mode,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Background level loaded in the viewport
    pub path: String,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_LEVEL_PATH.to_string(),
        }
    }
}

impl ViewerConfig {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, DataError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.parser.to_mode()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.fetch.window.limit, 1000);
        assert_eq!(config.connection.settings.prefix, "mongodb://");
        assert_eq!(config.level.path, "content/levels/basic.level");
        assert_eq!(config.parser.to_mode().unwrap(), ParserMode::Vector3);
    }

    #[test]
    fn test_full_file() {
        let config = ViewerConfig::from_toml_str(
            r#"
            [connection]
            ip = "10.0.0.5"
            port = "27018"
            database = "telemetry"

            [fetch]
            collection = "player"
            skip = 10
            limit = 0
            fields = ["time", "params.position"]
            sort = ["time"]

            [parser]
            mode = "position"
            level_key = "forest"

            [visualization]
            position_field = "params.position"
            use_scalar = true
            scalar_field = "time"
            max = 100.0
            "#,
        )
        .unwrap();

        assert_eq!(config.connection.settings.address().as_deref(), Some("mongodb://10.0.0.5:27018"));
        assert_eq!(config.fetch.window.skip, 10);
        assert_eq!(config.fetch.window.limit, 0);
        assert_eq!(config.parser.to_mode().unwrap(), ParserMode::position_for("forest"));
        assert_eq!(config.visualization.kind, "point_cloud");
        assert!(config.visualization.use_scalar);
    }

    #[test]
    fn test_unknown_parser_mode_is_rejected() {
        let err = ViewerConfig::from_toml_str("[parser]\nmode = \"spline\"").unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }
}
