//! Operator-facing settings shared by the pipeline stages

use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "mongodb://";
pub const DEFAULT_IP: &str = "localhost";
pub const DEFAULT_PORT: &str = "27017";
pub const DEFAULT_LIMIT: u64 = 1000;
pub const DEFAULT_LEVEL_PATH: &str = "content/levels/basic.level";

/// Where to connect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Scheme prefix, e.g. `mongodb://`
    pub prefix: String,
    pub ip: String,
    pub port: String,
    /// Database selected after connecting
    pub database: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            ip: DEFAULT_IP.to_string(),
            port: DEFAULT_PORT.to_string(),
            database: String::new(),
        }
    }
}

impl ConnectionSettings {
    /// Full server address, `None` when ip or port is blank
    pub fn address(&self) -> Option<String> {
        let ip = self.ip.trim();
        let port = self.port.trim();
        if ip.is_empty() || port.is_empty() {
            return None;
        }
        Some(format!("{}{}:{}", self.prefix, ip, port))
    }
}

/// Fetch window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub skip: u64,
    /// Zero means no limit
    pub limit: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Visualization picker state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationSettings {
    pub kind: String,
    pub position_field: Option<String>,
    pub scalar_field: Option<String>,
    pub use_scalar: bool,
    pub min: f64,
    pub desired: f64,
    pub max: f64,
}

impl Default for VisualizationSettings {
    fn default() -> Self {
        Self {
            kind: "point_cloud".to_string(),
            position_field: None,
            scalar_field: None,
            use_scalar: false,
            min: 0.0,
            desired: 0.0,
            max: 0.0,
        }
    }
}
