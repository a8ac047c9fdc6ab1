//! Parser modes for positional document data

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Level key installed when switching into position mode
pub const DEFAULT_LEVEL_KEY: &str = "level_key";

/// How positional fields are interpreted by the renderer, and whether a
/// session pre-fetch is needed before documents are retrieved.
///
/// Mode-specific configuration lives inside the variant, so leaving
/// [`ParserMode::Position`] drops the level key with it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ParserMode {
    /// Values are forwarded untouched
    None,
    /// Positions are scoped to the sessions played on one level
    Position {
        level_key: String,
    },
    /// Positions are stored as `x`, `y`, `z` components
    #[default]
    Vector3,
}

impl ParserMode {
    /// Position mode with the default level key
    pub fn position() -> Self {
        Self::position_for(DEFAULT_LEVEL_KEY)
    }

    /// Position mode scoped to the given level key
    pub fn position_for(level_key: impl Into<String>) -> Self {
        ParserMode::Position {
            level_key: level_key.into(),
        }
    }

    /// Numeric code the renderer expects as the first visualize argument
    pub fn code(&self) -> u8 {
        match self {
            ParserMode::None => 0,
            ParserMode::Vector3 => 1,
            ParserMode::Position { .. } => 2,
        }
    }

    /// Inverse of [`ParserMode::code`]. Position mode gets the default level key.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ParserMode::None),
            1 => Some(ParserMode::Vector3),
            2 => Some(ParserMode::position()),
            _ => None,
        }
    }

    /// The level key, only present in position mode
    pub fn level_key(&self) -> Option<&str> {
        match self {
            ParserMode::Position { level_key } => Some(level_key),
            ParserMode::None | ParserMode::Vector3 => None,
        }
    }

    /// Whether a fetch must resolve session ids first
    pub fn requires_sessions(&self) -> bool {
        matches!(self, ParserMode::Position { .. })
    }

    /// Human readable label, as shown in the parser picker
    pub fn label(&self) -> &'static str {
        match self {
            ParserMode::None => "Default",
            ParserMode::Position { .. } => "Position(x, y, z)",
            ParserMode::Vector3 => "Vector3(x, y, z)",
        }
    }
}

impl fmt::Display for ParserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserMode::None => write!(f, "none"),
            ParserMode::Position { level_key } => write!(f, "position({})", level_key),
            ParserMode::Vector3 => write!(f, "vector3"),
        }
    }
}

impl FromStr for ParserMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "default" | "" => Ok(ParserMode::None),
            "position" => Ok(ParserMode::position()),
            "vector3" => Ok(ParserMode::Vector3),
            other => Err(format!("unknown parser mode '{}'", other)),
        }
    }
}
