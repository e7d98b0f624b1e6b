use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical name type for pipelines and path-sets.
pub type Name = String;

/// Production vs development build, derived from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    /// Read the mode from the process environment.
    pub fn from_env() -> Self {
        Self::from_node_env(std::env::var("NODE_ENV").ok().as_deref())
    }

    /// Only the exact value `"production"` selects production mode.
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some("production") => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }

    pub fn minify(&self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => f.write_str("development"),
            BuildMode::Production => f.write_str("production"),
        }
    }
}

/// What a path-set is used for.
///
/// - `Static`: files are copied verbatim into a destination directory.
/// - `Source`: files are fed to the compiler; watching them rebuilds the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSetKind {
    Static,
    Source,
}

impl Default for PathSetKind {
    fn default() -> Self {
        PathSetKind::Static
    }
}

impl FromStr for PathSetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(PathSetKind::Static),
            "source" => Ok(PathSetKind::Source),
            other => Err(format!(
                "invalid path-set kind: {other} (expected \"static\" or \"source\")"
            )),
        }
    }
}

impl fmt::Display for PathSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSetKind::Static => f.write_str("static"),
            PathSetKind::Source => f.write_str("source"),
        }
    }
}
