//! Error types for the tiled map view.

use std::path::PathBuf;

/// Result type alias for map view operations.
pub type Result<T> = std::result::Result<T, MapViewError>;

/// Errors that can occur while configuring or driving the map view.
///
/// Tile and grid request failures never show up here: those belong to the
/// rendering backend, which shows a blank tile.
#[derive(Debug, thiserror::Error)]
pub enum MapViewError {
    /// A configuration value is out of range or malformed.
    #[error("Invalid map configuration for '{key}': {message}")]
    InvalidConfig { key: String, message: String },

    /// TOML configuration could not be parsed.
    #[error("Failed to parse TOML map configuration: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON configuration could not be parsed.
    #[error("Failed to parse JSON map configuration: {0}")]
    JsonParse(#[source] serde_json::Error),

    /// Configuration file could not be read.
    #[error("Failed to read map configuration '{path}': {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A drawn shape does not enclose a region.
    #[error("Drawn shape does not enclose a region: {0}")]
    DegenerateShape(String),

    /// An operation that needs a mounted map ran before setup.
    #[error("Map view used before setup: {0}")]
    NotSetUp(&'static str),

    /// The view was destroyed and no longer owns a map.
    #[error("Map view has been destroyed")]
    Destroyed,

    /// Panel markup could not be rendered.
    #[error("Failed to render info panel: {0}")]
    Template(#[from] askama::Error),
}

impl MapViewError {
    /// Create a configuration error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error for a configuration file.
    pub fn config_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = MapViewError::invalid_config("tile_layer.opacity", "must be within [0, 1]");
        assert_eq!(
            err.to_string(),
            "Invalid map configuration for 'tile_layer.opacity': must be within [0, 1]"
        );
    }

    #[test]
    fn test_config_io_has_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = MapViewError::config_io("/etc/tiledmap.toml", io);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/etc/tiledmap.toml"));
    }
}
