//! Map view configuration.
//!
//! Every field has a default, so a configuration file only needs to list
//! what it overrides:
//!
//! ```
//! use tiledmap::MapConfig;
//!
//! let config = MapConfig::from_toml_str(r#"
//!     grid_resolution = 8
//!
//!     [initial_zoom]
//!     min = 4
//!     max = 9
//! "#).unwrap();
//!
//! assert_eq!(config.grid_resolution, 8);
//! assert_eq!(config.tile_layer.opacity, 0.8);
//! ```
//!
//! The base background layer is deliberately not configurable per dataset:
//! the deployment has to hold the rights to serve those tiles.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tiledmap_core::logging::targets;

use crate::error::{MapViewError, Result};
use crate::geometry::LatLng;

/// Default raster tile endpoint, addressed by zoom/x/y.
pub const DEFAULT_TILE_ENDPOINT: &str = "/map-tile/{z}/{x}/{y}.png";

/// Default interaction grid endpoint. The JSONP callback placeholder is part
/// of the template, so parameters are appended with `&`.
pub const DEFAULT_GRID_ENDPOINT: &str = "/map-grid/{z}/{x}/{y}.grid.json?callback={cb}";

/// The base background layer drawn under the dataset tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseLayerConfig {
    pub url: String,
    pub opacity: f32,
}

impl Default for BaseLayerConfig {
    fn default() -> Self {
        Self {
            url: "http://otile1.mqcdn.com/tiles/1.0.0/map/{z}/{x}/{y}.jpg".to_string(),
            opacity: 0.8,
        }
    }
}

/// An inclusive zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, zoom: u8) -> bool {
        (self.min..=self.max).contains(&zoom)
    }

    pub fn clamp(&self, zoom: u8) -> u8 {
        zoom.clamp(self.min, self.max)
    }
}

/// Where the map starts before any zoom-to-features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultView {
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for DefaultView {
    fn default() -> Self {
        Self {
            center: LatLng::new(51.505, -0.09),
            zoom: 4,
        }
    }
}

/// Backend path templates for tiles and interaction grids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub tile: String,
    pub grid: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            tile: DEFAULT_TILE_ENDPOINT.to_string(),
            grid: DEFAULT_GRID_ENDPOINT.to_string(),
        }
    }
}

/// Complete map view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub tile_layer: BaseLayerConfig,
    /// Hard zoom limits of the map.
    pub zoom_bounds: ZoomRange,
    /// Zoom-to-features is clamped to this range so the result keeps some
    /// context without zooming out to the whole world.
    pub initial_zoom: ZoomRange,
    pub default_view: DefaultView,
    pub endpoints: Endpoints,
    /// Pixel resolution of the interaction grid.
    pub grid_resolution: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_layer: BaseLayerConfig::default(),
            zoom_bounds: ZoomRange::new(3, 18),
            initial_zoom: ZoomRange::new(3, 6),
            default_view: DefaultView::default(),
            endpoints: Endpoints::default(),
            grid_resolution: 4,
        }
    }
}

impl MapConfig {
    /// Parse and validate a TOML configuration.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|err| MapViewError::config_io(path, err))?;
        tracing::debug!(target: targets::CONFIG, path = %path.display(), "loading map configuration");
        Self::from_toml_str(&source)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source).map_err(MapViewError::JsonParse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and templates.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.tile_layer.opacity) {
            return Err(MapViewError::invalid_config(
                "tile_layer.opacity",
                format!("{} is outside [0, 1]", self.tile_layer.opacity),
            ));
        }
        for (key, range) in [
            ("zoom_bounds", self.zoom_bounds),
            ("initial_zoom", self.initial_zoom),
        ] {
            if range.min > range.max {
                return Err(MapViewError::invalid_config(
                    key,
                    format!("min {} is greater than max {}", range.min, range.max),
                ));
            }
        }
        if !self.zoom_bounds.contains(self.initial_zoom.min)
            || !self.zoom_bounds.contains(self.initial_zoom.max)
        {
            return Err(MapViewError::invalid_config(
                "initial_zoom",
                "must lie within zoom_bounds",
            ));
        }
        if !self.zoom_bounds.contains(self.default_view.zoom) {
            return Err(MapViewError::invalid_config(
                "default_view.zoom",
                format!("{} is outside zoom_bounds", self.default_view.zoom),
            ));
        }
        if self.grid_resolution == 0 {
            return Err(MapViewError::invalid_config(
                "grid_resolution",
                "must be greater than zero",
            ));
        }
        for (key, template) in [
            ("tile_layer.url", &self.tile_layer.url),
            ("endpoints.tile", &self.endpoints.tile),
            ("endpoints.grid", &self.endpoints.grid),
        ] {
            if let Some(missing) = ["{z}", "{x}", "{y}"]
                .into_iter()
                .find(|placeholder| !template.contains(placeholder))
            {
                return Err(MapViewError::invalid_config(
                    key,
                    format!("template '{template}' is missing {missing}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MapConfig::default();
        config.validate().unwrap();
        assert_eq!(config.endpoints.tile, "/map-tile/{z}/{x}/{y}.png");
        assert_eq!(config.default_view.center, LatLng::new(51.505, -0.09));
        assert_eq!(config.default_view.zoom, 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MapConfig::from_toml_str(
            r#"
            [tile_layer]
            opacity = 0.5

            [default_view]
            zoom = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.tile_layer.opacity, 0.5);
        assert_eq!(config.default_view.zoom, 5);
        assert_eq!(config.default_view.center, LatLng::new(51.505, -0.09));
        assert_eq!(config.grid_resolution, 4);
    }

    #[test]
    fn test_json_config() {
        let config = MapConfig::from_json_str(
            r#"{"endpoints": {"tile": "/tiles/{z}/{x}/{y}.png"}, "grid_resolution": 2}"#,
        )
        .unwrap();
        assert_eq!(config.endpoints.tile, "/tiles/{z}/{x}/{y}.png");
        assert_eq!(config.endpoints.grid, DEFAULT_GRID_ENDPOINT);
        assert_eq!(config.grid_resolution, 2);
    }

    #[test]
    fn test_validation_failures() {
        let err = MapConfig::from_toml_str("[tile_layer]\nopacity = 1.5").unwrap_err();
        assert!(matches!(err, MapViewError::InvalidConfig { ref key, .. } if key == "tile_layer.opacity"));

        let err = MapConfig::from_toml_str("[initial_zoom]\nmin = 7\nmax = 4").unwrap_err();
        assert!(matches!(err, MapViewError::InvalidConfig { ref key, .. } if key == "initial_zoom"));

        let err = MapConfig::from_toml_str("[initial_zoom]\nmin = 1\nmax = 4").unwrap_err();
        assert!(matches!(err, MapViewError::InvalidConfig { ref key, .. } if key == "initial_zoom"));

        let err = MapConfig::from_toml_str("grid_resolution = 0").unwrap_err();
        assert!(matches!(err, MapViewError::InvalidConfig { ref key, .. } if key == "grid_resolution"));

        let err = MapConfig::from_toml_str("[endpoints]\ngrid = \"/grid/{z}/{x}.json\"").unwrap_err();
        assert!(matches!(err, MapViewError::InvalidConfig { ref key, .. } if key == "endpoints.grid"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            MapConfig::from_toml_str("grid_resolution = \"four\""),
            Err(MapViewError::TomlParse(_))
        ));
        assert!(matches!(
            MapConfig::from_json_str("{"),
            Err(MapViewError::JsonParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write as _;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[endpoints]").unwrap();
        writeln!(file, "tile = \"/tiles/{{z}}/{{x}}/{{y}}.png\"").unwrap();
        let config = MapConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.endpoints.tile, "/tiles/{z}/{x}/{y}.png");
    }

    #[test]
    fn test_missing_file() {
        let err = MapConfig::from_toml_file("/nonexistent/tiledmap.toml").unwrap_err();
        assert!(matches!(err, MapViewError::ConfigIo { .. }));
    }

    #[test]
    fn test_zoom_range_clamp() {
        let range = ZoomRange::new(3, 6);
        assert_eq!(range.clamp(1), 3);
        assert_eq!(range.clamp(5), 5);
        assert_eq!(range.clamp(12), 6);
    }
}
