//! The dataset's tile and interaction layers.
//!
//! Every redraw is a full replace: whatever the previous redraw installed is
//! removed, then a new tile layer, a new grid layer and the info control are
//! attached. Nothing is diffed, so the map never shows layers built from two
//! different parameter sets.

use std::sync::Arc;

use serde::Serialize;
use tiledmap_core::logging::targets;

use crate::config::MapConfig;
use crate::overlay::{bind_grid_events, GridEvents, InfoControl};
use crate::params::RequestParameters;
use crate::surface::{ControlId, ControlSpec, LayerId, LayerSpec, MapSurface};

/// Tile and grid URL templates for the current parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TileJson {
    pub tilejson: &'static str,
    pub scheme: &'static str,
    pub tiles: Vec<String>,
    pub grids: Vec<String>,
}

impl TileJson {
    pub fn new(tile_url: String, grid_url: String) -> Self {
        Self {
            tilejson: "1.0.0",
            scheme: "xyz",
            tiles: vec![tile_url],
            grids: vec![grid_url],
        }
    }
}

/// Backend path templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplates {
    tile: String,
    grid: String,
}

impl UrlTemplates {
    pub fn new(tile: impl Into<String>, grid: impl Into<String>) -> Self {
        Self {
            tile: tile.into(),
            grid: grid.into(),
        }
    }

    /// Templates from the configured endpoints.
    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(&config.endpoints.tile, &config.endpoints.grid)
    }

    /// Raster tile URL template carrying `params`.
    pub fn tile_url(&self, params: &RequestParameters) -> String {
        append_query(&self.tile, params)
    }

    /// Interaction grid URL template carrying `params`.
    pub fn grid_url(&self, params: &RequestParameters) -> String {
        append_query(&self.grid, params)
    }
}

fn append_query(template: &str, params: &RequestParameters) -> String {
    let separator = if template.contains('?') { '&' } else { '?' };
    format!("{template}{separator}{}", params.to_query_string())
}

/// Owns the layers and controls installed by the latest redraw.
#[derive(Debug)]
pub struct LayerManager {
    templates: UrlTemplates,
    grid_resolution: u32,
    owned_layers: Vec<LayerId>,
    owned_controls: Vec<ControlId>,
    grid_events: Option<Arc<GridEvents>>,
    tile_json: Option<TileJson>,
}

impl LayerManager {
    pub fn new(templates: UrlTemplates, grid_resolution: u32) -> Self {
        Self {
            templates,
            grid_resolution,
            owned_layers: Vec::new(),
            owned_controls: Vec::new(),
            grid_events: None,
            tile_json: None,
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(UrlTemplates::from_config(config), config.grid_resolution)
    }

    /// Layers installed by the latest redraw.
    pub fn owned_layers(&self) -> &[LayerId] {
        &self.owned_layers
    }

    /// Controls installed by the latest redraw.
    pub fn owned_controls(&self) -> &[ControlId] {
        &self.owned_controls
    }

    /// URL templates of the latest redraw.
    pub fn tile_json(&self) -> Option<&TileJson> {
        self.tile_json.as_ref()
    }

    /// Hover events of the current grid layer.
    pub fn grid_events(&self) -> Option<&Arc<GridEvents>> {
        self.grid_events.as_ref()
    }

    /// Replace every owned layer and control with ones built from `params`.
    pub fn redraw(
        &mut self,
        surface: &mut dyn MapSurface,
        params: &RequestParameters,
        info: &Arc<InfoControl>,
    ) {
        self.teardown(surface);

        let tile_json = TileJson::new(
            self.templates.tile_url(params),
            self.templates.grid_url(params),
        );
        tracing::debug!(
            target: targets::LAYERS,
            tiles = %tile_json.tiles[0],
            grids = %tile_json.grids[0],
            "installing dataset layers"
        );

        let tile = surface.add_layer(LayerSpec::Tile {
            url: tile_json.tiles[0].clone(),
            opacity: 1.0,
        });

        let events = GridEvents::new();
        bind_grid_events(&events, info);
        let grid = surface.add_layer(LayerSpec::UtfGrid {
            url: tile_json.grids[0].clone(),
            resolution: self.grid_resolution,
            events: Arc::clone(&events),
        });

        let control = surface.add_control(ControlSpec::Info(Arc::clone(info)));

        self.owned_layers.extend([tile, grid]);
        self.owned_controls.push(control);
        self.grid_events = Some(events);
        self.tile_json = Some(tile_json);
    }

    /// Remove everything owned from the surface.
    pub fn teardown(&mut self, surface: &mut dyn MapSurface) {
        for layer in self.owned_layers.drain(..) {
            surface.remove_layer(layer);
        }
        for control in self.owned_controls.drain(..) {
            surface.remove_control(control);
        }
        if let Some(events) = self.grid_events.take() {
            events.mouseover.disconnect_all();
            events.mouseout.disconnect_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoomRange;
    use crate::geometry::{LatLng, LatLngBounds};
    use crate::params::build_parameters;
    use crate::query::QuerySnapshot;
    use crate::surface::ControlPosition;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct CountingSurface {
        next: u64,
        layers: BTreeSet<LayerId>,
        controls: BTreeSet<ControlId>,
        removed_missing: usize,
    }

    impl MapSurface for CountingSurface {
        fn mount(&mut self, _container: &str) {}
        fn set_view(&mut self, _center: LatLng, _zoom: u8) {}
        fn set_zoom_bounds(&mut self, _bounds: ZoomRange) {}
        fn add_layer(&mut self, _layer: LayerSpec) -> LayerId {
            self.next += 1;
            self.layers.insert(LayerId(self.next));
            LayerId(self.next)
        }
        fn remove_layer(&mut self, id: LayerId) {
            if !self.layers.remove(&id) {
                self.removed_missing += 1;
            }
        }
        fn add_control(&mut self, _control: ControlSpec) -> ControlId {
            self.next += 1;
            self.controls.insert(ControlId(self.next));
            ControlId(self.next)
        }
        fn remove_control(&mut self, id: ControlId) {
            self.controls.remove(&id);
        }
        fn invalidate_size(&mut self) {}
        fn fit_bounds(&mut self, _bounds: LatLngBounds, _zoom: ZoomRange) {}
    }

    fn params(q: &str) -> RequestParameters {
        let query = QuerySnapshot {
            q: q.to_string(),
            ..Default::default()
        };
        build_parameters("abc", &query, None)
    }

    #[test]
    fn test_url_templates() {
        let templates = UrlTemplates::from_config(&MapConfig::default());
        let p = params("lion");
        assert_eq!(
            templates.tile_url(&p),
            "/map-tile/{z}/{x}/{y}.png?filters=%7B%7D&q=lion&resource_id=abc"
        );
        assert_eq!(
            templates.grid_url(&p),
            "/map-grid/{z}/{x}/{y}.grid.json?callback={cb}&filters=%7B%7D&q=lion&resource_id=abc"
        );
    }

    #[test]
    fn test_redraw_never_leaks_layers() {
        let mut surface = CountingSurface::default();
        let mut manager = LayerManager::from_config(&MapConfig::default());
        let info = InfoControl::new("Mammals", ControlPosition::BottomRight);

        for i in 0..5 {
            manager.redraw(&mut surface, &params(&format!("term{i}")), &info);
            assert_eq!(manager.owned_layers().len(), 2);
            assert_eq!(manager.owned_controls().len(), 1);
            assert_eq!(surface.layers.len(), 2);
            assert_eq!(surface.controls.len(), 1);
        }
        assert_eq!(surface.removed_missing, 0);

        manager.teardown(&mut surface);
        assert!(surface.layers.is_empty());
        assert!(surface.controls.is_empty());
        assert!(manager.owned_layers().is_empty());
    }

    #[test]
    fn test_stale_grid_events_are_detached() {
        let mut surface = CountingSurface::default();
        let mut manager = LayerManager::from_config(&MapConfig::default());
        let info = InfoControl::new("Mammals", ControlPosition::BottomRight);

        manager.redraw(&mut surface, &params(""), &info);
        let stale = Arc::clone(manager.grid_events().unwrap());
        manager.redraw(&mut surface, &params("lion"), &info);

        assert_eq!(stale.mouseover.connection_count(), 0);
        assert_eq!(manager.grid_events().unwrap().mouseover.connection_count(), 1);
    }

    #[test]
    fn test_tile_json_serializes() {
        let mut surface = CountingSurface::default();
        let mut manager = LayerManager::from_config(&MapConfig::default());
        let info = InfoControl::new("Mammals", ControlPosition::BottomRight);
        manager.redraw(&mut surface, &params(""), &info);

        let json = serde_json::to_value(manager.tile_json().unwrap()).unwrap();
        assert_eq!(json["tilejson"], "1.0.0");
        assert_eq!(json["scheme"], "xyz");
        assert_eq!(json["tiles"].as_array().unwrap().len(), 1);
        assert_eq!(json["grids"].as_array().unwrap().len(), 1);
    }
}
