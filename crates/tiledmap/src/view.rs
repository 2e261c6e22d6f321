//! The map view controller.
//!
//! A [`MapView`] keeps the rendered dataset layers in step with a shared
//! [`QueryState`]. Every change notification from the query state triggers
//! one synchronous render: stamp the container markup, set the map up if this
//! is the first render, then rebuild the dataset layers from the current
//! parameters.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --render()--> Ready --show()--> Visible
//!                                   --hide()--> Hidden
//! ```
//!
//! Redraws happen in any state after setup and never change it. Setup runs
//! exactly once per view; later renders reuse the mounted map.
//!
//! # Drawing
//!
//! The draw control only offers polygon and rectangle tools. A finished shape
//! replaces the previous one on the map and is published to the query state
//! as its geometry filter. That write is the only one this view ever makes to
//! the query state, and its change notification is what redraws the layers.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tiledmap_core::logging::{span_names, targets};
use tiledmap_core::{ConnectionGuard, PerfSpan, Signal};

use crate::config::MapConfig;
use crate::error::{MapViewError, Result};
use crate::geometry::{DrawEvent, DrawToolKind, DrawnShape, LatLngBounds};
use crate::layers::{LayerManager, TileJson};
use crate::overlay::InfoControl;
use crate::params::{build_styled_parameters, MapStyle, RequestParameters};
use crate::query::{QueryChange, QueryState};
use crate::surface::{ControlId, ControlPosition, ControlSpec, LayerId, LayerSpec, MapSurface, ViewHost};

/// Markup stamped into the view's root element on every render.
pub const MAP_SKELETON: &str = r#"<div class="recline-map"><div class="panel map"></div></div>"#;

/// Selector of the element the map is mounted into.
pub const MAP_PANEL: &str = ".panel.map";

/// The dataset shown by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// Resource identifier sent with every tile request.
    pub id: String,
    /// Display name used in the info panel heading.
    pub name: String,
}

impl Dataset {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Per-view preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Zoom to the dataset's features when they become known.
    pub auto_zoom: bool,
    /// Tile rendering style requested from the backend.
    pub style: MapStyle,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            auto_zoom: true,
            style: MapStyle::Plot,
        }
    }
}

/// Lifecycle state of a map view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Uninitialized,
    Ready,
    Visible,
    Hidden,
}

struct Controller {
    self_ref: Weak<Mutex<Controller>>,
    dataset: Dataset,
    config: MapConfig,
    options: ViewOptions,
    query: Arc<QueryState>,
    surface: Box<dyn MapSurface>,
    host: Box<dyn ViewHost>,
    info: Arc<InfoControl>,
    layers: LayerManager,
    draw_events: Arc<Signal<DrawEvent>>,
    draw_connection: Option<ConnectionGuard<DrawEvent>>,
    base_layer: Option<LayerId>,
    draw_control: Option<ControlId>,
    drawn: Option<(DrawnShape, LayerId)>,
    set_up: bool,
    destroyed: bool,
    visible: Option<bool>,
    zoom_pending: bool,
    feature_bounds: Option<LatLngBounds>,
    parameters: Option<RequestParameters>,
    render_count: u64,
    redraw_count: u64,
}

impl Controller {
    fn state(&self) -> ViewState {
        match (self.set_up, self.visible) {
            (false, _) => ViewState::Uninitialized,
            (true, None) => ViewState::Ready,
            (true, Some(true)) => ViewState::Visible,
            (true, Some(false)) => ViewState::Hidden,
        }
    }

    #[tracing::instrument(skip(self), target = "tiledmap::view", level = "debug")]
    fn render(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(MapViewError::Destroyed);
        }
        let _span = PerfSpan::new(span_names::RENDER);
        self.render_count += 1;
        self.host.set_html(MAP_SKELETON);
        self.setup();
        self.redraw()
    }

    fn setup(&mut self) {
        if self.set_up {
            return;
        }
        let _span = PerfSpan::new(span_names::SETUP);

        self.surface.mount(MAP_PANEL);
        self.surface.set_zoom_bounds(self.config.zoom_bounds);
        self.surface
            .set_view(self.config.default_view.center, self.config.default_view.zoom);
        self.base_layer = Some(self.surface.add_layer(LayerSpec::Tile {
            url: self.config.tile_layer.url.clone(),
            opacity: self.config.tile_layer.opacity,
        }));
        self.draw_control = Some(self.surface.add_control(ControlSpec::Draw {
            tools: DrawToolKind::REGION_TOOLS.to_vec(),
            created: Arc::clone(&self.draw_events),
        }));

        let controller = self.self_ref.clone();
        let query = Arc::downgrade(&self.query);
        self.draw_connection = Some(self.draw_events.connect_scoped(move |event| {
            if let (Some(controller), Some(query)) = (controller.upgrade(), query.upgrade()) {
                apply_drawn_shape(&controller, &query, event.clone());
            }
        }));

        self.set_up = true;
        tracing::debug!(
            target: targets::VIEW,
            resource_id = %self.dataset.id,
            center = %self.config.default_view.center,
            zoom = self.config.default_view.zoom,
            "map set up"
        );
    }

    #[tracing::instrument(skip(self), target = "tiledmap::view", level = "debug")]
    fn redraw(&mut self) -> Result<()> {
        if !self.set_up {
            tracing::error!(target: targets::VIEW, "redraw requested before setup");
            return Err(MapViewError::NotSetUp("redraw"));
        }
        let _span = PerfSpan::new(span_names::REDRAW);

        let params = build_styled_parameters(
            &self.dataset.id,
            &self.query.snapshot(),
            self.drawn.as_ref().map(|(shape, _)| shape),
            self.options.style,
        );
        self.layers.redraw(self.surface.as_mut(), &params, &self.info);
        self.redraw_count += 1;
        tracing::debug!(
            target: targets::VIEW,
            parameters = params.len(),
            redraws = self.redraw_count,
            "dataset layers redrawn"
        );
        self.parameters = Some(params);
        Ok(())
    }

    /// Swap the drawn shape on the map, returning its encoding.
    fn replace_shape(&mut self, event: DrawEvent) -> Option<String> {
        if self.destroyed {
            tracing::warn!(target: targets::VIEW, "ignoring draw event on destroyed view");
            return None;
        }
        if !self.set_up {
            tracing::error!(target: targets::VIEW, "draw event before setup");
            return None;
        }
        let layer_type = event.layer_type;
        let shape = match event.into_shape() {
            Ok(shape) => shape,
            Err(err) => {
                tracing::warn!(target: targets::VIEW, ?layer_type, %err, "ignoring drawn shape");
                return None;
            }
        };

        if let Some((_, previous)) = self.drawn.take() {
            self.surface.remove_layer(previous);
        }
        let layer = self.surface.add_layer(LayerSpec::Shape(shape.clone()));
        let wkt = shape.to_wkt();
        tracing::debug!(target: targets::VIEW, kind = ?shape.kind(), %wkt, "shape drawn");
        self.drawn = Some((shape, layer));
        Some(wkt)
    }

    fn set_style(&mut self, style: MapStyle) -> Result<()> {
        if self.options.style == style {
            return Ok(());
        }
        self.options.style = style;
        tracing::debug!(target: targets::VIEW, ?style, "map style changed");
        if self.set_up && !self.destroyed {
            self.redraw()
        } else {
            Ok(())
        }
    }

    fn show(&mut self) {
        self.host.set_container_visible(true);
        self.host.set_pager_visible(false);
        if self.set_up {
            self.surface.invalidate_size();
            if self.zoom_pending && self.options.auto_zoom {
                self.zoom_to_features();
                self.zoom_pending = false;
            }
        }
        self.visible = Some(true);
    }

    fn hide(&mut self) {
        self.host.set_pager_visible(true);
        self.visible = Some(false);
    }

    fn set_feature_bounds(&mut self, bounds: LatLngBounds) {
        self.feature_bounds = Some(bounds);
        if self.state() == ViewState::Visible && self.options.auto_zoom {
            self.zoom_to_features();
        } else {
            self.zoom_pending = true;
        }
    }

    fn zoom_to_features(&mut self) -> bool {
        match (self.set_up, self.feature_bounds) {
            (true, Some(bounds)) => {
                self.surface.fit_bounds(bounds, self.config.initial_zoom);
                true
            }
            _ => false,
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.layers.teardown(self.surface.as_mut());
        if let Some((_, layer)) = self.drawn.take() {
            self.surface.remove_layer(layer);
        }
        if let Some(layer) = self.base_layer.take() {
            self.surface.remove_layer(layer);
        }
        if let Some(control) = self.draw_control.take() {
            self.surface.remove_control(control);
        }
        self.draw_connection = None;
        self.destroyed = true;
        tracing::debug!(target: targets::VIEW, resource_id = %self.dataset.id, "map view destroyed");
    }
}

/// Install a drawn shape and publish it as the geometry filter.
///
/// The controller lock is released before the query state is written, since
/// the resulting notification renders the view again.
fn apply_drawn_shape(controller: &Mutex<Controller>, query: &QueryState, event: DrawEvent) {
    let wkt = controller.lock().replace_shape(event);
    if let Some(wkt) = wkt {
        query.replace_geometry(Some(wkt));
    }
}

/// A tiled map view bound to a shared query state.
pub struct MapView {
    controller: Arc<Mutex<Controller>>,
    query: Arc<QueryState>,
    subscription: Option<ConnectionGuard<QueryChange>>,
}

impl MapView {
    /// Create a view and subscribe it to `query`.
    ///
    /// Nothing is drawn until the first [`render`](Self::render).
    pub fn new(
        dataset: Dataset,
        query: Arc<QueryState>,
        surface: impl MapSurface + 'static,
        host: impl ViewHost + 'static,
        config: MapConfig,
        options: ViewOptions,
    ) -> Self {
        let info = InfoControl::new(dataset.name.clone(), ControlPosition::BottomRight);
        let layers = LayerManager::from_config(&config);
        let controller = Arc::new_cyclic(|self_ref| {
            Mutex::new(Controller {
                self_ref: self_ref.clone(),
                dataset,
                config,
                options,
                query: Arc::clone(&query),
                surface: Box::new(surface),
                host: Box::new(host),
                info,
                layers,
                draw_events: Arc::new(Signal::new()),
                draw_connection: None,
                base_layer: None,
                draw_control: None,
                drawn: None,
                set_up: false,
                destroyed: false,
                visible: None,
                zoom_pending: false,
                feature_bounds: None,
                parameters: None,
                render_count: 0,
                redraw_count: 0,
            })
        });

        let weak = Arc::downgrade(&controller);
        let subscription = query.changed().connect_scoped(move |change| {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            tracing::trace!(target: targets::VIEW, ?change, "query state notification");
            if let Err(err) = controller.lock().render() {
                tracing::error!(target: targets::VIEW, %err, "render after query change failed");
            }
        });

        Self {
            controller,
            query,
            subscription: Some(subscription),
        }
    }

    /// Create a view with default configuration and options.
    pub fn with_defaults(
        dataset: Dataset,
        query: Arc<QueryState>,
        surface: impl MapSurface + 'static,
        host: impl ViewHost + 'static,
    ) -> Self {
        Self::new(
            dataset,
            query,
            surface,
            host,
            MapConfig::default(),
            ViewOptions::default(),
        )
    }

    /// Stamp the markup, set up on first use, redraw.
    pub fn render(&self) -> Result<()> {
        self.controller.lock().render()
    }

    /// Rebuild the dataset layers from the current state.
    pub fn redraw(&self) -> Result<()> {
        self.controller.lock().redraw()
    }

    /// Feed a draw-tool "shape created" event.
    pub fn handle_shape_created(&self, event: DrawEvent) {
        apply_drawn_shape(&self.controller, &self.query, event);
    }

    /// Switch the tile style, redrawing if the map is already set up.
    pub fn set_style(&self, style: MapStyle) -> Result<()> {
        self.controller.lock().set_style(style)
    }

    /// Current tile style.
    pub fn style(&self) -> MapStyle {
        self.controller.lock().options.style
    }

    /// Reveal the map and hide the pager. Runs a pending auto-zoom.
    pub fn show(&self) {
        self.controller.lock().show();
    }

    /// Reveal the pager.
    pub fn hide(&self) {
        self.controller.lock().hide();
    }

    /// Record the extent of the dataset's features.
    ///
    /// Zooms right away when the view is visible and auto-zoom is on,
    /// otherwise the zoom waits for the next [`show`](Self::show).
    pub fn set_feature_bounds(&self, bounds: LatLngBounds) {
        self.controller.lock().set_feature_bounds(bounds);
    }

    /// Fit the map to the dataset's features. Returns whether it zoomed.
    pub fn zoom_to_features(&self) -> bool {
        self.controller.lock().zoom_to_features()
    }

    /// Remove everything the view put on the map and stop listening to the
    /// query state.
    pub fn destroy(&mut self) {
        self.subscription = None;
        self.controller.lock().destroy();
    }

    /// Lifecycle state.
    pub fn state(&self) -> ViewState {
        self.controller.lock().state()
    }

    /// The shared query state this view follows.
    pub fn query(&self) -> &Arc<QueryState> {
        &self.query
    }

    /// The dataset shown by this view.
    pub fn dataset(&self) -> Dataset {
        self.controller.lock().dataset.clone()
    }

    /// Dataset layers installed by the latest redraw.
    pub fn owned_layer_count(&self) -> usize {
        self.controller.lock().layers.owned_layers().len()
    }

    /// Controls installed by the latest redraw.
    pub fn owned_control_count(&self) -> usize {
        self.controller.lock().layers.owned_controls().len()
    }

    /// Parameters used by the latest redraw.
    pub fn current_parameters(&self) -> Option<RequestParameters> {
        self.controller.lock().parameters.clone()
    }

    /// Tile and grid URL templates of the latest redraw.
    pub fn tile_json(&self) -> Option<TileJson> {
        self.controller.lock().layers.tile_json().cloned()
    }

    /// The region currently drawn on the map.
    pub fn drawn_shape(&self) -> Option<DrawnShape> {
        self.controller
            .lock()
            .drawn
            .as_ref()
            .map(|(shape, _)| shape.clone())
    }

    /// The info panel control shared with the map.
    pub fn info_control(&self) -> Arc<InfoControl> {
        Arc::clone(&self.controller.lock().info)
    }

    /// Current info panel markup.
    pub fn info_html(&self) -> String {
        self.controller.lock().info.html()
    }

    /// Whether a zoom-to-features waits for the next `show`.
    pub fn zoom_pending(&self) -> bool {
        self.controller.lock().zoom_pending
    }

    /// Renders performed, including those driven by query changes.
    pub fn render_count(&self) -> u64 {
        self.controller.lock().render_count
    }

    /// Dataset layer redraws performed.
    pub fn redraw_count(&self) -> u64 {
        self.controller.lock().redraw_count
    }
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let controller = self.controller.lock();
        f.debug_struct("MapView")
            .field("dataset", &controller.dataset)
            .field("state", &controller.state())
            .field("redraws", &controller.redraw_count)
            .finish()
    }
}
