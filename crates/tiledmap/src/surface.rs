//! Contracts with the host framework and the map rendering backend.
//!
//! The view never draws anything itself. It describes layers and controls
//! and hands them to a [`MapSurface`]; the surface turns them into tiles,
//! hit-testing grids and widgets and emits their events back through the
//! signals carried in the descriptions.

use std::sync::Arc;

use tiledmap_core::Signal;

use crate::config::ZoomRange;
use crate::geometry::{DrawEvent, DrawToolKind, DrawnShape, LatLng, LatLngBounds};
use crate::overlay::{GridEvents, InfoControl};

/// Handle to a layer attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

/// Handle to a control attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub u64);

/// Screen corner a control is pinned to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// A layer to attach.
#[derive(Debug, Clone)]
pub enum LayerSpec {
    /// Raster tiles from an xyz URL template.
    Tile { url: String, opacity: f32 },
    /// Per-pixel feature grid from an xyz URL template with a `{cb}`
    /// callback placeholder. The surface emits hover events on `events`.
    UtfGrid {
        url: String,
        resolution: u32,
        events: Arc<GridEvents>,
    },
    /// A user-drawn region.
    Shape(DrawnShape),
}

impl LayerSpec {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Tile { url, .. } | Self::UtfGrid { url, .. } => Some(url),
            Self::Shape(_) => None,
        }
    }
}

/// A control to attach.
#[derive(Debug, Clone)]
pub enum ControlSpec {
    /// The drawing toolbar. The surface emits finished shapes on `created`.
    Draw {
        tools: Vec<DrawToolKind>,
        created: Arc<Signal<DrawEvent>>,
    },
    /// The feature info panel.
    Info(Arc<InfoControl>),
}

/// The map rendering backend.
///
/// Removing a layer or control that is not attached must be a no-op.
pub trait MapSurface: Send {
    /// Create the map inside the element matched by `container`.
    fn mount(&mut self, container: &str);

    fn set_view(&mut self, center: LatLng, zoom: u8);

    fn set_zoom_bounds(&mut self, bounds: ZoomRange);

    fn add_layer(&mut self, layer: LayerSpec) -> LayerId;

    fn remove_layer(&mut self, id: LayerId);

    fn add_control(&mut self, control: ControlSpec) -> ControlId;

    fn remove_control(&mut self, id: ControlId);

    /// Recompute pixel dimensions, needed after the container was hidden.
    fn invalidate_size(&mut self);

    /// Fit the viewport to `bounds`, with the resulting zoom clamped to `zoom`.
    fn fit_bounds(&mut self, bounds: LatLngBounds, zoom: ZoomRange);
}

/// The host widget framework's view container.
pub trait ViewHost: Send {
    /// Replace the contents of the view's root element.
    ///
    /// Hosts may skip the write when the element already holds identical
    /// markup, which keeps a mounted map alive across renders.
    fn set_html(&mut self, markup: &str);

    fn set_container_visible(&mut self, visible: bool);

    /// Toggle the pagination controls that compete with the map for space.
    fn set_pager_visible(&mut self, visible: bool);
}
