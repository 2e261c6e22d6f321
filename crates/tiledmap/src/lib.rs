//! Tiled map view for a dataset, kept in sync with a shared query state.
//!
//! The view renders a dataset as raster tiles plus a hover-inspection grid,
//! both requested with the current search term, field filters and drawn
//! region. Whenever the shared [`QueryState`] changes, the tile and grid
//! layers are torn down and rebuilt from the new parameters.
//!
//! The map rendering backend and the host widget framework stay outside this
//! crate, behind [`MapSurface`] and [`ViewHost`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tiledmap::{Dataset, MapView, QueryState};
//!
//! let query = Arc::new(QueryState::new());
//! let view = MapView::with_defaults(Dataset::new("abc", "Mammals"), query.clone(), surface, host);
//! view.render()?;
//!
//! // Another view changes the search term; the map redraws itself.
//! query.set_q("lion");
//! ```

pub mod config;
mod error;
pub mod geometry;
pub mod layers;
pub mod overlay;
pub mod params;
pub mod prelude;
pub mod query;
pub mod surface;
pub mod view;

pub use config::MapConfig;
pub use error::{MapViewError, Result};
pub use geometry::{DrawEvent, DrawToolKind, DrawnShape, LatLng, LatLngBounds, ShapeKind};
pub use layers::{LayerManager, TileJson, UrlTemplates};
pub use overlay::{FeatureAttributes, GridEvents, InfoControl, InfoPanelState};
pub use params::{build_parameters, build_styled_parameters, MapStyle, RequestParameters};
pub use query::{Filter, QueryChange, QuerySnapshot, QueryState};
pub use surface::{ControlId, ControlPosition, ControlSpec, LayerId, LayerSpec, MapSurface, ViewHost};
pub use view::{Dataset, MapView, ViewOptions, ViewState};

pub use tiledmap_core::{ConnectionGuard, ConnectionId, Property, Signal};
