//! Prelude module for the tiled map view.
//!
//! ```ignore
//! use tiledmap::prelude::*;
//! ```

pub use crate::config::MapConfig;
pub use crate::geometry::{DrawEvent, DrawToolKind, LatLng, LatLngBounds};
pub use crate::params::MapStyle;
pub use crate::query::{Filter, QueryState};
pub use crate::surface::{ControlId, ControlSpec, LayerId, LayerSpec, MapSurface, ViewHost};
pub use crate::view::{Dataset, MapView, ViewOptions, ViewState};
pub use tiledmap_core::Signal;
