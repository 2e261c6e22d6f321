//! Map coordinates, drawn shapes and their well-known-text encoding.
//!
//! The draw tool only offers region-producing tools, so every shape that
//! reaches the encoder is a closed ring. The encoded form is a single WKT
//! `POLYGON` with longitude first, which is what the tile backend feeds to its
//! spatial intersection test.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::error::{MapViewError, Result};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

/// An axis-aligned geographic rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Create bounds from two opposite corners in any order.
    pub fn new(a: LatLng, b: LatLng) -> Self {
        Self {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// The smallest bounds containing every point, or `None` for no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LatLng>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::new(first, first);
        for point in iter {
            bounds.extend(*point);
        }
        Some(bounds)
    }

    /// Grow the bounds to include a point.
    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn contains(&self, point: LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north_east.lat, self.south_west.lng)
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.south_west.lat, self.north_east.lng)
    }
}

/// Tools the draw control can offer.
///
/// Only [`DrawToolKind::Polygon`] and [`DrawToolKind::Rectangle`] produce a
/// region; the others are always disabled on the map view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawToolKind {
    Polygon,
    Rectangle,
    Polyline,
    Marker,
    Circle,
}

impl DrawToolKind {
    /// Whether the tool draws a closed planar region.
    pub fn is_region(self) -> bool {
        matches!(self, Self::Polygon | Self::Rectangle)
    }

    /// The tools enabled on the map view's draw control.
    pub const REGION_TOOLS: [DrawToolKind; 2] = [DrawToolKind::Polygon, DrawToolKind::Rectangle];
}

/// The kind of a drawn region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Polygon,
    Rectangle,
}

/// A user-drawn closed region.
///
/// Vertices are stored as an open ring; the closing vertex is added when
/// encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawnShape {
    kind: ShapeKind,
    vertices: Vec<LatLng>,
}

impl DrawnShape {
    /// A polygon through the given vertices.
    ///
    /// A trailing copy of the first vertex is accepted and dropped. Fewer than
    /// three distinct vertices do not enclose a region.
    pub fn polygon(mut vertices: Vec<LatLng>) -> Result<Self> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        let mut distinct: Vec<LatLng> = Vec::with_capacity(vertices.len());
        for vertex in &vertices {
            if !distinct.contains(vertex) {
                distinct.push(*vertex);
            }
        }
        if distinct.len() < 3 {
            return Err(MapViewError::DegenerateShape(format!(
                "polygon needs at least 3 distinct vertices, got {}",
                distinct.len()
            )));
        }
        Ok(Self {
            kind: ShapeKind::Polygon,
            vertices,
        })
    }

    /// A rectangle covering the bounds, wound south-west, north-west,
    /// north-east, south-east.
    pub fn rectangle(bounds: LatLngBounds) -> Result<Self> {
        if bounds.south_west.lat == bounds.north_east.lat
            || bounds.south_west.lng == bounds.north_east.lng
        {
            return Err(MapViewError::DegenerateShape(format!(
                "rectangle between {} and {} has no area",
                bounds.south_west, bounds.north_east
            )));
        }
        Ok(Self {
            kind: ShapeKind::Rectangle,
            vertices: vec![
                bounds.south_west,
                bounds.north_west(),
                bounds.north_east,
                bounds.south_east(),
            ],
        })
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn vertices(&self) -> &[LatLng] {
        &self.vertices
    }

    pub fn bounds(&self) -> LatLngBounds {
        // Constructors guarantee at least three vertices.
        LatLngBounds::from_points(&self.vertices)
            .unwrap_or_else(|| LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.0)))
    }

    /// Encode as a WKT polygon, longitude first, ring closed.
    pub fn to_wkt(&self) -> String {
        let mut wkt = String::from("POLYGON ((");
        let closing = self.vertices.first();
        for (i, vertex) in self.vertices.iter().chain(closing).enumerate() {
            if i > 0 {
                wkt.push_str(", ");
            }
            // Writing to a String cannot fail.
            let _ = write!(wkt, "{} {}", vertex.lng, vertex.lat);
        }
        wkt.push_str("))");
        wkt
    }
}

/// The draw tool's "shape created" event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawEvent {
    pub layer_type: DrawToolKind,
    pub vertices: Vec<LatLng>,
}

impl DrawEvent {
    pub fn new(layer_type: DrawToolKind, vertices: Vec<LatLng>) -> Self {
        Self {
            layer_type,
            vertices,
        }
    }

    /// Convenience for a rectangle event spanning two corners.
    pub fn rectangle(a: LatLng, b: LatLng) -> Self {
        let bounds = LatLngBounds::new(a, b);
        Self::new(
            DrawToolKind::Rectangle,
            vec![
                bounds.south_west,
                bounds.north_west(),
                bounds.north_east,
                bounds.south_east(),
            ],
        )
    }

    /// Convert the event into a region, rejecting tools that do not draw one.
    pub fn into_shape(self) -> Result<DrawnShape> {
        match self.layer_type {
            DrawToolKind::Polygon => DrawnShape::polygon(self.vertices),
            DrawToolKind::Rectangle => {
                let bounds = LatLngBounds::from_points(&self.vertices).ok_or_else(|| {
                    MapViewError::DegenerateShape("rectangle without vertices".into())
                })?;
                DrawnShape::rectangle(bounds)
            }
            other => Err(MapViewError::DegenerateShape(format!(
                "{other:?} does not draw a region"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ll(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng)
    }

    #[test]
    fn test_rectangle_wkt_is_closed_and_lng_first() {
        let shape = DrawnShape::rectangle(LatLngBounds::new(ll(10.0, 30.0), ll(20.0, 40.0))).unwrap();
        assert_eq!(
            shape.to_wkt(),
            "POLYGON ((30 10, 30 20, 40 20, 40 10, 30 10))"
        );
    }

    #[test]
    fn test_polygon_wkt_keeps_fractional_coordinates() {
        let shape =
            DrawnShape::polygon(vec![ll(51.505, -0.09), ll(51.51, -0.1), ll(51.5, -0.12)]).unwrap();
        assert_eq!(
            shape.to_wkt(),
            "POLYGON ((-0.09 51.505, -0.1 51.51, -0.12 51.5, -0.09 51.505))"
        );
    }

    #[test]
    fn test_polygon_accepts_explicitly_closed_ring() {
        let open = DrawnShape::polygon(vec![ll(0.0, 0.0), ll(0.0, 1.0), ll(1.0, 1.0)]).unwrap();
        let closed =
            DrawnShape::polygon(vec![ll(0.0, 0.0), ll(0.0, 1.0), ll(1.0, 1.0), ll(0.0, 0.0)])
                .unwrap();
        assert_eq!(open, closed);
        assert_eq!(open.to_wkt(), closed.to_wkt());
    }

    #[test]
    fn test_degenerate_shapes_rejected() {
        assert!(DrawnShape::polygon(vec![ll(0.0, 0.0), ll(1.0, 1.0)]).is_err());
        assert!(DrawnShape::polygon(vec![ll(0.0, 0.0), ll(0.0, 0.0), ll(1.0, 1.0)]).is_err());
        assert!(DrawnShape::rectangle(LatLngBounds::new(ll(1.0, 1.0), ll(1.0, 5.0))).is_err());
    }

    #[test]
    fn test_draw_event_conversion() {
        let event = DrawEvent::rectangle(ll(20.0, 40.0), ll(10.0, 30.0));
        let shape = event.into_shape().unwrap();
        assert_eq!(shape.kind(), ShapeKind::Rectangle);
        assert_eq!(shape.bounds(), LatLngBounds::new(ll(10.0, 30.0), ll(20.0, 40.0)));

        let marker = DrawEvent::new(DrawToolKind::Marker, vec![ll(1.0, 1.0)]);
        assert!(matches!(
            marker.into_shape(),
            Err(MapViewError::DegenerateShape(_))
        ));
    }

    #[test]
    fn test_bounds_helpers() {
        let mut bounds = LatLngBounds::new(ll(0.0, 0.0), ll(2.0, 2.0));
        assert_eq!(bounds.center(), ll(1.0, 1.0));
        assert!(bounds.contains(ll(1.0, 2.0)));
        assert!(!bounds.contains(ll(3.0, 1.0)));

        bounds.extend(ll(-1.0, 4.0));
        assert_eq!(bounds.south_west, ll(-1.0, 0.0));
        assert_eq!(bounds.north_east, ll(2.0, 4.0));
        assert!(LatLngBounds::from_points(&Vec::<LatLng>::new()).is_none());
    }

    #[test]
    fn test_region_tools() {
        assert!(DrawToolKind::REGION_TOOLS.iter().all(|tool| tool.is_region()));
        assert!(!DrawToolKind::Circle.is_region());
        assert!(!DrawToolKind::Polyline.is_region());
    }
}
