//! Zone geometry conversion
//!
//! GeoJSON stores positions as `[lon, lat]`; map display consumers expect
//! `[lat, lon]`. Input is read leniently from raw JSON: anything missing,
//! empty or not shaped like coordinates yields no polygons instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A display position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[inline]
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// As a `[lat, lon]` pair
    #[inline]
    #[must_use]
    pub fn to_array(self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

/// One closed outline in display order
pub type Ring = Vec<LatLon>;

/// Convert a GeoJSON `Polygon` or `MultiPolygon` into display rings.
///
/// Each input polygon contributes its outer ring. Holes are not drawn.
#[must_use]
pub fn geometry_to_display_polygons(geometry: Option<&Value>) -> Vec<Ring> {
    let Some(geometry) = geometry.and_then(Value::as_object) else {
        return Vec::new();
    };
    let Some(coordinates) = geometry.get("coordinates").and_then(Value::as_array) else {
        return Vec::new();
    };

    match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => outer_ring(coordinates).into_iter().collect(),
        Some("MultiPolygon") => coordinates
            .iter()
            .filter_map(Value::as_array)
            .filter_map(|polygon| outer_ring(polygon))
            .collect(),
        _ => Vec::new(),
    }
}

/// Points to fit a map view on: the center first, then every ring point.
#[must_use]
pub fn build_bounds_from_polygons(polygons: &[Ring], center: LatLon) -> Vec<LatLon> {
    let mut bounds = Vec::with_capacity(1 + polygons.iter().map(Vec::len).sum::<usize>());
    bounds.push(center);
    bounds.extend(polygons.iter().flatten().copied());
    bounds
}

fn outer_ring(polygon: &[Value]) -> Option<Ring> {
    let ring: Ring = polygon
        .first()?
        .as_array()?
        .iter()
        .filter_map(position)
        .collect();
    (!ring.is_empty()).then_some(ring)
}

fn position(value: &Value) -> Option<LatLon> {
    let pair = value.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    Some(LatLon::new(lat, lon))
}
