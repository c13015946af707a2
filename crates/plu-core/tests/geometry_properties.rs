//! Property tests for zone geometry conversion and the metadata payload

use chrono::Utc;
use plu_core::{
    build_bounds_from_polygons, build_document_metadata_payload, geometry_to_display_polygons,
    ConversationBranch, DocumentMetadataInput, LatLon,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn coordinate() -> impl Strategy<Value = (f64, f64)> {
    (-180.0f64..180.0, -90.0f64..90.0)
}

fn ring() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec(coordinate(), 1..12)
}

fn to_geojson_ring(points: &[(f64, f64)]) -> Value {
    Value::Array(points.iter().map(|(lon, lat)| json!([lon, lat])).collect())
}

proptest! {
    #[test]
    fn polygon_points_are_swapped_in_order(points in ring()) {
        let geometry = json!({ "type": "Polygon", "coordinates": [to_geojson_ring(&points)] });

        let rings = geometry_to_display_polygons(Some(&geometry));

        prop_assert_eq!(rings.len(), 1);
        let expected: Vec<LatLon> = points.iter().map(|&(lon, lat)| LatLon::new(lat, lon)).collect();
        prop_assert_eq!(&rings[0], &expected);
    }

    #[test]
    fn multipolygon_keeps_one_ring_per_part(parts in prop::collection::vec(ring(), 1..5)) {
        let coordinates: Vec<Value> = parts
            .iter()
            .map(|points| json!([to_geojson_ring(points), to_geojson_ring(&points[..1])]))
            .collect();
        let geometry = json!({ "type": "MultiPolygon", "coordinates": coordinates });

        let rings = geometry_to_display_polygons(Some(&geometry));

        prop_assert_eq!(rings.len(), parts.len());
        for (ring, points) in rings.iter().zip(&parts) {
            prop_assert_eq!(ring.len(), points.len());
        }
    }

    #[test]
    fn bounds_cover_center_and_every_point(parts in prop::collection::vec(ring(), 0..4), (lon, lat) in coordinate()) {
        let rings: Vec<Vec<LatLon>> = parts
            .iter()
            .map(|points| points.iter().map(|&(lon, lat)| LatLon::new(lat, lon)).collect())
            .collect();
        let center = LatLon::new(lat, lon);

        let bounds = build_bounds_from_polygons(&rings, center);

        prop_assert_eq!(bounds.len(), 1 + parts.iter().map(Vec::len).sum::<usize>());
        prop_assert_eq!(bounds[0], center);
    }

    #[test]
    fn arbitrary_json_never_panics(kind in "[A-Za-z]{0,12}", value in any::<i64>()) {
        let geometry = json!({ "type": kind, "coordinates": value });
        prop_assert!(geometry_to_display_polygons(Some(&geometry)).is_empty());
    }
}

#[test]
fn map_availability_follows_geometry() {
    let polygon = json!({
        "type": "Polygon",
        "coordinates": [[[4.83, 45.75], [4.84, 45.75], [4.84, 45.76], [4.83, 45.75]]]
    });
    let empty = json!({ "type": "Polygon", "coordinates": [] });

    for (geometry, expected) in [(Some(&polygon), true), (Some(&empty), false), (None, false)] {
        let payload = build_document_metadata_payload(&DocumentMetadataInput {
            branch: ConversationBranch::NonRnuSource,
            document_id: Some("doc-1"),
            zone_code: Some("UA1"),
            zone_name: None,
            city_name: Some("Lyon"),
            source_plu_url: Some("  "),
            map_geometry: geometry,
            enriched_at: Utc::now(),
        });
        assert_eq!(payload.map_geometry_available, expected);
        assert_eq!(payload.source_plu_url, None);
    }
}
