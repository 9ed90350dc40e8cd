use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Number, Value as JsonValue};

use crate::track_types::{GeoPoint, RouteTrack};

/// Convert a route to a GeoJSON Feature the UI can draw directly.
///
/// Two or more points become a LineString, a single point a Point. The
/// feature's bbox is `[minLon, minLat, maxLon, maxLat]` and its properties
/// carry the route statistics.
pub fn route_to_feature(route: &RouteTrack) -> Feature {
    let coords: Vec<Vec<f64>> = route.points().iter().map(point_coords).collect();

    let value = match coords.as_slice() {
        [single] => Value::Point(single.clone()),
        _ => Value::LineString(coords),
    };

    let b = route.bounds();
    Feature {
        bbox: Some(vec![b.min_lon, b.min_lat, b.max_lon, b.max_lat]),
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(route_props(route)),
        foreign_members: None,
    }
}

/// Wrap a route in a single-feature collection.
pub fn route_to_feature_collection(route: &RouteTrack) -> FeatureCollection {
    let feature = route_to_feature(route);
    FeatureCollection {
        bbox: feature.bbox.clone(),
        features: vec![feature],
        foreign_members: None,
    }
}

fn route_props(route: &RouteTrack) -> Map<String, JsonValue> {
    let stats = route.stats();
    let mut props = Map::new();

    if let Some(name) = route.name() {
        props.insert("name".to_string(), JsonValue::String(name.to_string()));
    }
    insert_number(&mut props, "distanceKm", Some(stats.total_distance_km));
    insert_number(&mut props, "elevationGainM", Some(stats.elevation_gain_m));
    insert_number(&mut props, "minElevationM", stats.min_elevation_m);
    insert_number(&mut props, "maxElevationM", stats.max_elevation_m);
    props.insert(
        "pointCount".to_string(),
        JsonValue::Number(stats.point_count.into()),
    );

    props
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &GeoPoint) -> Vec<f64> {
    match pt.elevation {
        Some(ele) => vec![pt.longitude, pt.latitude, ele],
        None => vec![pt.longitude, pt.latitude],
    }
}

fn insert_number(props: &mut Map<String, JsonValue>, key: &str, value: Option<f64>) {
    if let Some(n) = value.and_then(Number::from_f64) {
        props.insert(key.to_string(), JsonValue::Number(n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_route;

    #[test]
    fn test_track_becomes_line_string() {
        let xml = br#"<gpx><trk><name>Run</name><trkseg>
    <trkpt lat="35.0" lon="139.0"><ele>10.0</ele></trkpt>
    <trkpt lat="35.001" lon="139.001"><ele>11.0</ele></trkpt>
</trkseg></trk></gpx>"#;
        let route = parse_route(xml).unwrap();
        let feature = route_to_feature(&route);

        let geom = feature.geometry.as_ref().unwrap();
        match &geom.value {
            Value::LineString(coords) => {
                assert_eq!(coords.len(), 2);
                // [lon, lat, ele] order
                assert!((coords[0][0] - 139.0).abs() < 1e-10);
                assert!((coords[0][1] - 35.0).abs() < 1e-10);
                assert!((coords[0][2] - 10.0).abs() < 1e-10);
            }
            _ => panic!("Expected LineString"),
        }

        assert_eq!(feature.bbox, Some(vec![139.0, 35.0, 139.001, 35.001]));

        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["name"], "Run");
        assert_eq!(props["pointCount"], 2);
        assert_eq!(props["elevationGainM"], 1.0);
        assert_eq!(props["minElevationM"], 10.0);
        assert!(props["distanceKm"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_single_point_track() {
        let xml = br#"<gpx><trk><trkseg><trkpt lat="35.0" lon="139.0"/></trkseg></trk></gpx>"#;
        let route = parse_route(xml).unwrap();
        let feature = route_to_feature(&route);

        match &feature.geometry.as_ref().unwrap().value {
            Value::Point(coords) => assert_eq!(coords, &vec![139.0, 35.0]),
            _ => panic!("Expected Point geometry for single-point track"),
        }

        let props = feature.properties.as_ref().unwrap();
        assert!(props.get("name").is_none());
        assert!(props.get("minElevationM").is_none());
        assert_eq!(props["distanceKm"], 0.0);
    }

    #[test]
    fn test_feature_collection_shares_bbox() {
        let xml = br#"<gpx><trk><trkseg>
    <trkpt lat="1.0" lon="2.0"/><trkpt lat="3.0" lon="4.0"/>
</trkseg></trk></gpx>"#;
        let route = parse_route(xml).unwrap();
        let fc = route_to_feature_collection(&route);
        assert_eq!(fc.features.len(), 1);
        assert_eq!(fc.bbox, Some(vec![2.0, 1.0, 4.0, 3.0]));
    }
}
