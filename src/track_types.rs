use serde::{Deserialize, Serialize};

use crate::analytics::{bounding_box, route_stats};
use crate::error::ParseError;

/// Largest valid absolute latitude in degrees.
pub const MAX_LATITUDE: f64 = 90.0;

/// Largest valid absolute longitude in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// A single track point. Coordinates are decimal degrees, elevation is meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    /// Finite coordinates within range, and a finite elevation if present.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= MAX_LATITUDE
            && self.longitude.abs() <= MAX_LONGITUDE
            && self.elevation.is_none_or(f64::is_finite)
    }
}

/// Smallest lat/lon rectangle containing every point of a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }
}

/// Summary statistics of a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStats {
    pub total_distance_km: f64,
    pub elevation_gain_m: f64,
    pub min_elevation_m: Option<f64>,
    pub max_elevation_m: Option<f64>,
    pub point_count: usize,
}

/// A parsed route. `bounds` and `stats` are always derived from `points`.
///
/// Deserializing a stored route recomputes both from the stored points, so a
/// tampered or stale `stats` object can never disagree with the geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRoute", rename_all = "camelCase")]
pub struct RouteTrack {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    points: Vec<GeoPoint>,
    bounds: BoundingBox,
    stats: RouteStats,
}

impl RouteTrack {
    /// Build a route from points in track order. Fails with `EmptyTrack` when
    /// there are no points and `MalformedDocument` when any point is invalid.
    pub fn from_points(name: Option<String>, points: Vec<GeoPoint>) -> Result<Self, ParseError> {
        if let Some((i, p)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(ParseError::malformed(format!(
                "track point {i} is invalid (lat {}, lon {}, elevation {:?})",
                p.latitude, p.longitude, p.elevation
            )));
        }
        let bounds = bounding_box(&points).ok_or(ParseError::EmptyTrack)?;
        let stats = route_stats(&points);
        Ok(Self {
            name,
            points,
            bounds,
            stats,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn stats(&self) -> &RouteStats {
        &self.stats
    }
}

/// Wire shape accepted when reading a route back from storage.
#[derive(Deserialize)]
struct StoredRoute {
    #[serde(default)]
    name: Option<String>,
    points: Vec<GeoPoint>,
}

impl TryFrom<StoredRoute> for RouteTrack {
    type Error = ParseError;

    fn try_from(stored: StoredRoute) -> Result<Self, Self::Error> {
        RouteTrack::from_points(stored.name, stored.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_rejects_empty() {
        let err = RouteTrack::from_points(None, Vec::new()).unwrap_err();
        assert!(matches!(err, ParseError::EmptyTrack));
    }

    #[test]
    fn test_from_points_rejects_non_finite_points() {
        let err = RouteTrack::from_points(
            None,
            vec![GeoPoint::new(f64::NAN, 0.0), GeoPoint::new(10.0, 0.0)],
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::MalformedDocument { .. }));

        let err = RouteTrack::from_points(
            None,
            vec![GeoPoint::new(10.0, 0.0).with_elevation(f64::INFINITY)],
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::MalformedDocument { .. }));
    }

    #[test]
    fn test_from_points_rejects_out_of_range_points() {
        let out_of_range = [
            GeoPoint::new(95.0, 0.0),
            GeoPoint::new(0.0, 500.0),
            GeoPoint::new(-90.5, 0.0),
        ];
        for point in out_of_range {
            let result = RouteTrack::from_points(None, vec![GeoPoint::new(0.0, 0.0), point]);
            assert!(
                matches!(result, Err(ParseError::MalformedDocument { .. })),
                "{point:?}"
            );
        }

        let edge = RouteTrack::from_points(
            None,
            vec![GeoPoint::new(-90.0, -180.0), GeoPoint::new(90.0, 180.0)],
        );
        assert!(edge.is_ok());
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_points() {
        let json = r#"{"points": [{"lat": 95.0, "lon": 500.0, "elevation": null}]}"#;
        let err = serde_json::from_str::<RouteTrack>(json).unwrap_err();
        assert!(err.to_string().contains("malformed track document"));
    }

    #[test]
    fn test_point_serializes_with_short_keys() {
        let pt = GeoPoint::new(35.0, 139.0).with_elevation(12.5);
        let json = serde_json::to_value(pt).unwrap();
        assert_eq!(json["lat"], 35.0);
        assert_eq!(json["lon"], 139.0);
        assert_eq!(json["elevation"], 12.5);
    }

    #[test]
    fn test_deserialize_recomputes_stats() {
        let json = r#"{
            "name": "Stored",
            "points": [
                {"lat": 0.0, "lon": 0.0, "elevation": 100.0},
                {"lat": 0.0, "lon": 0.0, "elevation": 130.0}
            ],
            "bounds": {"minLat": 9.0, "maxLat": 9.0, "minLon": 9.0, "maxLon": 9.0},
            "stats": {"totalDistanceKm": 999.0, "elevationGainM": 0.0, "pointCount": 7}
        }"#;
        let route: RouteTrack = serde_json::from_str(json).unwrap();
        assert_eq!(route.name(), Some("Stored"));
        assert_eq!(route.stats().point_count, 2);
        assert_eq!(route.stats().total_distance_km, 0.0);
        assert_eq!(route.stats().elevation_gain_m, 30.0);
        assert_eq!(route.bounds().min_lat, 0.0);
    }

    #[test]
    fn test_deserialize_rejects_empty_points() {
        let json = r#"{"points": []}"#;
        assert!(serde_json::from_str::<RouteTrack>(json).is_err());
    }

    #[test]
    fn test_serialize_then_deserialize_is_identical() {
        let route = RouteTrack::from_points(
            Some("Loop".to_string()),
            vec![
                GeoPoint::new(35.0, 139.0).with_elevation(10.0),
                GeoPoint::new(35.01, 139.02),
            ],
        )
        .unwrap();
        let json = serde_json::to_string(&route).unwrap();
        let back: RouteTrack = serde_json::from_str(&json).unwrap();
        assert_eq!(back, route);
    }
}
