use crate::track_types::{BoundingBox, GeoPoint, RouteStats};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers (Haversine).
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    // Rounding can push near-antipodal pairs just past 1.
    let h = h.min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Coordinate-wise min/max over all points. `None` for an empty slice.
pub fn bounding_box(points: &[GeoPoint]) -> Option<BoundingBox> {
    let (first, rest) = points.split_first()?;
    let init = BoundingBox {
        min_lat: first.latitude,
        max_lat: first.latitude,
        min_lon: first.longitude,
        max_lon: first.longitude,
    };

    Some(rest.iter().fold(init, |b, p| BoundingBox {
        min_lat: b.min_lat.min(p.latitude),
        max_lat: b.max_lat.max(p.latitude),
        min_lon: b.min_lon.min(p.longitude),
        max_lon: b.max_lon.max(p.longitude),
    }))
}

/// Distance, elevation gain and elevation range of a route.
///
/// Elevation is only considered for consecutive pairs where both points carry
/// one; such a pair contributes its climb to the gain and both elevations to
/// the min/max range.
pub fn route_stats(points: &[GeoPoint]) -> RouteStats {
    let mut total_distance_km = 0.0;
    let mut elevation_gain_m = 0.0;
    let mut min_elevation_m: Option<f64> = None;
    let mut max_elevation_m: Option<f64> = None;

    for pair in points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        total_distance_km += haversine_km(prev, curr);

        if let (Some(prev_ele), Some(curr_ele)) = (prev.elevation, curr.elevation) {
            elevation_gain_m += (curr_ele - prev_ele).max(0.0);
            let (lo, hi) = (prev_ele.min(curr_ele), prev_ele.max(curr_ele));
            min_elevation_m = Some(min_elevation_m.map_or(lo, |m| m.min(lo)));
            max_elevation_m = Some(max_elevation_m.map_or(hi, |m| m.max(hi)));
        }
    }

    RouteStats {
        total_distance_km,
        elevation_gain_m,
        min_elevation_m,
        max_elevation_m,
        point_count: points.len(),
    }
}
