//! GeoJSON point handling for `$near` evaluation.

use serde_json::Value;

/// Mean earth radius in meters, spherical approximation.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Extract `(longitude, latitude)` from a GeoJSON Point value.
///
/// Returns `None` for anything that is not a well-formed 2D point with
/// coordinates in range.
pub fn extract_point(value: &Value) -> Option<(f64, f64)> {
    if value.get("type").and_then(Value::as_str) != Some("Point") {
        return None;
    }
    let coordinates = value.get("coordinates")?.as_array()?;
    if coordinates.len() != 2 {
        return None;
    }
    let lon = coordinates[0].as_f64()?;
    let lat = coordinates[1].as_f64()?;
    if !lon.is_finite() || !lat.is_finite() {
        return None;
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return None;
    }
    Some((lon, lat))
}

/// Haversine distance between two points in meters.
///
/// Accuracy is ~0.3% for practical distances, which is well inside what a
/// radius predicate needs.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);

    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_point_accepts_well_formed_points() {
        assert_eq!(
            extract_point(&json!({"type": "Point", "coordinates": [2.3522, 48.8566]})),
            Some((2.3522, 48.8566))
        );
        assert_eq!(
            extract_point(&json!({"type": "Point", "coordinates": [-180, -90]})),
            Some((-180.0, -90.0))
        );
    }

    #[test]
    fn extract_point_rejects_malformed_values() {
        assert_eq!(extract_point(&json!({"type": "Polygon", "coordinates": [0, 0]})), None);
        assert_eq!(extract_point(&json!({"coordinates": [0, 0]})), None);
        assert_eq!(extract_point(&json!({"type": "Point", "coordinates": [0]})), None);
        assert_eq!(extract_point(&json!({"type": "Point", "coordinates": [181, 0]})), None);
        assert_eq!(extract_point(&json!({"type": "Point", "coordinates": [0, 91]})), None);
        assert_eq!(extract_point(&json!("POINT(0 0)")), None);
    }

    #[test]
    fn haversine_known_distances() {
        // Same point
        assert!(haversine_distance(0.0, 0.0, 0.0, 0.0).abs() < 0.001);

        // One degree of longitude on the equator, ~111 km
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 500.0);

        // Paris to London, ~343 km
        let d = haversine_distance(2.3522, 48.8566, -0.1278, 51.5074);
        assert!((d - 343_500.0).abs() < 5_000.0);
    }
}
