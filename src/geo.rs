//! Geodesy and coordinate-key formatting (C1).

/// Earth radius in kilometers, matching the spec's `distanceKm` contract.
const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance between two points given in degrees, in kilometers.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Converts nautical miles to kilometers.
pub fn nm_to_km(nm: f64) -> f64 {
    nm * 1.852
}

/// Rounds to six decimal places, half-up, matching the "same location"
/// semantic unit used by every dedup key in the data model (~11cm).
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Formats a coordinate key as `"{lat:.6},{lon:.6},{indicative}"`.
///
/// `indicative = None` is rendered as an empty string, matching the
/// original `coordKey` contract (C1.c).
pub fn coord_key(lat: f64, lon: f64, indicative: Option<&str>) -> String {
    format!(
        "{:.6},{:.6},{}",
        round6(lat),
        round6(lon),
        indicative.unwrap_or("")
    )
}

/// Prefixes a coordinate key with an integer timestamp (C1.d).
pub fn timestamp_coord_key(ts: i64, lat: f64, lon: f64, indicative: Option<&str>) -> String {
    format!("{}:{}", ts, coord_key(lat, lon, indicative))
}

/// Converts a radian-domain error (or RMSE) into metres by multiplying by
/// Earth's radius. Trajectory accuracy (C11) accumulates horizontal error in
/// radians² for backward compatibility with existing numeric outputs and
/// only converts to metres at the report layer; this is that conversion.
pub fn radians_to_meters(value_in_radians: f64) -> f64 {
    value_in_radians * EARTH_RADIUS_KM * 1000.0
}
