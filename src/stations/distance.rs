use haversine::{distance, Location, Units};
use std::f64::consts::PI;

/// Mean Earth radius used by [`haversine::Units::Kilometers`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two points given in degrees.
///
/// Inputs are not validated. The arguments are put in a canonical order before the
/// haversine evaluation, so swapping the two points yields a bit-identical result.
///
/// ```
/// let d = ghcn_climate::distance_km(40.7128, -74.0060, 34.0522, -118.2437);
/// assert!((d - 3935.0).abs() < 5.0);
/// ```
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (a, b) = if (lat1, lon1) < (lat2, lon2) {
        ((lat2, lon2), (lat1, lon1))
    } else {
        ((lat1, lon1), (lat2, lon2))
    };
    let km = distance(
        Location {
            latitude: a.0,
            longitude: a.1,
        },
        Location {
            latitude: b.0,
            longitude: b.1,
        },
        Units::Kilometers,
    );
    // Near antipodal points rounding pushes the haversine term past 1 and the
    // crate returns NaN. The true distance there is half the circumference.
    if km.is_nan() {
        PI * EARTH_RADIUS_KM
    } else {
        km
    }
}

/// The point on the opposite side of the globe, longitude kept in [-180, 180].
#[cfg(test)]
pub(crate) fn antipode(lat: f64, lon: f64) -> (f64, f64) {
    let lon = if lon > 0.0 { lon - 180.0 } else { lon + 180.0 };
    (-lat, lon)
}
