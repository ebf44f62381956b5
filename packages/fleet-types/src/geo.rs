//! Spherical-Earth geodesy primitives (C1): distance, bearing, forward
//! position and great-circle interpolation.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres, matching the AIS-domain convention used
/// throughout the rest of this crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point on the sphere, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    fn lat_rad(&self) -> f64 {
        self.lat.to_radians()
    }

    fn lon_rad(&self) -> f64 {
        self.lon.to_radians()
    }
}

/// Normalise longitude into `(-180, 180]`, performed exactly once per
/// operation that produces a new coordinate.
pub fn normalize_lon(lon: f64) -> f64 {
    let mut l = lon;
    while l <= -180.0 {
        l += 360.0;
    }
    while l > 180.0 {
        l -= 360.0;
    }
    l
}

/// Great-circle distance between two points, in metres (haversine formula).
///
/// Co-located points return exactly `0.0`; the formula is numerically safe
/// at the poles and antipodes (no NaN).
pub fn distance(a: LatLon, b: LatLon) -> f64 {
    let (lat1, lat2) = (a.lat_rad(), b.lat_rad());
    let dlat = lat2 - lat1;
    let dlon = b.lon_rad() - a.lon_rad();

    let sin_dlat_2 = (dlat / 2.0).sin();
    let sin_dlon_2 = (dlon / 2.0).sin();
    let h = sin_dlat_2 * sin_dlat_2 + lat1.cos() * lat2.cos() * sin_dlon_2 * sin_dlon_2;
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` to `b`, degrees in `[0, 360)`.
///
/// Co-located points return `0.0` rather than an undefined direction.
pub fn bearing(a: LatLon, b: LatLon) -> f64 {
    if (a.lat - b.lat).abs() < 1e-12 && (a.lon - b.lon).abs() < 1e-12 {
        return 0.0;
    }
    let (lat1, lat2) = (a.lat_rad(), b.lat_rad());
    let dlon = b.lon_rad() - a.lon_rad();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let theta = y.atan2(x).to_degrees();
    (theta + 360.0) % 360.0
}

/// Forward position: start at `p`, travel `distance_m` along initial
/// `course_deg`, return the resulting point.
///
/// `forward(p, course, 0.0) == p`.
pub fn forward(p: LatLon, course_deg: f64, distance_m: f64) -> LatLon {
    if distance_m == 0.0 {
        return p;
    }
    let angular_distance = distance_m / EARTH_RADIUS_M;
    let course = course_deg.to_radians();
    let lat1 = p.lat_rad();
    let lon1 = p.lon_rad();

    let sin_lat2 = lat1.sin() * angular_distance.cos()
        + lat1.cos() * angular_distance.sin() * course.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = course.sin() * angular_distance.sin() * lat1.cos();
    let x = angular_distance.cos() - lat1.sin() * lat2.sin();
    let lon2 = lon1 + y.atan2(x);

    LatLon::new(lat2.to_degrees(), normalize_lon(lon2.to_degrees()))
}

/// Point a fraction `f` of the way along the great-circle arc from `p1` to
/// `p2` (spherical linear interpolation). `f=0` returns `p1`, `f=1` returns
/// `p2` exactly.
pub fn intermediate(p1: LatLon, p2: LatLon, f: f64) -> LatLon {
    if f <= 0.0 {
        return p1;
    }
    if f >= 1.0 {
        return p2;
    }

    let d = distance(p1, p2) / EARTH_RADIUS_M;
    if d.abs() < 1e-15 {
        return p1;
    }

    let (lat1, lon1) = (p1.lat_rad(), p1.lon_rad());
    let (lat2, lon2) = (p2.lat_rad(), p2.lon_rad());

    let a = ((1.0 - f) * d).sin() / d.sin();
    let b = (f * d).sin() / d.sin();

    let x = a * lat1.cos() * lon1.cos() + b * lat2.cos() * lon2.cos();
    let y = a * lat1.cos() * lon1.sin() + b * lat2.cos() * lon2.sin();
    let z = a * lat1.sin() + b * lat2.sin();

    let lat = z.atan2((x * x + y * y).sqrt());
    let lon = y.atan2(x);

    LatLon::new(lat.to_degrees(), normalize_lon(lon.to_degrees()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn haversine_fixture() {
        let seoul = LatLon::new(35.1796, 129.0756);
        let la = LatLon::new(33.7175, -118.2699);
        let d = distance(seoul, la);
        assert!(close(d, 9_607_000.0, 5_000.0), "distance was {d}");
        let b = bearing(seoul, la);
        assert!(close(b, 56.0, 2.0), "bearing was {b}");
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = LatLon::new(12.3, 45.6);
        assert_eq!(distance(p, p), 0.0);
    }

    #[test]
    fn bearing_symmetry() {
        let a = LatLon::new(10.0, 20.0);
        let b = LatLon::new(40.0, -30.0);
        let fwd = bearing(a, b);
        let back = bearing(b, a);
        let diff = (fwd - ((back + 180.0) % 360.0)).abs();
        assert!(diff <= 1e-6 || (diff - 360.0).abs() <= 1e-6);
    }

    #[test]
    fn forward_zero_distance_is_identity() {
        let p = LatLon::new(25.0, 55.0);
        let q = forward(p, 123.0, 0.0);
        assert_eq!(p, q);
    }

    #[test]
    fn forward_then_distance_round_trips() {
        let p = LatLon::new(25.0, 55.0);
        let q = forward(p, 45.0, 50_000.0);
        let d = distance(p, q);
        assert!(close(d, 50_000.0, 50.0), "round-trip distance was {d}");
    }

    #[test]
    fn intermediate_endpoints() {
        let a = LatLon::new(10.0, 10.0);
        let b = LatLon::new(20.0, 30.0);
        let mid0 = intermediate(a, b, 0.0);
        let mid1 = intermediate(a, b, 1.0);
        assert_eq!(mid0, a);
        assert_eq!(mid1, b);
    }

    #[test]
    fn antipodal_distance_has_no_nan() {
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(0.0, 180.0);
        let d = distance(a, b);
        assert!(!d.is_nan());
        assert!(close(d, std::f64::consts::PI * EARTH_RADIUS_M, 1.0));
    }

    #[test]
    fn longitude_wraps_across_antimeridian() {
        let p = LatLon::new(0.0, 179.5);
        let q = forward(p, 90.0, 200_000.0);
        assert!(q.lon > -180.0 && q.lon <= 180.0);
        assert!(q.lon < 0.0, "expected wrap past the antimeridian, got {}", q.lon);
    }
}
