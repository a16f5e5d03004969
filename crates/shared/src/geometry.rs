//! Geodesic area and ring construction helpers.
//!
//! Areas are computed on the WGS84 ellipsoid (Karney's algorithm, via `geo`),
//! never with a planar shoelace over degrees.

use geo::{GeodesicArea, LineString, Polygon};
use thiserror::Error;

use crate::models::GeoPoint;

/// Mean earth radius in meters, used for ring construction (not for area).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Default number of segments used to approximate a circle ring.
pub const CIRCLE_SEGMENTS: usize = 64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A ring needs at least three distinct points to enclose an area.
    #[error("Invalid geometry: ring has {distinct} distinct points, at least 3 required")]
    InvalidGeometry { distinct: usize },

    #[error("Invalid geometry: coordinates must be finite")]
    NonFinite,
}

/// Number of distinct points in `points` (exact comparison).
pub fn distinct_points(points: &[GeoPoint]) -> usize {
    let mut seen: Vec<GeoPoint> = Vec::with_capacity(points.len());
    for p in points {
        if !seen.contains(p) {
            seen.push(*p);
        }
    }
    seen.len()
}

/// Return `points` closed: the first point is repeated at the end unless already there.
pub fn close_ring(points: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut ring = points.to_vec();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        if first != last {
            ring.push(*first);
        }
    }
    ring
}

/// Geodesic area in square meters of the surface enclosed by `ring`.
///
/// The ring need not be explicitly closed. Orientation does not matter.
pub fn area(ring: &[GeoPoint]) -> Result<f64, GeometryError> {
    if ring.iter().any(|p| !p.is_finite()) {
        return Err(GeometryError::NonFinite);
    }
    let distinct = distinct_points(ring);
    if distinct < 3 {
        return Err(GeometryError::InvalidGeometry { distinct });
    }

    let exterior: LineString<f64> = close_ring(ring)
        .iter()
        .map(|p| (p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into();
    // Signed area lies in (-E/2, E/2] for ellipsoid area E, so its magnitude is
    // winding independent for any ring smaller than a hemisphere.
    let polygon = Polygon::new(exterior, vec![]);
    Ok(polygon.geodesic_area_signed().abs())
}

/// Round an area to the two-decimal precision used in exports.
pub fn round_area(square_meters: f64) -> f64 {
    (square_meters * 100.0).round() / 100.0
}

/// Great-circle distance in meters (haversine on the mean sphere).
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Point reached from `origin` travelling `distance_m` along `bearing_deg`
/// (clockwise from north) on a sphere.
pub fn destination(origin: GeoPoint, bearing_deg: f64, distance_m: f64) -> GeoPoint {
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();
    let brg = bearing_deg.to_radians();
    let d = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * d.cos() + lat1.cos() * d.sin() * brg.cos()).asin();
    let lon2 = lon1 + (brg.sin() * d.sin() * lat1.cos()).atan2(d.cos() - lat1.sin() * lat2.sin());

    // Normalize longitude to [-180, 180)
    let lon2 = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;
    GeoPoint::new(lat2.to_degrees(), lon2)
}

/// Closed ring approximating a circle of `radius_m` around `center`.
pub fn circle_ring(center: GeoPoint, radius_m: f64, segments: usize) -> Vec<GeoPoint> {
    let segments = segments.max(8);
    let points: Vec<GeoPoint> = (0..segments)
        .map(|i| {
            let bearing = 360.0 * i as f64 / segments as f64;
            destination(center, bearing, radius_m)
        })
        .collect();
    close_ring(&points)
}

/// Closed 4-corner ring spanning two opposite corners.
pub fn rectangle_ring(a: GeoPoint, b: GeoPoint) -> Vec<GeoPoint> {
    let (south, north) = (a.latitude.min(b.latitude), a.latitude.max(b.latitude));
    let (west, east) = (a.longitude.min(b.longitude), a.longitude.max(b.longitude));
    close_ring(&[
        GeoPoint::new(south, west),
        GeoPoint::new(north, west),
        GeoPoint::new(north, east),
        GeoPoint::new(south, east),
    ])
}

/// Arithmetic mean of the distinct vertices (closing duplicate ignored).
pub fn centroid(ring: &[GeoPoint]) -> Option<GeoPoint> {
    let open = match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    };
    if open.is_empty() {
        return None;
    }
    let n = open.len() as f64;
    let lat = open.iter().map(|p| p.latitude).sum::<f64>() / n;
    let lon = open.iter().map(|p| p.longitude).sum::<f64>() / n;
    Some(GeoPoint::new(lat, lon))
}
