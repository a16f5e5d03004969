use siteplan_shared::models::{GeoPoint, ShapeKind};

/// Side length, in CSS pixels, of the overlay image before its projective
/// transform. The homography is pre-scaled by `1 / OVERLAY_BASE_PX`.
pub const OVERLAY_BASE_PX: f64 = 1000.0;

/// Convert client (viewport) coordinates to container-relative pixel coordinates.
pub fn client_to_container(
    client_x: f64,
    client_y: f64,
    rect_left: f64,
    rect_top: f64,
) -> (f64, f64) {
    (client_x - rect_left, client_y - rect_top)
}

/// Bounding rect of the element with `container_id`.
pub fn container_rect(container_id: &str) -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(container_id)?;
    Some(element.get_bounding_client_rect())
}

/// Projective map from the unit square onto `quad`, with (0,0), (1,0), (1,1), (0,1)
/// landing on `quad[0..4]`. Returns `[a, b, c, d, e, f, g, h]` such that
/// `x = (a*u + b*v + c) / (g*u + h*v + 1)` and `y = (d*u + e*v + f) / (g*u + h*v + 1)`.
pub fn square_to_quad(quad: [(f64, f64); 4]) -> Option<[f64; 8]> {
    let [(x0, y0), (x1, y1), (x2, y2), (x3, y3)] = quad;
    let sx = x0 - x1 + x2 - x3;
    let sy = y0 - y1 + y2 - y3;

    if sx.abs() < 1e-9 && sy.abs() < 1e-9 {
        // Parallelogram
        return Some([x1 - x0, x3 - x0, x0, y1 - y0, y3 - y0, y0, 0.0, 0.0]);
    }

    let dx1 = x1 - x2;
    let dx2 = x3 - x2;
    let dy1 = y1 - y2;
    let dy2 = y3 - y2;
    let den = dx1 * dy2 - dx2 * dy1;
    if den.abs() < 1e-12 {
        return None;
    }
    let g = (sx * dy2 - dx2 * sy) / den;
    let h = (dx1 * sy - sx * dy1) / den;
    Some([
        x1 - x0 + g * x1,
        x3 - x0 + h * x3,
        x0,
        y1 - y0 + g * y1,
        y3 - y0 + h * y3,
        y0,
        g,
        h,
    ])
}

#[cfg(test)]
fn apply_homography(m: &[f64; 8], u: f64, v: f64) -> (f64, f64) {
    let w = m[6] * u + m[7] * v + 1.0;
    ((m[0] * u + m[1] * v + m[2]) / w, (m[3] * u + m[4] * v + m[5]) / w)
}

/// CSS `matrix3d(...)` placing an `OVERLAY_BASE_PX` square element onto the
/// screen-space corners (NW, NE, SE, SW) of the overlay.
pub fn overlay_matrix3d(corners: [(f64, f64); 4]) -> Option<String> {
    let [a, b, c, d, e, f, g, h] = square_to_quad(corners)?;
    let s = OVERLAY_BASE_PX;
    // Column-major 4x4 with z passed through
    Some(format!(
        "matrix3d({}, {}, 0, {}, {}, {}, 0, {}, 0, 0, 1, 0, {}, {}, 0, 1)",
        a / s,
        d / s,
        g / s,
        b / s,
        e / s,
        h / s,
        c,
        f
    ))
}

/// SVG path data for a screen-space ring.
pub fn ring_path(points: &[(f64, f64)], closed: bool) -> String {
    let mut d = String::with_capacity(points.len() * 24);
    for (i, (x, y)) in points.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        d.push_str(&format!("{cmd}{x:.1} {y:.1} "));
    }
    if closed && !points.is_empty() {
        d.push('Z');
    }
    d.trim_end().to_string()
}

/// Even-odd point-in-polygon test.
pub fn point_in_polygon(p: (f64, f64), polygon: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > p.1) != (yj > p.1) && p.0 < (xj - xi) * (p.1 - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Euclidean distance between two points.
pub fn point_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return point_distance(p, a);
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len2).clamp(0.0, 1.0);
    point_distance(p, (a.0 + t * dx, a.1 + t * dy))
}

/// Whether a click at `p` lands on a shape drawn as `ring` (screen space).
pub fn hits_shape(kind: ShapeKind, ring: &[(f64, f64)], p: (f64, f64), tolerance: f64) -> bool {
    match kind {
        ShapeKind::Marker => ring.first().is_some_and(|&m| point_distance(m, p) <= tolerance),
        ShapeKind::Polyline => ring
            .windows(2)
            .any(|w| distance_to_segment(p, w[0], w[1]) <= tolerance),
        ShapeKind::Polygon | ShapeKind::Rectangle | ShapeKind::Circle => {
            point_in_polygon(p, ring)
                || ring
                    .windows(2)
                    .any(|w| distance_to_segment(p, w[0], w[1]) <= tolerance)
        }
    }
}

/// Find the index of the nearest position within `threshold` (Euclidean distance).
pub fn find_nearest(positions: &[(f64, f64)], click: (f64, f64), threshold: f64) -> Option<usize> {
    let mut best_idx = None;
    let mut best_dist = threshold;
    for (i, pos) in positions.iter().enumerate() {
        let dist = point_distance(*pos, click);
        if dist < best_dist {
            best_dist = dist;
            best_idx = Some(i);
        }
    }
    best_idx
}

/// Format a point for the coordinate readout.
pub fn format_geo(p: GeoPoint) -> String {
    let ns = if p.latitude >= 0.0 { 'N' } else { 'S' };
    let ew = if p.longitude >= 0.0 { 'E' } else { 'W' };
    format!("{:.5}°{ns} {:.5}°{ew}", p.latitude.abs(), p.longitude.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-6 && (a.1 - b.1).abs() < 1e-6
    }

    #[test]
    fn test_client_to_container() {
        assert_eq!(client_to_container(150.0, 90.0, 100.0, 40.0), (50.0, 50.0));
    }

    #[test]
    fn test_square_to_quad_parallelogram() {
        let quad = [(10.0, 10.0), (110.0, 20.0), (120.0, 120.0), (20.0, 110.0)];
        let m = square_to_quad(quad).unwrap();
        assert_eq!(m[6], 0.0);
        assert_eq!(m[7], 0.0);
        for (uv, expected) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .into_iter()
            .zip(quad)
        {
            assert!(close(apply_homography(&m, uv.0, uv.1), expected));
        }
    }

    #[test]
    fn test_square_to_quad_distorted_hits_all_corners() {
        let quad = [(0.0, 0.0), (200.0, 30.0), (170.0, 160.0), (-20.0, 120.0)];
        let m = square_to_quad(quad).unwrap();
        assert!(close(apply_homography(&m, 0.0, 0.0), quad[0]));
        assert!(close(apply_homography(&m, 1.0, 0.0), quad[1]));
        assert!(close(apply_homography(&m, 1.0, 1.0), quad[2]));
        assert!(close(apply_homography(&m, 0.0, 1.0), quad[3]));
    }

    #[test]
    fn test_square_to_quad_degenerate() {
        let quad = [(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (5.0, 5.0)];
        assert!(square_to_quad(quad).is_none());
    }

    #[test]
    fn test_overlay_matrix3d_axis_aligned() {
        let css = overlay_matrix3d([(0.0, 0.0), (500.0, 0.0), (500.0, 250.0), (0.0, 250.0)]).unwrap();
        assert_eq!(
            css,
            "matrix3d(0.5, 0, 0, 0, 0, 0.25, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1)"
        );
    }

    #[test]
    fn test_ring_path() {
        assert_eq!(
            ring_path(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.5)], true),
            "M0.0 0.0 L10.0 0.0 L10.0 5.5 Z"
        );
        assert_eq!(ring_path(&[(1.0, 2.0), (3.0, 4.0)], false), "M1.0 2.0 L3.0 4.0");
        assert_eq!(ring_path(&[], true), "");
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];
        assert!(point_in_polygon((5.0, 5.0), &square));
        assert!(!point_in_polygon((15.0, 5.0), &square));
        assert!(!point_in_polygon((5.0, 5.0), &square[..2]));
    }

    #[test]
    fn test_hits_shape_by_kind() {
        let line = [(0.0, 0.0), (100.0, 0.0)];
        assert!(hits_shape(ShapeKind::Polyline, &line, (50.0, 3.0), 5.0));
        assert!(!hits_shape(ShapeKind::Polyline, &line, (50.0, 30.0), 5.0));

        assert!(hits_shape(ShapeKind::Marker, &[(20.0, 20.0)], (24.0, 20.0), 6.0));
        assert!(!hits_shape(ShapeKind::Marker, &[(20.0, 20.0)], (40.0, 20.0), 6.0));

        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];
        assert!(hits_shape(ShapeKind::Rectangle, &square, (5.0, 5.0), 2.0));
        assert!(hits_shape(ShapeKind::Polygon, &square, (11.0, 5.0), 2.0));
        assert!(!hits_shape(ShapeKind::Polygon, &square, (20.0, 5.0), 2.0));
    }

    #[test]
    fn test_find_nearest_picks_closest_within_threshold() {
        let positions = [(100.0, 100.0), (110.0, 110.0)];
        assert_eq!(find_nearest(&positions, (108.0, 108.0), 30.0), Some(1));
        assert_eq!(find_nearest(&positions, (300.0, 300.0), 30.0), None);
    }

    #[test]
    fn test_format_geo() {
        assert_eq!(
            format_geo(GeoPoint::new(51.5072, -0.1276)),
            "51.50720°N 0.12760°W"
        );
        assert_eq!(format_geo(GeoPoint::new(-33.9, 18.4)), "33.90000°S 18.40000°E");
    }
}
