/// Web-mercator viewport math.
///
/// World pixel space at zoom `z` is a square of `TILE_SIZE * 2^z` pixels,
/// x growing east from the antimeridian and y growing south from the
/// top latitude limit. Fractional zoom levels are allowed.
use serde::{Deserialize, Serialize};

use crate::models::GeoPoint;

pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 20.0;

/// Side of the world square in pixels at `zoom`.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project a geographic point to world pixels at `zoom`.
pub fn project(p: GeoPoint, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = p.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (p.longitude + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * size;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: f64) -> GeoPoint {
    let size = world_size(zoom);
    let lon = x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y / size);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint::new(lat, lon)
}

/// Ground resolution in meters per pixel at `latitude` and `zoom`.
pub fn meters_per_pixel(latitude: f64, zoom: f64) -> f64 {
    let equator = 2.0 * std::f64::consts::PI * crate::geometry::EARTH_RADIUS_M;
    equator * latitude.to_radians().cos() / world_size(zoom)
}

/// Axis-aligned geographic rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl BoundingBox {
    /// Bounding box spanning two opposite corners, in any order.
    pub fn from_corners(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            south_west: GeoPoint::new(a.latitude.min(b.latitude), a.longitude.min(b.longitude)),
            north_east: GeoPoint::new(a.latitude.max(b.latitude), a.longitude.max(b.longitude)),
        }
    }

    /// Smallest box containing all `points`.
    pub fn enclosing(points: &[GeoPoint]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().skip(1).fold(
            Self::from_corners(first, first),
            |bb, p| Self {
                south_west: GeoPoint::new(
                    bb.south_west.latitude.min(p.latitude),
                    bb.south_west.longitude.min(p.longitude),
                ),
                north_east: GeoPoint::new(
                    bb.north_east.latitude.max(p.latitude),
                    bb.north_east.longitude.max(p.longitude),
                ),
            },
        ))
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.south_west.latitude + self.north_east.latitude) / 2.0,
            (self.south_west.longitude + self.north_east.longitude) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.north_east.latitude - self.south_west.latitude
    }

    pub fn lon_span(&self) -> f64 {
        self.north_east.longitude - self.south_west.longitude
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.latitude >= self.south_west.latitude
            && p.latitude <= self.north_east.latitude
            && p.longitude >= self.south_west.longitude
            && p.longitude <= self.north_east.longitude
    }

    /// Corners clockwise from north-west: NW, NE, SE, SW.
    pub fn corners(&self) -> [GeoPoint; 4] {
        let (s, w) = (self.south_west.latitude, self.south_west.longitude);
        let (n, e) = (self.north_east.latitude, self.north_east.longitude);
        [
            GeoPoint::new(n, w),
            GeoPoint::new(n, e),
            GeoPoint::new(s, e),
            GeoPoint::new(s, w),
        ]
    }
}

/// Box centered on `center` that covers `span_px` x `span_px * aspect` screen
/// pixels at `zoom`. Its geographic size halves with every zoom level, so it
/// renders at the same legible size whatever zoom the map is at.
pub fn centered_bounds(center: GeoPoint, zoom: f64, span_px: f64, aspect: f64) -> BoundingBox {
    let (cx, cy) = project(center, zoom);
    let half_w = span_px / 2.0;
    let half_h = span_px * aspect / 2.0;
    let nw = unproject(cx - half_w, cy - half_h, zoom);
    let se = unproject(cx + half_w, cy + half_h, zoom);
    BoundingBox::from_corners(nw, se)
}

/// One raster tile placed on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub x: i64,
    pub y: i64,
    pub z: u8,
    pub screen_x: f64,
    pub screen_y: f64,
    pub size: f64,
}

/// A map view: a center and zoom rendered into a `width` x `height` pixel box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(center: GeoPoint, zoom: f64, width: f64, height: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// World-pixel position of the top-left screen corner.
    fn origin(&self) -> (f64, f64) {
        let (cx, cy) = project(self.center, self.zoom);
        (cx - self.width / 2.0, cy - self.height / 2.0)
    }

    /// Convert container-relative screen pixels to a geographic point.
    pub fn screen_to_geo(&self, sx: f64, sy: f64) -> GeoPoint {
        let (ox, oy) = self.origin();
        unproject(ox + sx, oy + sy, self.zoom)
    }

    /// Convert a geographic point to container-relative screen pixels.
    pub fn geo_to_screen(&self, p: GeoPoint) -> (f64, f64) {
        let (ox, oy) = self.origin();
        let (x, y) = project(p, self.zoom);
        (x - ox, y - oy)
    }

    /// Geographic bounds currently visible.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_corners(
            self.screen_to_geo(0.0, 0.0),
            self.screen_to_geo(self.width, self.height),
        )
    }

    /// Move the view so content shifts by `(dx, dy)` screen pixels.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = project(self.center, self.zoom);
        let size = world_size(self.zoom);
        let ny = (cy - dy).clamp(0.0, size);
        self.center = unproject(cx - dx, ny, self.zoom);
        self.center.longitude = (self.center.longitude + 540.0) % 360.0 - 180.0;
    }

    /// Zoom to `new_zoom` keeping the content under screen point `(sx, sy)` fixed.
    pub fn zoom_at(&mut self, sx: f64, sy: f64, new_zoom: f64) {
        let new_zoom = new_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let anchor = self.screen_to_geo(sx, sy);
        self.zoom = new_zoom;
        let (ax, ay) = project(anchor, new_zoom);
        let cx = ax - sx + self.width / 2.0;
        let cy = ay - sy + self.height / 2.0;
        self.center = unproject(cx, cy, new_zoom);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    /// Tiles covering the view at the integer zoom nearest `self.zoom`.
    pub fn tiles(&self) -> Vec<TilePlacement> {
        let z = self.zoom.round().clamp(0.0, MAX_ZOOM) as u8;
        let scale = 2f64.powf(self.zoom - z as f64);
        let size = TILE_SIZE * scale;
        let (ox, oy) = self.origin();
        let count = 1i64 << z;

        let first_x = (ox / size).floor() as i64;
        let first_y = (oy / size).floor().max(0.0) as i64;
        let last_x = ((ox + self.width) / size).floor() as i64;
        let last_y = (((oy + self.height) / size).floor() as i64).min(count - 1);

        let mut tiles = Vec::new();
        for ty in first_y..=last_y {
            for tx in first_x..=last_x {
                tiles.push(TilePlacement {
                    x: tx.rem_euclid(count),
                    y: ty,
                    z,
                    screen_x: tx as f64 * size - ox,
                    screen_y: ty as f64 * size - oy,
                    size,
                });
            }
        }
        tiles
    }
}
