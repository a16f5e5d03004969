//! Draw-tool palette, in-progress drawings and draw events.

use siteplan_shared::geometry::{self, GeometryError};
use siteplan_shared::models::{GeoPoint, ShapeKind};

use crate::error::EditorError;
use crate::store::ShapeId;

/// Toolbar configuration. Survives being detached from the map.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPalette {
    pub tools: Vec<ShapeKind>,
    pub active_tool: Option<ShapeKind>,
    /// Vertex editing / deletion of existing shapes.
    pub edit_enabled: bool,
    attached: bool,
}

impl Default for DrawPalette {
    fn default() -> Self {
        Self {
            tools: ShapeKind::ALL.to_vec(),
            active_tool: Some(ShapeKind::Polygon),
            edit_enabled: false,
            attached: false,
        }
    }
}

impl DrawPalette {
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    pub fn select(&mut self, tool: Option<ShapeKind>) {
        self.active_tool = tool.filter(|t| self.tools.contains(t));
    }
}

/// Events produced by the draw tool.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    Created {
        kind: ShapeKind,
        points: Vec<GeoPoint>,
        radius: Option<f64>,
    },
    Edited {
        shape_id: ShapeId,
        points: Vec<GeoPoint>,
        radius: Option<f64>,
    },
    Deleted {
        shape_id: ShapeId,
    },
}

/// Validated geometry of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnGeometry {
    pub kind: ShapeKind,
    pub ring: Vec<GeoPoint>,
    /// Circle radius in meters.
    pub radius: Option<f64>,
}

impl DrawnGeometry {
    /// Build the stored ring for `kind` from raw tool points.
    ///
    /// Rectangles take two opposite corners (or a full ring), circles take a
    /// center plus either `radius` or a point on the rim.
    pub fn from_points(
        kind: ShapeKind,
        points: &[GeoPoint],
        radius: Option<f64>,
        circle_segments: usize,
    ) -> Result<Self, EditorError> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(GeometryError::NonFinite.into());
        }
        let invalid = |distinct| EditorError::from(GeometryError::InvalidGeometry { distinct });

        let (ring, radius) = match kind {
            ShapeKind::Polygon => (geometry::close_ring(points), None),
            ShapeKind::Rectangle if points.len() == 2 => {
                (geometry::rectangle_ring(points[0], points[1]), None)
            }
            ShapeKind::Rectangle => (geometry::close_ring(points), None),
            ShapeKind::Circle => {
                let center = *points.first().ok_or_else(|| invalid(0))?;
                let r = match (radius, points.get(1)) {
                    (Some(r), _) => r,
                    (None, Some(rim)) => geometry::distance_m(center, *rim),
                    (None, None) => 0.0,
                };
                if !(r.is_finite() && r > 0.0) {
                    return Err(invalid(1));
                }
                (geometry::circle_ring(center, r, circle_segments), Some(r))
            }
            ShapeKind::Polyline => {
                let distinct = geometry::distinct_points(points);
                if distinct < 2 {
                    return Err(invalid(distinct));
                }
                (points.to_vec(), None)
            }
            ShapeKind::Marker => {
                let p = *points.first().ok_or_else(|| invalid(0))?;
                (vec![p], None)
            }
        };

        if kind.is_areal() {
            // Rejects rings with fewer than 3 distinct points
            geometry::area(&ring)?;
        }
        Ok(Self { kind, ring, radius })
    }
}

/// Whether a draft has enough points to finish on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    Incomplete,
    Complete,
}

/// A shape being drawn, point by point.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawDraft {
    kind: ShapeKind,
    points: Vec<GeoPoint>,
}

impl DrawDraft {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            points: Vec::new(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Add a point. Markers, rectangles and circles complete themselves.
    pub fn push(&mut self, p: GeoPoint) -> DraftStatus {
        self.points.push(p);
        let needed = match self.kind {
            ShapeKind::Marker => Some(1),
            ShapeKind::Rectangle | ShapeKind::Circle => Some(2),
            ShapeKind::Polygon | ShapeKind::Polyline => None,
        };
        match needed {
            Some(n) if self.points.len() >= n => DraftStatus::Complete,
            _ => DraftStatus::Incomplete,
        }
    }

    pub fn undo_last(&mut self) -> Option<GeoPoint> {
        self.points.pop()
    }

    /// Validate the draft. On error the draft is left intact so drawing can continue.
    pub fn finish(&self, circle_segments: usize) -> Result<DrawnGeometry, EditorError> {
        DrawnGeometry::from_points(self.kind, &self.points, None, circle_segments)
    }
}
