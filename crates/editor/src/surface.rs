//! The map surface the editor draws on.
//!
//! Rendering and projection belong to the implementation; the editor only
//! tells it which layers exist, where they are, and which controls are live.

use siteplan_shared::models::{GeoPoint, ShapeKind};

use crate::draw::DrawPalette;
use crate::error::SurfaceError;
use crate::store::ShapeId;
use crate::style::ShapeStyle;

/// Optional plugin capabilities, known once the surface has finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Image overlays can be dragged, scaled, rotated and distorted.
    pub distortable_overlay: bool,
    /// Vector draw/edit controls are available.
    pub draw_tools: bool,
}

impl Capabilities {
    pub const fn full() -> Self {
        Self {
            distortable_overlay: true,
            draw_tools: true,
        }
    }

    /// Read-only map: static images, no drawing.
    pub const fn none() -> Self {
        Self {
            distortable_overlay: false,
            draw_tools: false,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !(self.distortable_overlay && self.draw_tools)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    /// Annotate mode: dragging pans the map, the image is inert.
    Pan,
}

impl Cursor {
    pub fn css(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Pan => "grab",
        }
    }
}

/// How the overlay image should be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    pub url: String,
    /// NW, NE, SE, SW.
    pub corners: [GeoPoint; 4],
    pub opacity: f64,
    /// Show transform handles and accept drags.
    pub editable: bool,
    /// Highlight as the selected layer.
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeLayer {
    pub shape_id: ShapeId,
    pub kind: ShapeKind,
    pub ring: Vec<GeoPoint>,
    pub style: ShapeStyle,
}

/// Info popup anchored on a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub shape_id: ShapeId,
    pub anchor: GeoPoint,
    pub title: String,
    pub lines: Vec<String>,
}

pub trait MapSurface {
    /// Current center and zoom.
    fn view(&self) -> (GeoPoint, f64);
    fn set_view(&mut self, center: GeoPoint, zoom: f64);
    /// Recompute layout after the container changed size.
    fn invalidate_size(&mut self, width: f64, height: f64);

    fn add_overlay(&mut self, layer: OverlayLayer) -> LayerId;
    fn update_overlay(&mut self, id: LayerId, layer: OverlayLayer) -> Result<(), SurfaceError>;

    fn add_shape(&mut self, layer: ShapeLayer) -> LayerId;
    fn update_shape(&mut self, id: LayerId, layer: ShapeLayer) -> Result<(), SurfaceError>;

    fn remove_layer(&mut self, id: LayerId) -> Result<(), SurfaceError>;

    /// Show the draw toolbar configured as `palette`.
    fn attach_draw_controls(&mut self, palette: &DrawPalette);
    /// Hide the draw toolbar. Its configuration is kept by the caller.
    fn detach_draw_controls(&mut self);

    fn set_cursor(&mut self, cursor: Cursor);

    fn open_popup(&mut self, popup: Popup);
    fn close_popup(&mut self);

    /// Release the surface. No method may be called afterwards.
    fn destroy(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_degraded() {
        assert!(!Capabilities::full().is_degraded());
        assert!(Capabilities::none().is_degraded());
        let partial = Capabilities {
            distortable_overlay: false,
            draw_tools: true,
        };
        assert!(partial.is_degraded());
    }

    #[test]
    fn test_cursor_css() {
        assert_eq!(Cursor::Default.css(), "default");
        assert_eq!(Cursor::Pan.css(), "grab");
    }
}
