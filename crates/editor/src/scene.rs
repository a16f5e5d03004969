//! Retained-mode map surface. Keeps every layer and control in memory so a
//! UI can render it each frame and tests can inspect it.

use std::collections::BTreeMap;

use siteplan_shared::models::GeoPoint;
use siteplan_shared::viewport::Viewport;

use crate::draw::DrawPalette;
use crate::error::SurfaceError;
use crate::surface::{Cursor, LayerId, MapSurface, OverlayLayer, Popup, ShapeLayer};

#[derive(Debug, Clone, PartialEq)]
pub enum SceneLayer {
    Overlay(OverlayLayer),
    Shape(ShapeLayer),
}

#[derive(Debug, Clone)]
pub struct SceneSurface {
    viewport: Viewport,
    layers: BTreeMap<LayerId, SceneLayer>,
    next_layer: u64,
    draw_controls: Option<DrawPalette>,
    attach_count: usize,
    cursor: Cursor,
    popup: Option<Popup>,
    destroyed: bool,
    /// Calls that arrived after `destroy`. Must stay zero.
    writes_after_destroy: usize,
}

impl SceneSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            layers: BTreeMap::new(),
            next_layer: 0,
            draw_controls: None,
            attach_count: 0,
            cursor: Cursor::Default,
            popup: None,
            destroyed: false,
            writes_after_destroy: 0,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Direct view manipulation from pointer gestures (pan, wheel zoom).
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Layers in insertion order; later ones draw on top.
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &SceneLayer)> {
        self.layers.iter().map(|(id, layer)| (*id, layer))
    }

    pub fn overlays(&self) -> impl Iterator<Item = &OverlayLayer> {
        self.layers.values().filter_map(|l| match l {
            SceneLayer::Overlay(o) => Some(o),
            SceneLayer::Shape(_) => None,
        })
    }

    pub fn shapes(&self) -> impl Iterator<Item = &ShapeLayer> {
        self.layers.values().filter_map(|l| match l {
            SceneLayer::Shape(s) => Some(s),
            SceneLayer::Overlay(_) => None,
        })
    }

    pub fn draw_controls(&self) -> Option<&DrawPalette> {
        self.draw_controls.as_ref()
    }

    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn writes_after_destroy(&self) -> usize {
        self.writes_after_destroy
    }

    /// Record a write; false once destroyed.
    fn live(&mut self) -> bool {
        if self.destroyed {
            self.writes_after_destroy += 1;
            tracing::warn!("Write to destroyed map surface");
        }
        !self.destroyed
    }

    fn push(&mut self, layer: SceneLayer) -> LayerId {
        self.next_layer += 1;
        let id = LayerId(self.next_layer);
        if self.live() {
            self.layers.insert(id, layer);
        }
        id
    }

    fn replace(&mut self, id: LayerId, layer: SceneLayer) -> Result<(), SurfaceError> {
        if !self.live() {
            return Err(SurfaceError::Destroyed);
        }
        match self.layers.get_mut(&id) {
            Some(slot) => {
                *slot = layer;
                Ok(())
            }
            None => Err(SurfaceError::UnknownLayer(id)),
        }
    }
}

impl MapSurface for SceneSurface {
    fn view(&self) -> (GeoPoint, f64) {
        (self.viewport.center, self.viewport.zoom)
    }

    fn set_view(&mut self, center: GeoPoint, zoom: f64) {
        if self.live() {
            self.viewport = Viewport::new(center, zoom, self.viewport.width, self.viewport.height);
        }
    }

    fn invalidate_size(&mut self, width: f64, height: f64) {
        if self.live() {
            self.viewport.resize(width, height);
        }
    }

    fn add_overlay(&mut self, layer: OverlayLayer) -> LayerId {
        self.push(SceneLayer::Overlay(layer))
    }

    fn update_overlay(&mut self, id: LayerId, layer: OverlayLayer) -> Result<(), SurfaceError> {
        self.replace(id, SceneLayer::Overlay(layer))
    }

    fn add_shape(&mut self, layer: ShapeLayer) -> LayerId {
        self.push(SceneLayer::Shape(layer))
    }

    fn update_shape(&mut self, id: LayerId, layer: ShapeLayer) -> Result<(), SurfaceError> {
        self.replace(id, SceneLayer::Shape(layer))
    }

    fn remove_layer(&mut self, id: LayerId) -> Result<(), SurfaceError> {
        if !self.live() {
            return Err(SurfaceError::Destroyed);
        }
        self.layers
            .remove(&id)
            .map(|_| ())
            .ok_or(SurfaceError::UnknownLayer(id))
    }

    fn attach_draw_controls(&mut self, palette: &DrawPalette) {
        if self.live() {
            self.draw_controls = Some(palette.clone());
            self.attach_count += 1;
        }
    }

    fn detach_draw_controls(&mut self) {
        if self.live() {
            self.draw_controls = None;
        }
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        if self.live() {
            self.cursor = cursor;
        }
    }

    fn open_popup(&mut self, popup: Popup) {
        if self.live() {
            self.popup = Some(popup);
        }
    }

    fn close_popup(&mut self) {
        if self.live() {
            self.popup = None;
        }
    }

    fn destroy(&mut self) {
        if self.live() {
            self.layers.clear();
            self.draw_controls = None;
            self.popup = None;
            self.destroyed = true;
        }
    }
}
