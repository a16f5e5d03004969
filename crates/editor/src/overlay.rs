//! Overlay Manager: the single image overlay placed on the map.

use siteplan_shared::models::GeoPoint;
use siteplan_shared::viewport::centered_bounds;

use crate::error::EditorError;
use crate::surface::{Capabilities, LayerId, MapSurface, OverlayLayer};

pub const MIN_OPACITY: f64 = 0.1;
pub const MAX_OPACITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformState {
    Unselected,
    /// Handles shown, accepts move/scale/rotate/distort.
    SelectedEditable,
    /// Selected but inert, kept in place while annotating.
    SelectedLocked,
}

/// Identifies one `set_image` call so late load callbacks can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTicket {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayTransform {
    /// Translate by a latitude/longitude delta in degrees.
    Move { d_lat: f64, d_lon: f64 },
    /// Scale about the overlay center.
    Scale { factor: f64 },
    /// Rotate clockwise about the overlay center.
    Rotate { degrees: f64 },
    /// Drag one corner (NW, NE, SE, SW order) to a new position.
    Distort { corner: usize, to: GeoPoint },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub url: String,
    /// NW, NE, SE, SW.
    pub corners: [GeoPoint; 4],
    pub state: TransformState,
    pub opacity: f64,
    /// Placed without the distortable-overlay capability.
    pub is_static: bool,
    pub loaded: bool,
    generation: u64,
    /// Zoom the overlay was placed at; its span is measured there.
    placed_zoom: f64,
    layer: LayerId,
}

impl Overlay {
    pub fn center(&self) -> GeoPoint {
        let (lat, lon) = self.corners.iter().fold((0.0, 0.0), |(lat, lon), c| {
            (lat + c.latitude, lon + c.longitude)
        });
        GeoPoint::new(lat / 4.0, lon / 4.0)
    }

    fn to_layer(&self) -> OverlayLayer {
        OverlayLayer {
            url: self.url.clone(),
            corners: self.corners,
            opacity: self.opacity,
            editable: self.state == TransformState::SelectedEditable,
            selected: self.state != TransformState::Unselected,
        }
    }
}

/// Owns the nullable overlay slot. Replacing the image tears the old one down first.
#[derive(Debug)]
pub struct OverlayManager {
    slot: Option<Overlay>,
    generation: u64,
    /// Editing allowed by the current mode.
    mode_editable: bool,
    /// Editing disabled by the host page.
    externally_disabled: bool,
    span_px: f64,
}

impl OverlayManager {
    pub fn new(span_px: f64, externally_disabled: bool) -> Self {
        Self {
            slot: None,
            generation: 0,
            mode_editable: true,
            externally_disabled,
            span_px,
        }
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.slot.as_ref()
    }

    pub fn state(&self) -> Option<TransformState> {
        self.slot.as_ref().map(|o| o.state)
    }

    /// Transform handles, derived from the corners while editable.
    pub fn handles(&self) -> Option<[GeoPoint; 4]> {
        self.slot
            .as_ref()
            .filter(|o| o.state == TransformState::SelectedEditable)
            .map(|o| o.corners)
    }

    /// Place `url` centered on the current view. The overlay starts unselected
    /// until `on_image_loaded` is called with the returned ticket.
    ///
    /// `aspect` is height over width of the image, when already known.
    pub fn set_image(
        &mut self,
        surface: &mut dyn MapSurface,
        url: &str,
        aspect: f64,
        capabilities: Capabilities,
    ) -> OverlayTicket {
        self.teardown(surface);

        let (center, zoom) = surface.view();
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        let corners = centered_bounds(center, zoom, self.span_px, aspect).corners();

        self.generation += 1;
        let mut overlay = Overlay {
            url: url.to_string(),
            corners,
            state: TransformState::Unselected,
            opacity: MAX_OPACITY,
            is_static: !capabilities.distortable_overlay,
            loaded: false,
            generation: self.generation,
            placed_zoom: zoom,
            layer: LayerId(0),
        };
        overlay.layer = surface.add_overlay(overlay.to_layer());
        if overlay.is_static {
            tracing::warn!(url, "Distortable overlay unavailable, placing static image");
        }
        tracing::info!(url, zoom, generation = self.generation, "Overlay placed");
        self.slot = Some(overlay);

        OverlayTicket {
            generation: self.generation,
        }
    }

    fn current(&mut self, ticket: OverlayTicket) -> Result<&mut Overlay, EditorError> {
        match self.slot.as_mut() {
            Some(o) if o.generation == ticket.generation => Ok(o),
            _ => {
                tracing::warn!(generation = ticket.generation, "Ignoring stale overlay callback");
                Err(EditorError::StaleOverlay)
            }
        }
    }

    /// The image's natural size became known: refit the corners to its aspect
    /// ratio around the same center. Only an overlay still loading is refit.
    pub fn fit_aspect(
        &mut self,
        surface: &mut dyn MapSurface,
        ticket: OverlayTicket,
        width: f64,
        height: f64,
    ) -> Result<(), EditorError> {
        let span_px = self.span_px;
        let overlay = self.current(ticket)?;
        if overlay.loaded {
            return Ok(());
        }
        let aspect = height / width;
        if !(aspect.is_finite() && aspect > 0.0) {
            return Err(EditorError::InvalidTransform(format!("image size {width}x{height}")));
        }
        overlay.corners = centered_bounds(overlay.center(), overlay.placed_zoom, span_px, aspect).corners();
        surface.update_overlay(overlay.layer, overlay.to_layer())?;
        tracing::debug!(aspect, "Overlay fitted to image");
        Ok(())
    }

    /// The image asset finished loading: select it for editing if allowed.
    pub fn on_image_loaded(
        &mut self,
        surface: &mut dyn MapSurface,
        ticket: OverlayTicket,
    ) -> Result<TransformState, EditorError> {
        let mode_editable = self.mode_editable;
        let blocked = self.externally_disabled;
        let overlay = self.current(ticket)?;
        overlay.loaded = true;
        overlay.state = if overlay.is_static || blocked {
            TransformState::Unselected
        } else if mode_editable {
            TransformState::SelectedEditable
        } else {
            TransformState::SelectedLocked
        };
        surface.update_overlay(overlay.layer, overlay.to_layer())?;
        tracing::debug!(state = ?overlay.state, "Overlay loaded");
        Ok(overlay.state)
    }

    /// The image asset failed to load: remove the overlay.
    pub fn on_image_failed(&mut self, surface: &mut dyn MapSurface, ticket: OverlayTicket) -> EditorError {
        let url = match self.current(ticket) {
            Ok(overlay) => overlay.url.clone(),
            Err(err) => return err,
        };
        self.teardown(surface);
        tracing::warn!(%url, "Overlay image failed to load");
        EditorError::OverlayLoad { url }
    }

    /// Enable or disable editing without recreating the overlay. Only toggles
    /// between the editable and locked variants; an unselected overlay stays so.
    pub fn set_mode(&mut self, surface: &mut dyn MapSurface, editable: bool) -> Result<(), EditorError> {
        self.mode_editable = editable;
        let Some(overlay) = self.slot.as_mut() else {
            return Ok(());
        };
        let next = match (overlay.state, editable) {
            (TransformState::SelectedLocked, true) => TransformState::SelectedEditable,
            (TransformState::SelectedEditable, false) => TransformState::SelectedLocked,
            (state, _) => state,
        };
        if next != overlay.state {
            overlay.state = next;
            surface.update_overlay(overlay.layer, overlay.to_layer())?;
            tracing::debug!(state = ?next, "Overlay editing toggled");
        }
        Ok(())
    }

    /// Click on the image while transforming.
    pub fn select(&mut self, surface: &mut dyn MapSurface) -> Result<(), EditorError> {
        let mode_editable = self.mode_editable;
        let blocked = self.externally_disabled;
        let overlay = self.slot.as_mut().ok_or(EditorError::NoOverlay)?;
        if overlay.is_static || blocked || !overlay.loaded {
            return Err(EditorError::OverlayLocked);
        }
        overlay.state = if mode_editable {
            TransformState::SelectedEditable
        } else {
            TransformState::SelectedLocked
        };
        surface.update_overlay(overlay.layer, overlay.to_layer())?;
        Ok(())
    }

    /// Click on the map away from the image.
    pub fn deselect(&mut self, surface: &mut dyn MapSurface) -> Result<(), EditorError> {
        let overlay = self.slot.as_mut().ok_or(EditorError::NoOverlay)?;
        if overlay.state != TransformState::Unselected {
            overlay.state = TransformState::Unselected;
            surface.update_overlay(overlay.layer, overlay.to_layer())?;
        }
        Ok(())
    }

    pub fn apply(&mut self, surface: &mut dyn MapSurface, transform: OverlayTransform) -> Result<(), EditorError> {
        let overlay = self.slot.as_mut().ok_or(EditorError::NoOverlay)?;
        if overlay.state != TransformState::SelectedEditable {
            return Err(EditorError::OverlayLocked);
        }
        let corners = transformed(overlay.corners, overlay.center(), &transform)?;
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(EditorError::InvalidTransform(format!("{transform:?}")));
        }
        overlay.corners = corners;
        surface.update_overlay(overlay.layer, overlay.to_layer())?;
        Ok(())
    }

    /// Opacity is clamped to 0.1..=1.0 and may change in any mode.
    pub fn set_opacity(&mut self, surface: &mut dyn MapSurface, opacity: f64) -> Result<f64, EditorError> {
        let overlay = self.slot.as_mut().ok_or(EditorError::NoOverlay)?;
        if !opacity.is_finite() {
            return Err(EditorError::InvalidTransform(format!("opacity {opacity}")));
        }
        overlay.opacity = opacity.clamp(MIN_OPACITY, MAX_OPACITY);
        surface.update_overlay(overlay.layer, overlay.to_layer())?;
        Ok(overlay.opacity)
    }

    /// Remove the overlay from the map. Removal errors are logged and ignored.
    pub fn teardown(&mut self, surface: &mut dyn MapSurface) {
        if let Some(old) = self.slot.take() {
            if let Err(e) = surface.remove_layer(old.layer) {
                tracing::warn!(error = %e, url = %old.url, "Failed to remove previous overlay");
            }
        }
    }

    /// Drop the slot without touching a surface that is already gone.
    pub(crate) fn forget(&mut self) {
        self.slot = None;
    }
}

/// Corners after `transform`, in a local frame scaled by cos(latitude) so
/// rotation and scaling keep the image's ground proportions.
fn transformed(
    corners: [GeoPoint; 4],
    center: GeoPoint,
    transform: &OverlayTransform,
) -> Result<[GeoPoint; 4], EditorError> {
    let k = center.latitude.to_radians().cos().max(1e-6);
    let to_local = |p: GeoPoint| ((p.longitude - center.longitude) * k, p.latitude - center.latitude);
    let from_local = |(x, y): (f64, f64)| GeoPoint::new(center.latitude + y, center.longitude + x / k);

    let map = |f: &dyn Fn((f64, f64)) -> (f64, f64)| corners.map(|c| from_local(f(to_local(c))));

    match *transform {
        OverlayTransform::Move { d_lat, d_lon } => Ok(corners.map(|c| {
            GeoPoint::new(c.latitude + d_lat, c.longitude + d_lon)
        })),
        OverlayTransform::Scale { factor } => {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(EditorError::InvalidTransform(format!("scale factor {factor}")));
            }
            Ok(map(&|(x, y)| (x * factor, y * factor)))
        }
        OverlayTransform::Rotate { degrees } => {
            // Clockwise on screen: y points north
            let (sin, cos) = (-degrees.to_radians()).sin_cos();
            Ok(map(&|(x, y)| (x * cos - y * sin, x * sin + y * cos)))
        }
        OverlayTransform::Distort { corner, to } => {
            if corner >= 4 {
                return Err(EditorError::InvalidTransform(format!("corner {corner}")));
            }
            let mut out = corners;
            out[corner] = to;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneSurface;
    use siteplan_shared::viewport::Viewport;

    const LONDON: GeoPoint = GeoPoint::new(51.5072, -0.1276);

    fn surface(zoom: f64) -> SceneSurface {
        SceneSurface::new(Viewport::new(LONDON, zoom, 800.0, 600.0))
    }

    fn loaded(surface: &mut SceneSurface) -> OverlayManager {
        let mut manager = OverlayManager::new(400.0, false);
        let ticket = manager.set_image(surface, "plan.png", 1.0, Capabilities::full());
        manager.on_image_loaded(surface, ticket).unwrap();
        manager
    }

    fn close(a: GeoPoint, b: GeoPoint) -> bool {
        (a.latitude - b.latitude).abs() < 1e-9 && (a.longitude - b.longitude).abs() < 1e-9
    }

    #[test]
    fn test_set_image_centered_on_view() {
        let mut s = surface(15.0);
        let mut manager = OverlayManager::new(400.0, false);
        let ticket = manager.set_image(&mut s, "plan.png", 1.0, Capabilities::full());
        let overlay = manager.overlay().unwrap();
        assert_eq!(overlay.state, TransformState::Unselected);
        let c = overlay.center();
        assert!((c.latitude - LONDON.latitude).abs() < 1e-4);
        assert!((c.longitude - LONDON.longitude).abs() < 1e-9);
        assert_eq!(s.overlays().count(), 1);

        assert_eq!(
            manager.on_image_loaded(&mut s, ticket).unwrap(),
            TransformState::SelectedEditable
        );
        assert!(s.overlays().next().unwrap().editable);
    }

    #[test]
    fn test_span_halves_per_zoom_level() {
        let span = |zoom: f64| {
            let mut s = surface(zoom);
            let mut manager = OverlayManager::new(400.0, false);
            manager.set_image(&mut s, "plan.png", 1.0, Capabilities::full());
            let corners = manager.overlay().unwrap().corners;
            corners[1].longitude - corners[0].longitude
        };
        let ratio = span(15.0) / span(16.0);
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_replacing_image_tears_down_previous() {
        let mut s = surface(15.0);
        let mut manager = OverlayManager::new(400.0, false);
        let first = manager.set_image(&mut s, "a.png", 1.0, Capabilities::full());
        let second = manager.set_image(&mut s, "b.png", 1.0, Capabilities::full());
        assert_eq!(s.overlays().count(), 1);
        assert!(matches!(
            manager.on_image_loaded(&mut s, first),
            Err(EditorError::StaleOverlay)
        ));
        assert_eq!(manager.state(), Some(TransformState::Unselected));
        manager.on_image_loaded(&mut s, second).unwrap();
        assert_eq!(manager.overlay().unwrap().url, "b.png");
    }

    #[test]
    fn test_fit_aspect_before_load_only() {
        let mut s = surface(15.0);
        let mut manager = OverlayManager::new(400.0, false);
        let ticket = manager.set_image(&mut s, "plan.png", 1.0, Capabilities::full());
        let square = manager.overlay().unwrap().corners;

        manager.fit_aspect(&mut s, ticket, 800.0, 400.0).unwrap();
        let wide = manager.overlay().unwrap().corners;
        let width = |c: [GeoPoint; 4]| c[1].longitude - c[0].longitude;
        let height = |c: [GeoPoint; 4]| c[0].latitude - c[3].latitude;
        assert!((width(wide) - width(square)).abs() < 1e-9);
        assert!((height(wide) / height(square) - 0.5).abs() < 1e-3);
        let c = manager.overlay().unwrap().center();
        assert!((c.latitude - LONDON.latitude).abs() < 1e-4);
        assert!((c.longitude - LONDON.longitude).abs() < 1e-9);

        assert!(manager.fit_aspect(&mut s, ticket, 0.0, 400.0).is_err());
        manager.on_image_loaded(&mut s, ticket).unwrap();
        manager.fit_aspect(&mut s, ticket, 100.0, 400.0).unwrap();
        assert_eq!(manager.overlay().unwrap().corners, wide);
    }

    #[test]
    fn test_externally_disabled_stays_unselected() {
        let mut s = surface(15.0);
        let mut manager = OverlayManager::new(400.0, true);
        let ticket = manager.set_image(&mut s, "plan.png", 1.0, Capabilities::full());
        assert_eq!(
            manager.on_image_loaded(&mut s, ticket).unwrap(),
            TransformState::Unselected
        );
        assert_eq!(s.overlays().count(), 1);
        assert!(manager.apply(&mut s, OverlayTransform::Scale { factor: 2.0 }).is_err());
    }

    #[test]
    fn test_static_fallback_without_capability() {
        let mut s = surface(15.0);
        let mut manager = OverlayManager::new(400.0, false);
        let ticket = manager.set_image(&mut s, "plan.png", 1.0, Capabilities::none());
        assert_eq!(
            manager.on_image_loaded(&mut s, ticket).unwrap(),
            TransformState::Unselected
        );
        assert!(manager.overlay().unwrap().is_static);
        assert!(matches!(manager.select(&mut s), Err(EditorError::OverlayLocked)));
    }

    #[test]
    fn test_failed_load_removes_overlay() {
        let mut s = surface(15.0);
        let mut manager = OverlayManager::new(400.0, false);
        let ticket = manager.set_image(&mut s, "missing.png", 1.0, Capabilities::full());
        let err = manager.on_image_failed(&mut s, ticket);
        assert!(matches!(err, EditorError::OverlayLoad { ref url } if url == "missing.png"));
        assert!(manager.overlay().is_none());
        assert_eq!(s.overlays().count(), 0);
    }

    #[test]
    fn test_set_mode_toggles_without_recreating() {
        let mut s = surface(15.0);
        let mut manager = loaded(&mut s);
        let corners = manager.overlay().unwrap().corners;
        manager.set_mode(&mut s, false).unwrap();
        assert_eq!(manager.state(), Some(TransformState::SelectedLocked));
        assert!(manager.handles().is_none());
        assert!(matches!(
            manager.apply(&mut s, OverlayTransform::Rotate { degrees: 10.0 }),
            Err(EditorError::OverlayLocked)
        ));
        manager.set_mode(&mut s, true).unwrap();
        assert_eq!(manager.state(), Some(TransformState::SelectedEditable));
        assert_eq!(manager.overlay().unwrap().corners, corners);
        assert_eq!(s.overlays().count(), 1);
    }

    #[test]
    fn test_set_mode_leaves_unselected_alone() {
        let mut s = surface(15.0);
        let mut manager = loaded(&mut s);
        manager.deselect(&mut s).unwrap();
        manager.set_mode(&mut s, false).unwrap();
        manager.set_mode(&mut s, true).unwrap();
        assert_eq!(manager.state(), Some(TransformState::Unselected));
    }

    #[test]
    fn test_load_while_locked() {
        let mut s = surface(15.0);
        let mut manager = OverlayManager::new(400.0, false);
        manager.set_mode(&mut s, false).unwrap();
        let ticket = manager.set_image(&mut s, "plan.png", 1.0, Capabilities::full());
        assert_eq!(
            manager.on_image_loaded(&mut s, ticket).unwrap(),
            TransformState::SelectedLocked
        );
    }

    #[test]
    fn test_move_translates_all_corners() {
        let mut s = surface(15.0);
        let mut manager = loaded(&mut s);
        let before = manager.overlay().unwrap().corners;
        manager
            .apply(&mut s, OverlayTransform::Move { d_lat: 0.001, d_lon: -0.002 })
            .unwrap();
        let after = manager.overlay().unwrap().corners;
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(close(GeoPoint::new(a.latitude + 0.001, a.longitude - 0.002), *b));
        }
    }

    #[test]
    fn test_scale_and_rotate_keep_center() {
        let mut s = surface(15.0);
        let mut manager = loaded(&mut s);
        let center = manager.overlay().unwrap().center();
        manager
            .apply(&mut s, OverlayTransform::Scale { factor: 1.5 })
            .unwrap();
        manager
            .apply(&mut s, OverlayTransform::Rotate { degrees: 30.0 })
            .unwrap();
        assert!(close(manager.overlay().unwrap().center(), center));
        assert!(matches!(
            manager.apply(&mut s, OverlayTransform::Scale { factor: 0.0 }),
            Err(EditorError::InvalidTransform(_))
        ));
    }

    #[test]
    fn test_full_rotation_is_identity() {
        let mut s = surface(15.0);
        let mut manager = loaded(&mut s);
        let before = manager.overlay().unwrap().corners;
        for _ in 0..4 {
            manager
                .apply(&mut s, OverlayTransform::Rotate { degrees: 90.0 })
                .unwrap();
        }
        let after = manager.overlay().unwrap().corners;
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(close(*a, *b));
        }
    }

    #[test]
    fn test_distort_moves_one_corner() {
        let mut s = surface(15.0);
        let mut manager = loaded(&mut s);
        let before = manager.overlay().unwrap().corners;
        let to = GeoPoint::new(before[2].latitude - 0.0005, before[2].longitude + 0.0005);
        manager
            .apply(&mut s, OverlayTransform::Distort { corner: 2, to })
            .unwrap();
        let after = manager.overlay().unwrap().corners;
        assert_eq!(after[2], to);
        assert_eq!(after[0], before[0]);
        assert!(manager
            .apply(&mut s, OverlayTransform::Distort { corner: 4, to })
            .is_err());
    }

    #[test]
    fn test_opacity_clamped() {
        let mut s = surface(15.0);
        let mut manager = loaded(&mut s);
        assert_eq!(manager.set_opacity(&mut s, 0.0).unwrap(), MIN_OPACITY);
        assert_eq!(manager.set_opacity(&mut s, 0.6).unwrap(), 0.6);
        manager.set_mode(&mut s, false).unwrap();
        assert_eq!(manager.set_opacity(&mut s, 3.0).unwrap(), MAX_OPACITY);
        assert_eq!(manager.state(), Some(TransformState::SelectedLocked));
    }

    #[test]
    fn test_teardown_removes_layer() {
        let mut s = surface(15.0);
        let mut manager = loaded(&mut s);
        manager.teardown(&mut s);
        assert!(manager.overlay().is_none());
        assert_eq!(s.overlays().count(), 0);
        // Second teardown is a no-op
        manager.teardown(&mut s);
    }
}
