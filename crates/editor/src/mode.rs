//! Mode Controller: arbitrates pointer input between the overlay transform
//! tools and the draw tools. At most one of them is live at a time.

use serde::{Deserialize, Serialize};

use crate::draw::DrawPalette;
use crate::error::EditorError;
use crate::overlay::OverlayManager;
use crate::surface::{Cursor, MapSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    /// The image overlay accepts move/scale/rotate/distort input.
    #[default]
    Transform,
    /// Shapes may be drawn and tagged; dragging pans the map.
    Annotate,
}

impl EditorMode {
    pub fn toggled(self) -> Self {
        match self {
            EditorMode::Transform => EditorMode::Annotate,
            EditorMode::Annotate => EditorMode::Transform,
        }
    }
}

impl std::fmt::Display for EditorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditorMode::Transform => write!(f, "Transform"),
            EditorMode::Annotate => write!(f, "Annotate"),
        }
    }
}

/// An interactive tool that can hold pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    OverlayTransform,
    DrawTools,
}

impl Affordance {
    fn owner(self) -> EditorMode {
        match self {
            Affordance::OverlayTransform => EditorMode::Transform,
            Affordance::DrawTools => EditorMode::Annotate,
        }
    }

    fn action(self) -> &'static str {
        match self {
            Affordance::OverlayTransform => "Image transform",
            Affordance::DrawTools => "Drawing",
        }
    }
}

#[derive(Debug)]
pub struct ModeController {
    mode: EditorMode,
    palette: DrawPalette,
    /// Draw plugin loaded; without it Annotate mode only pans.
    draw_available: bool,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new(DrawPalette::default())
    }
}

impl ModeController {
    pub fn new(palette: DrawPalette) -> Self {
        Self {
            mode: EditorMode::Transform,
            palette,
            draw_available: true,
        }
    }

    pub fn set_draw_available(&mut self, available: bool) {
        self.draw_available = available;
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn palette(&self) -> &DrawPalette {
        &self.palette
    }

    /// Tool selection persists while detached.
    pub fn palette_mut(&mut self) -> &mut DrawPalette {
        &mut self.palette
    }

    /// The affordance currently holding pointer input.
    pub fn active(&self) -> Affordance {
        match self.mode {
            EditorMode::Transform => Affordance::OverlayTransform,
            EditorMode::Annotate => Affordance::DrawTools,
        }
    }

    /// Fail unless `affordance` belongs to the current mode.
    pub fn require(&self, affordance: Affordance) -> Result<(), EditorError> {
        if affordance.owner() != self.mode {
            return Err(EditorError::ModeInactive {
                action: affordance.action(),
                mode: self.mode,
            });
        }
        if affordance == Affordance::DrawTools && !self.draw_available {
            Err(EditorError::Unavailable("Drawing"))
        } else {
            Ok(())
        }
    }

    /// Switch to `target`. Entering the current mode again does nothing.
    /// Returns whether the mode changed.
    pub fn enter(
        &mut self,
        target: EditorMode,
        surface: &mut dyn MapSurface,
        overlays: &mut OverlayManager,
    ) -> Result<bool, EditorError> {
        if target == self.mode {
            return Ok(false);
        }
        match target {
            EditorMode::Transform => {
                surface.detach_draw_controls();
                self.palette.set_attached(false);
                overlays.set_mode(surface, true)?;
                surface.set_cursor(Cursor::Default);
            }
            EditorMode::Annotate => {
                overlays.set_mode(surface, false)?;
                if self.draw_available {
                    self.palette.set_attached(true);
                    surface.attach_draw_controls(&self.palette);
                }
                surface.set_cursor(Cursor::Pan);
            }
        }
        tracing::debug!(from = ?self.mode, to = ?target, "Mode changed");
        self.mode = target;
        Ok(true)
    }
}
