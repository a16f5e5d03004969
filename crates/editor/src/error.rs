//! Error types for the map editor.
//!
//! Every failure is local to one component and recoverable, except
//! `Initialization` when no surface could be created at all.

use siteplan_shared::geometry::GeometryError;
use siteplan_shared::interchange::InterchangeError;
use thiserror::Error;

use crate::attributes::FormField;
use crate::mode::EditorMode;
use crate::store::ShapeId;
use crate::surface::LayerId;

#[derive(Error, Debug)]
pub enum EditorError {
    /// The map surface or its plugin capabilities failed to load.
    #[error("Map initialization failed: {0}")]
    Initialization(String),

    /// Fewer than three distinct points for an areal shape, or a degenerate line.
    #[error(transparent)]
    InvalidGeometry(#[from] GeometryError),

    /// The overlay image asset failed to load.
    #[error("Image could not be loaded: {url}")]
    OverlayLoad { url: String },

    /// The attribute form was submitted without a required or well-formed field.
    #[error("{field} is required")]
    Validation { field: FormField },

    #[error("{action} is not available in {mode} mode")]
    ModeInactive {
        action: &'static str,
        mode: EditorMode,
    },

    #[error("{0} is not available while the attribute form is open")]
    FormOpen(&'static str),

    #[error("Map is not ready")]
    NotReady,

    /// A plugin capability is missing, or no tool is selected.
    #[error("{0} is unavailable on this map")]
    Unavailable(&'static str),

    #[error("No image overlay is placed")]
    NoOverlay,

    #[error("Image overlay is not editable")]
    OverlayLocked,

    /// A load callback arrived for an overlay that has since been replaced.
    #[error("Image load callback for a replaced overlay")]
    StaleOverlay,

    #[error("Invalid overlay transform: {0}")]
    InvalidTransform(String),

    #[error("No shape with id {0}")]
    UnknownShape(ShapeId),

    #[error("Shape {0} already exists")]
    DuplicateShape(ShapeId),

    #[error("No free shape id left")]
    IdsExhausted,

    #[error("No drawing in progress")]
    NoDraft,

    #[error("Attribute form is not open")]
    FormClosed,

    #[error("Map initialization was cancelled")]
    Cancelled,

    #[error(transparent)]
    Interchange(#[from] InterchangeError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Layer {0:?} is not on the map")]
    UnknownLayer(LayerId),

    #[error("Map surface has been destroyed")]
    Destroyed,
}
