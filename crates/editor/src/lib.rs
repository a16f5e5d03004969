//! Headless map-editing controller: places an image overlay on a map, lets it
//! be aligned, and annotates the aligned area with tagged shapes.

pub mod attributes;
pub mod commands;
pub mod config;
pub mod draw;
pub mod error;
pub mod host;
pub mod mode;
pub mod notice;
pub mod overlay;
pub mod scene;
pub mod session;
pub mod store;
pub mod style;
pub mod surface;

pub use config::EditorConfig;
pub use error::{EditorError, SurfaceError};
pub use mode::EditorMode;
pub use notice::{Notice, NoticeLevel};
pub use scene::SceneSurface;
pub use session::{EditorSession, ExportSink};
pub use store::{Shape, ShapeId, ShapeStore};
