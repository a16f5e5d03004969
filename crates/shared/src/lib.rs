//! Data model and geographic math shared by the editor, frontend and backend.

pub mod geometry;
pub mod interchange;
pub mod models;
pub mod viewport;
