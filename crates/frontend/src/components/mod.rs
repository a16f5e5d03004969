pub mod attribute_form;
pub mod export_panel;
pub mod map_canvas;
pub mod notices;
pub mod toolbar;
