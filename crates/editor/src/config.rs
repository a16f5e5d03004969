use serde::{Deserialize, Serialize};
use siteplan_shared::geometry::CIRCLE_SEGMENTS;
use siteplan_shared::models::GeoPoint;
use siteplan_shared::viewport::{MAX_ZOOM, MIN_ZOOM};

/// Editor settings. Every field has a default, so partial JSON is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Map center used when no postcode is given or it cannot be resolved.
    pub fallback_center: GeoPoint,
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Initial overlay size in screen pixels at the zoom it is placed at.
    pub overlay_span_px: f64,
    pub circle_segments: usize,
    /// Host page disabled image editing: the overlay is shown but never selected.
    pub overlay_editing_disabled: bool,
    /// Raster tile URL with `{z}`, `{x}`, `{y}` placeholders.
    pub tile_url: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            fallback_center: GeoPoint::new(51.5072, -0.1276),
            default_zoom: 15.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            overlay_span_px: 400.0,
            circle_segments: CIRCLE_SEGMENTS,
            overlay_editing_disabled: false,
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn tile_url_for(&self, z: u8, x: i64, y: i64) -> String {
        self.tile_url
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"defaultZoom": 17, "overlayEditingDisabled": true}"#).unwrap();
        assert_eq!(config.default_zoom, 17.0);
        assert!(config.overlay_editing_disabled);
        assert_eq!(config.fallback_center, GeoPoint::new(51.5072, -0.1276));
        assert_eq!(config.circle_segments, 64);
    }

    #[test]
    fn test_clamp_zoom() {
        let config = EditorConfig::default();
        assert_eq!(config.clamp_zoom(0.0), 1.0);
        assert_eq!(config.clamp_zoom(25.0), 20.0);
        assert_eq!(config.clamp_zoom(12.5), 12.5);
    }

    #[test]
    fn test_tile_url_for() {
        let config = EditorConfig::default();
        assert_eq!(
            config.tile_url_for(15, 16372, 10895),
            "https://tile.openstreetmap.org/15/16372/10895.png"
        );
    }
}
