use serde::{Deserialize, Serialize};
#[cfg(feature = "uuid-support")]
use uuid::Uuid;

/// A geographic position in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Interchange order: `[longitude, latitude]`.
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn from_lon_lat(coord: [f64; 2]) -> Self {
        Self::new(coord[1], coord[0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Polygon,
    Rectangle,
    Circle,
    Polyline,
    Marker,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        ShapeKind::Polygon,
        ShapeKind::Rectangle,
        ShapeKind::Circle,
        ShapeKind::Polyline,
        ShapeKind::Marker,
    ];

    /// Kinds whose ring encloses a surface and therefore carry an area.
    pub fn is_areal(self) -> bool {
        matches!(
            self,
            ShapeKind::Polygon | ShapeKind::Rectangle | ShapeKind::Circle
        )
    }

    /// Kinds whose ring is stored closed (first point repeated last).
    pub fn is_closed(self) -> bool {
        self.is_areal()
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeKind::Polygon => write!(f, "Polygon"),
            ShapeKind::Rectangle => write!(f, "Rectangle"),
            ShapeKind::Circle => write!(f, "Circle"),
            ShapeKind::Polyline => write!(f, "Polyline"),
            ShapeKind::Marker => write!(f, "Marker"),
        }
    }
}

/// User-entered attributes of a drawn shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeAttributes {
    pub name: String,
    pub type_tag: Option<String>,
    pub sub_type_tag: Option<String>,
    /// Display value entered by the user; never replaces the computed area.
    pub area_override: Option<f64>,
}

impl ShapeAttributes {
    /// A shape counts as annotated once it has a name or a type tag.
    pub fn is_annotated(&self) -> bool {
        !self.name.trim().is_empty()
            || self
                .type_tag
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty())
    }

    /// Trimmed name, blank tags as `None`. This is the form the attribute
    /// form saves, so stored values compare equal to an untouched resubmit.
    pub fn normalized(self) -> Self {
        fn non_blank(tag: Option<String>) -> Option<String> {
            tag.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
        }
        Self {
            name: self.name.trim().to_string(),
            type_tag: non_blank(self.type_tag),
            sub_type_tag: non_blank(self.sub_type_tag),
            area_override: self.area_override.map(crate::geometry::round_area),
        }
    }
}

/// One type tag with the sub-type tags that are valid beneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub type_tag: String,
    #[serde(default)]
    pub sub_types: Vec<String>,
}

/// Ordered `typeTag -> [subTypeTag]` vocabulary for the attribute form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    pub entries: Vec<VocabularyEntry>,
}

impl Vocabulary {
    pub fn new(entries: Vec<VocabularyEntry>) -> Self {
        Self { entries }
    }

    pub fn type_tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.type_tag.as_str())
    }

    /// Position of `type_tag` in vocabulary order.
    pub fn index_of(&self, type_tag: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.type_tag == type_tag)
    }

    /// Sub-types for `type_tag`; empty for unknown tags.
    pub fn sub_types(&self, type_tag: &str) -> &[String] {
        self.entries
            .iter()
            .find(|e| e.type_tag == type_tag)
            .map(|e| e.sub_types.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_valid_sub_type(&self, type_tag: &str, sub_type: &str) -> bool {
        self.sub_types(type_tag).iter().any(|s| s == sub_type)
    }
}

/// A saved export, as stored by the backend.
#[cfg(feature = "uuid-support")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub id: Uuid,
    pub name: String,
    /// Serialized feature-collection document.
    pub document: String,
    pub feature_count: u32,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooms() -> Vocabulary {
        Vocabulary::new(vec![
            VocabularyEntry {
                type_tag: "Room".to_string(),
                sub_types: vec!["Kitchen".to_string(), "Bedroom".to_string()],
            },
            VocabularyEntry {
                type_tag: "Boundary".to_string(),
                sub_types: vec![],
            },
        ])
    }

    #[test]
    fn test_lon_lat_order() {
        let p = GeoPoint::new(51.5, -0.12);
        assert_eq!(p.to_lon_lat(), [-0.12, 51.5]);
        assert_eq!(GeoPoint::from_lon_lat([-0.12, 51.5]), p);
    }

    #[test]
    fn test_areal_kinds() {
        assert!(ShapeKind::Polygon.is_areal());
        assert!(ShapeKind::Rectangle.is_areal());
        assert!(ShapeKind::Circle.is_areal());
        assert!(!ShapeKind::Polyline.is_areal());
        assert!(!ShapeKind::Marker.is_areal());
    }

    #[test]
    fn test_shape_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ShapeKind::Rectangle).unwrap();
        assert_eq!(json, "\"rectangle\"");
    }

    #[test]
    fn test_attributes_annotated_by_name_or_type() {
        let mut attrs = ShapeAttributes::default();
        assert!(!attrs.is_annotated());
        attrs.name = "   ".to_string();
        assert!(!attrs.is_annotated());
        attrs.type_tag = Some("Room".to_string());
        assert!(attrs.is_annotated());
        attrs.type_tag = None;
        attrs.name = "Kitchen".to_string();
        assert!(attrs.is_annotated());
    }

    #[test]
    fn test_normalized_attributes() {
        let attrs = ShapeAttributes {
            name: " Hall ".to_string(),
            type_tag: Some("  ".to_string()),
            sub_type_tag: Some(" Circulation".to_string()),
            area_override: Some(12.3456),
        }
        .normalized();
        assert_eq!(attrs.name, "Hall");
        assert_eq!(attrs.type_tag, None);
        assert_eq!(attrs.sub_type_tag.as_deref(), Some("Circulation"));
        assert_eq!(attrs.area_override, Some(12.35));
        assert_eq!(attrs.clone().normalized(), attrs);
    }

    #[test]
    fn test_vocabulary_lookup() {
        let v = rooms();
        assert_eq!(v.index_of("Boundary"), Some(1));
        assert_eq!(v.sub_types("Room").len(), 2);
        assert!(v.sub_types("Garden").is_empty());
        assert!(v.is_valid_sub_type("Room", "Kitchen"));
        assert!(!v.is_valid_sub_type("Boundary", "Kitchen"));
    }

    #[test]
    fn test_vocabulary_deserializes_from_array() {
        let json = r#"[{"typeTag":"Room","subTypes":["Kitchen"]},{"typeTag":"Boundary"}]"#;
        let v: Vocabulary = serde_json::from_str(json).unwrap();
        assert_eq!(v.type_tags().collect::<Vec<_>>(), vec!["Room", "Boundary"]);
        assert!(v.sub_types("Boundary").is_empty());
    }
}
