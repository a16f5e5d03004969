//! Feature-collection interchange document (GeoJSON layout).
//!
//! Coordinates are `[longitude, latitude]`. Polygon rings are closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{self, GeometryError};
use crate::models::{GeoPoint, ShapeKind};

#[derive(Error, Debug)]
pub enum InterchangeError {
    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feature {index}: geometry {geometry} cannot hold a {kind}")]
    UnsupportedGeometry {
        index: usize,
        geometry: &'static str,
        kind: ShapeKind,
    },

    #[error("Feature {index}: {reason}")]
    MalformedCoordinates { index: usize, reason: String },

    #[error("Feature {index}: {source}")]
    Geometry {
        index: usize,
        #[source]
        source: GeometryError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTag {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    #[default]
    Feature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::LineString { .. } => "LineString",
            Geometry::Polygon { .. } => "Polygon",
        }
    }

    /// Geometry holding `ring` for a shape of `kind`. Areal rings are closed.
    pub fn from_ring(kind: ShapeKind, ring: &[GeoPoint]) -> Self {
        let coords = |points: &[GeoPoint]| points.iter().map(|p| p.to_lon_lat()).collect();
        match kind {
            ShapeKind::Marker => Geometry::Point {
                coordinates: ring.first().map(|p| p.to_lon_lat()).unwrap_or([0.0, 0.0]),
            },
            ShapeKind::Polyline => Geometry::LineString {
                coordinates: coords(ring),
            },
            ShapeKind::Polygon | ShapeKind::Rectangle | ShapeKind::Circle => Geometry::Polygon {
                coordinates: vec![coords(&geometry::close_ring(ring))],
            },
        }
    }

    /// The ring this geometry describes (exterior ring for polygons).
    pub fn ring(&self) -> Vec<GeoPoint> {
        match self {
            Geometry::Point { coordinates } => vec![GeoPoint::from_lon_lat(*coordinates)],
            Geometry::LineString { coordinates } => {
                coordinates.iter().copied().map(GeoPoint::from_lon_lat).collect()
            }
            Geometry::Polygon { coordinates } => coordinates
                .first()
                .map(|ring| ring.iter().copied().map(GeoPoint::from_lon_lat).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureProperties {
    pub name: String,
    pub type_tag: Option<String>,
    pub sub_type_tag: Option<String>,
    /// Square meters, two decimals. Null for kinds without area.
    pub computed_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_override: Option<f64>,
    pub shape_kind: ShapeKind,
    /// Circle radius in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub tag: FeatureTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

impl Feature {
    /// Validate the geometry against the declared shape kind and return its ring.
    pub fn checked_ring(&self, index: usize) -> Result<Vec<GeoPoint>, InterchangeError> {
        let kind = self.properties.shape_kind;
        let compatible = matches!(
            (&self.geometry, kind),
            (Geometry::Point { .. }, ShapeKind::Marker)
                | (Geometry::LineString { .. }, ShapeKind::Polyline)
                | (
                    Geometry::Polygon { .. },
                    ShapeKind::Polygon | ShapeKind::Rectangle | ShapeKind::Circle
                )
        );
        if !compatible {
            return Err(InterchangeError::UnsupportedGeometry {
                index,
                geometry: self.geometry.type_name(),
                kind,
            });
        }

        let ring = self.geometry.ring();
        if ring.iter().any(|p| !p.is_finite()) {
            return Err(InterchangeError::MalformedCoordinates {
                index,
                reason: "non-finite coordinate".to_string(),
            });
        }
        if kind == ShapeKind::Polyline && ring.len() < 2 {
            return Err(InterchangeError::MalformedCoordinates {
                index,
                reason: "a line needs at least 2 points".to_string(),
            });
        }
        Ok(ring)
    }

    /// Re-derive the area from the geometry alone.
    pub fn derived_area(&self) -> Result<Option<f64>, GeometryError> {
        if !self.properties.shape_kind.is_areal() {
            return Ok(None);
        }
        geometry::area(&self.geometry.ring()).map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub tag: CollectionTag,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            tag: CollectionTag::FeatureCollection,
            features,
        }
    }

    pub fn to_json(&self) -> Result<String, InterchangeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, InterchangeError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(kind: ShapeKind) -> FeatureProperties {
        FeatureProperties {
            name: "Kitchen".to_string(),
            type_tag: Some("Room".to_string()),
            sub_type_tag: None,
            computed_area: Some(12.5),
            area_override: None,
            shape_kind: kind,
            radius: None,
            created_at: "2026-01-02T03:04:05Z".parse().unwrap(),
            last_edited_at: None,
        }
    }

    fn triangle() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(51.0, 0.0),
            GeoPoint::new(51.0, 0.001),
            GeoPoint::new(51.001, 0.0),
        ]
    }

    #[test]
    fn test_polygon_geometry_is_closed_lon_lat() {
        let g = Geometry::from_ring(ShapeKind::Polygon, &triangle());
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["type"], "Polygon");
        let ring = json["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], ring[3]);
        assert_eq!(ring[1][0], 0.001);
        assert_eq!(ring[1][1], 51.0);
    }

    #[test]
    fn test_marker_geometry_is_point() {
        let g = Geometry::from_ring(ShapeKind::Marker, &[GeoPoint::new(1.0, 2.0)]);
        assert_eq!(
            g,
            Geometry::Point {
                coordinates: [2.0, 1.0]
            }
        );
        assert_eq!(g.ring(), vec![GeoPoint::new(1.0, 2.0)]);
    }

    #[test]
    fn test_feature_serializes_expected_properties() {
        let feature = Feature {
            tag: FeatureTag::Feature,
            id: Some(7),
            geometry: Geometry::from_ring(ShapeKind::Polygon, &triangle()),
            properties: props(ShapeKind::Polygon),
        };
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["properties"]["name"], "Kitchen");
        assert_eq!(json["properties"]["typeTag"], "Room");
        assert!(json["properties"]["subTypeTag"].is_null());
        assert_eq!(json["properties"]["computedArea"], 12.5);
        assert_eq!(json["properties"]["createdAt"], "2026-01-02T03:04:05Z");
        assert!(json["properties"].get("lastEditedAt").is_none());
        assert!(json["properties"].get("areaOverride").is_none());
    }

    #[test]
    fn test_collection_roundtrips_through_json() {
        let doc = FeatureCollection::new(vec![Feature {
            tag: FeatureTag::Feature,
            id: None,
            geometry: Geometry::from_ring(ShapeKind::Polygon, &triangle()),
            properties: props(ShapeKind::Polygon),
        }]);
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"FeatureCollection\""));
        let back = FeatureCollection::from_json(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_rejects_wrong_collection_type() {
        let json = r#"{"type":"Feature","features":[]}"#;
        assert!(matches!(
            FeatureCollection::from_json(json),
            Err(InterchangeError::Json(_))
        ));
    }

    #[test]
    fn test_checked_ring_rejects_kind_mismatch() {
        let feature = Feature {
            tag: FeatureTag::Feature,
            id: None,
            geometry: Geometry::Point {
                coordinates: [0.0, 0.0],
            },
            properties: props(ShapeKind::Polygon),
        };
        assert!(matches!(
            feature.checked_ring(3),
            Err(InterchangeError::UnsupportedGeometry { index: 3, .. })
        ));
    }

    #[test]
    fn test_derived_area_matches_geometry_service() {
        let feature = Feature {
            tag: FeatureTag::Feature,
            id: None,
            geometry: Geometry::from_ring(ShapeKind::Polygon, &triangle()),
            properties: props(ShapeKind::Polygon),
        };
        let expected = geometry::area(&triangle()).unwrap();
        let derived = feature.derived_area().unwrap().unwrap();
        assert!((derived - expected).abs() < 1e-6);
    }

    #[test]
    fn test_derived_area_none_for_polyline() {
        let feature = Feature {
            tag: FeatureTag::Feature,
            id: None,
            geometry: Geometry::from_ring(ShapeKind::Polyline, &triangle()),
            properties: props(ShapeKind::Polyline),
        };
        assert_eq!(feature.derived_area().unwrap(), None);
    }
}
