//! Shape Store: the drawn shapes, their attributes and audit timestamps.

use chrono::{DateTime, Utc};
use siteplan_shared::geometry;
use siteplan_shared::interchange::{
    Feature, FeatureCollection, FeatureProperties, FeatureTag, Geometry, InterchangeError,
};
use siteplan_shared::models::{GeoPoint, ShapeAttributes, ShapeKind};

use crate::draw::DrawnGeometry;
use crate::error::EditorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u64);

impl std::fmt::Display for ShapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of edit timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub ring: Vec<GeoPoint>,
    /// Circle radius in meters.
    pub radius: Option<f64>,
    pub attributes: ShapeAttributes,
    /// Square meters, derived from `ring`. `None` for lines and markers.
    pub computed_area: Option<f64>,
    pub created_at: DateTime<Utc>,
    /// Set only when an attribute actually changed.
    pub last_edited_at: Option<DateTime<Utc>>,
}

impl Shape {
    pub fn new(id: ShapeId, drawn: DrawnGeometry, created_at: DateTime<Utc>) -> Result<Self, EditorError> {
        let computed_area = area_of(drawn.kind, &drawn.ring)?;
        Ok(Self {
            id,
            kind: drawn.kind,
            ring: drawn.ring,
            radius: drawn.radius,
            attributes: ShapeAttributes::default(),
            computed_area,
            created_at,
            last_edited_at: None,
        })
    }

    /// Area to show the user: the override if one was entered.
    pub fn display_area(&self) -> Option<f64> {
        self.attributes.area_override.or(self.computed_area)
    }

    pub fn anchor(&self) -> Option<GeoPoint> {
        match self.kind {
            ShapeKind::Marker => self.ring.first().copied(),
            _ => geometry::centroid(&self.ring),
        }
    }

    fn to_feature(&self) -> Feature {
        Feature {
            tag: FeatureTag::Feature,
            id: Some(self.id.0),
            geometry: Geometry::from_ring(self.kind, &self.ring),
            properties: FeatureProperties {
                name: self.attributes.name.clone(),
                type_tag: self.attributes.type_tag.clone(),
                sub_type_tag: self.attributes.sub_type_tag.clone(),
                computed_area: self.computed_area.map(geometry::round_area),
                area_override: self.attributes.area_override,
                shape_kind: self.kind,
                radius: self.radius,
                created_at: self.created_at,
                last_edited_at: self.last_edited_at,
            },
        }
    }
}

fn area_of(kind: ShapeKind, ring: &[GeoPoint]) -> Result<Option<f64>, EditorError> {
    if kind.is_areal() {
        Ok(Some(geometry::area(ring)?))
    } else {
        Ok(None)
    }
}

/// Attribute fields to merge into a shape. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributePatch {
    pub name: Option<String>,
    pub type_tag: Option<Option<String>>,
    pub sub_type_tag: Option<Option<String>>,
    pub area_override: Option<Option<f64>>,
}

impl AttributePatch {
    /// Patch that sets every field to the values of `attrs`.
    pub fn replace_with(attrs: ShapeAttributes) -> Self {
        Self {
            name: Some(attrs.name),
            type_tag: Some(attrs.type_tag),
            sub_type_tag: Some(attrs.sub_type_tag),
            area_override: Some(attrs.area_override),
        }
    }

    fn merged(self, current: &ShapeAttributes) -> ShapeAttributes {
        ShapeAttributes {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            type_tag: self.type_tag.unwrap_or_else(|| current.type_tag.clone()),
            sub_type_tag: self
                .sub_type_tag
                .unwrap_or_else(|| current.sub_type_tag.clone()),
            area_override: self.area_override.unwrap_or(current.area_override),
        }
    }
}

/// First id after `after` that is not `taken`, wrapping to the low ids once
/// the top of the range is in use.
fn free_id(after: u64, taken: impl Fn(u64) -> bool) -> Result<u64, EditorError> {
    (after.saturating_add(1)..=u64::MAX)
        .chain(1..=after)
        .find(|id| !taken(*id))
        .ok_or(EditorError::IdsExhausted)
}

/// Insertion-ordered collection of shapes keyed by id.
#[derive(Debug, Default)]
pub struct ShapeStore {
    shapes: Vec<Shape>,
    next_id: u64,
}

impl ShapeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, shape: Shape) -> Result<ShapeId, EditorError> {
        if self.get(shape.id).is_some() {
            return Err(EditorError::DuplicateShape(shape.id));
        }
        let id = shape.id;
        self.next_id = self.next_id.max(id.0);
        self.shapes.push(shape);
        tracing::debug!(shape_id = %id, total = self.shapes.len(), "Shape added");
        Ok(id)
    }

    /// Build a shape from freshly drawn geometry and store it under a new id.
    pub fn insert(&mut self, drawn: DrawnGeometry, now: DateTime<Utc>) -> Result<ShapeId, EditorError> {
        let id = free_id(self.next_id, |id| self.get(ShapeId(id)).is_some())?;
        let shape = Shape::new(ShapeId(id), drawn, now)?;
        self.add(shape)
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    fn get_mut(&mut self, id: ShapeId) -> Result<&mut Shape, EditorError> {
        self.shapes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(EditorError::UnknownShape(id))
    }

    /// Merge `patch` into the shape's attributes. Returns whether anything changed;
    /// `last_edited_at` is stamped only in that case.
    pub fn update_attributes(
        &mut self,
        id: ShapeId,
        patch: AttributePatch,
        now: DateTime<Utc>,
    ) -> Result<bool, EditorError> {
        let shape = self.get_mut(id)?;
        let merged = patch.merged(&shape.attributes);
        if merged == shape.attributes {
            return Ok(false);
        }
        shape.attributes = merged;
        shape.last_edited_at = Some(now);
        tracing::debug!(shape_id = %id, "Shape attributes updated");
        Ok(true)
    }

    /// Replace the shape's ring after a vertex edit. Returns whether it changed.
    ///
    /// A changed ring recomputes the area and drops any area override, which
    /// was entered against the old outline.
    pub fn update_ring(
        &mut self,
        id: ShapeId,
        drawn: DrawnGeometry,
        now: DateTime<Utc>,
    ) -> Result<bool, EditorError> {
        let shape = self.get_mut(id)?;
        if drawn.ring == shape.ring && drawn.radius == shape.radius {
            return Ok(false);
        }
        let computed_area = area_of(shape.kind, &drawn.ring)?;
        shape.ring = drawn.ring;
        shape.radius = drawn.radius;
        shape.computed_area = computed_area;
        if shape.attributes.area_override.take().is_some() {
            shape.last_edited_at = Some(now);
        }
        tracing::debug!(shape_id = %id, area = ?computed_area, "Shape geometry updated");
        Ok(true)
    }

    pub fn remove(&mut self, id: ShapeId) -> Result<Shape, EditorError> {
        let index = self
            .shapes
            .iter()
            .position(|s| s.id == id)
            .ok_or(EditorError::UnknownShape(id))?;
        tracing::debug!(shape_id = %id, "Shape removed");
        Ok(self.shapes.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// At least one shape carries a name or a type tag.
    pub fn has_annotated(&self) -> bool {
        self.shapes.iter().any(|s| s.attributes.is_annotated())
    }

    pub fn export_all(&self) -> FeatureCollection {
        FeatureCollection::new(self.shapes.iter().map(Shape::to_feature).collect())
    }

    /// Add every feature of `doc` as a shape. Areas are re-derived from the
    /// geometry and attributes normalized. Nothing is added unless the whole
    /// document is valid.
    pub fn import(&mut self, doc: &FeatureCollection) -> Result<Vec<ShapeId>, EditorError> {
        let mut staged: Vec<Shape> = Vec::with_capacity(doc.features.len());
        let mut next_id = self.next_id;

        for (index, feature) in doc.features.iter().enumerate() {
            let ring = feature.checked_ring(index)?;
            let kind = feature.properties.shape_kind;
            let computed_area = if kind.is_areal() {
                Some(geometry::area(&ring).map_err(|source| InterchangeError::Geometry { index, source })?)
            } else {
                None
            };

            let taken = |id: u64| self.get(ShapeId(id)).is_some() || staged.iter().any(|s| s.id.0 == id);
            let id = match feature.id {
                Some(id) if id != 0 && !taken(id) => id,
                _ => {
                    next_id = free_id(next_id, &taken)?;
                    next_id
                }
            };

            let props = &feature.properties;
            staged.push(Shape {
                id: ShapeId(id),
                kind,
                ring: if kind.is_closed() {
                    geometry::close_ring(&ring)
                } else {
                    ring
                },
                radius: props.radius,
                attributes: ShapeAttributes {
                    name: props.name.clone(),
                    type_tag: props.type_tag.clone(),
                    sub_type_tag: props.sub_type_tag.clone(),
                    area_override: props.area_override,
                }
                .normalized(),
                computed_area,
                created_at: props.created_at,
                last_edited_at: props.last_edited_at,
            });
        }

        let mut ids = Vec::with_capacity(staged.len());
        for shape in staged {
            ids.push(self.add(shape)?);
        }
        tracing::info!(count = ids.len(), "Imported shapes");
        Ok(ids)
    }
}
