//! Attribute Workflow: the modal form bound to one shape at a time.

use siteplan_shared::geometry;
use siteplan_shared::models::{ShapeAttributes, Vocabulary};

use crate::error::EditorError;
use crate::store::{AttributePatch, Shape, ShapeId};

/// Why the form was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOrigin {
    /// Right after the shape was drawn.
    Create,
    /// Requested from an existing shape's popup.
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Type,
    SubType,
    AreaOverride,
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormField::Name => write!(f, "Name"),
            FormField::Type => write!(f, "Type"),
            FormField::SubType => write!(f, "Sub-type"),
            FormField::AreaOverride => write!(f, "Area"),
        }
    }
}

/// Raw form inputs, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    pub name: String,
    pub type_tag: Option<String>,
    pub sub_type_tag: Option<String>,
    /// Area field text. Prefilled with the computed area.
    pub area: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingAttributeEdit {
    pub target: ShapeId,
    pub origin: FormOrigin,
    pub values: FormValues,
    /// Computed area, rounded for display.
    pub computed_area: Option<f64>,
    /// Override the shape already had when the form opened.
    pub current_override: Option<f64>,
    /// Field highlighted by the last failed save.
    pub invalid: Option<FormField>,
}

fn format_area(area: Option<f64>) -> String {
    area.map(|a| format!("{:.2}", geometry::round_area(a)))
        .unwrap_or_default()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// At most one open form.
#[derive(Debug, Default)]
pub struct AttributeWorkflow {
    pending: Option<PendingAttributeEdit>,
}

impl AttributeWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingAttributeEdit> {
        self.pending.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Open the form for a freshly drawn shape. Replaces any open form.
    pub fn open_create(&mut self, shape: &Shape) {
        self.open(PendingAttributeEdit {
            target: shape.id,
            origin: FormOrigin::Create,
            values: FormValues {
                area: format_area(shape.computed_area),
                ..FormValues::default()
            },
            computed_area: shape.computed_area.map(geometry::round_area),
            current_override: None,
            invalid: None,
        });
    }

    /// Open the form prefilled with the shape's current attributes.
    pub fn open_edit(&mut self, shape: &Shape) {
        let attrs = &shape.attributes;
        self.open(PendingAttributeEdit {
            target: shape.id,
            origin: FormOrigin::Edit,
            values: FormValues {
                name: attrs.name.clone(),
                type_tag: attrs.type_tag.clone(),
                sub_type_tag: attrs.sub_type_tag.clone(),
                area: format_area(shape.display_area()),
            },
            computed_area: shape.computed_area.map(geometry::round_area),
            current_override: attrs.area_override.map(geometry::round_area),
            invalid: None,
        });
    }

    fn open(&mut self, edit: PendingAttributeEdit) {
        if let Some(previous) = self.pending.replace(edit) {
            tracing::debug!(shape_id = %previous.target, "Replaced open attribute form");
        }
    }

    fn pending_mut(&mut self) -> Result<&mut PendingAttributeEdit, EditorError> {
        self.pending.as_mut().ok_or(EditorError::FormClosed)
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), EditorError> {
        let pending = self.pending_mut()?;
        pending.values.name = name.to_string();
        if pending.invalid == Some(FormField::Name) {
            pending.invalid = None;
        }
        Ok(())
    }

    /// Select a type. The sub-type is kept only if it is still valid beneath it.
    pub fn set_type(&mut self, type_tag: Option<&str>, vocabulary: &Vocabulary) -> Result<(), EditorError> {
        let pending = self.pending_mut()?;
        let type_tag = non_blank(type_tag.map(str::to_string));
        let keep_sub_type = match (&type_tag, &pending.values.sub_type_tag) {
            (Some(t), Some(sub)) => vocabulary.is_valid_sub_type(t, sub),
            _ => false,
        };
        if !keep_sub_type {
            pending.values.sub_type_tag = None;
        }
        pending.values.type_tag = type_tag;
        Ok(())
    }

    pub fn set_sub_type(&mut self, sub_type: Option<&str>) -> Result<(), EditorError> {
        let pending = self.pending_mut()?;
        if pending.values.type_tag.is_none() {
            return Err(EditorError::Validation {
                field: FormField::Type,
            });
        }
        pending.values.sub_type_tag = non_blank(sub_type.map(str::to_string));
        Ok(())
    }

    pub fn set_area(&mut self, text: &str) -> Result<(), EditorError> {
        let pending = self.pending_mut()?;
        pending.values.area = text.to_string();
        if pending.invalid == Some(FormField::AreaOverride) {
            pending.invalid = None;
        }
        Ok(())
    }

    /// The sub-type selector is usable only once a type is chosen.
    pub fn sub_type_enabled(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| p.values.type_tag.is_some())
    }

    pub fn sub_type_options<'v>(&self, vocabulary: &'v Vocabulary) -> &'v [String] {
        match self.pending.as_ref().and_then(|p| p.values.type_tag.as_deref()) {
            Some(tag) => vocabulary.sub_types(tag),
            None => &[],
        }
    }

    /// Validate and close the form, returning the patch to commit.
    ///
    /// On a validation error the form stays open with the field marked invalid.
    pub fn save(&mut self) -> Result<(ShapeId, AttributePatch), EditorError> {
        let pending = self.pending_mut()?;
        let name = pending.values.name.trim().to_string();
        if name.is_empty() {
            pending.invalid = Some(FormField::Name);
            return Err(EditorError::Validation {
                field: FormField::Name,
            });
        }

        let area_text = pending.values.area.trim();
        let entered = if area_text.is_empty() {
            None
        } else {
            match area_text.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Some(geometry::round_area(v)),
                _ => {
                    pending.invalid = Some(FormField::AreaOverride);
                    return Err(EditorError::Validation {
                        field: FormField::AreaOverride,
                    });
                }
            }
        };
        // Leaving the prefilled computed value alone is not an override,
        // unless the shape already carried that exact override
        let area_override = entered.filter(|v| {
            Some(*v) != pending.computed_area || Some(*v) == pending.current_override
        });

        let attrs = ShapeAttributes {
            name,
            type_tag: non_blank(pending.values.type_tag.clone()),
            sub_type_tag: non_blank(pending.values.sub_type_tag.clone()),
            area_override,
        };
        let target = pending.target;
        self.pending = None;
        Ok((target, AttributePatch::replace_with(attrs)))
    }

    /// Discard the form without touching the shape.
    pub fn cancel(&mut self) -> Option<PendingAttributeEdit> {
        self.pending.take()
    }

    /// Close the form if it is bound to `id`.
    pub fn close_if_target(&mut self, id: ShapeId) -> bool {
        if self.pending.as_ref().is_some_and(|p| p.target == id) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawnGeometry;
    use chrono::Utc;
    use siteplan_shared::models::{GeoPoint, ShapeKind, VocabularyEntry};

    fn vocab() -> Vocabulary {
        Vocabulary::new(vec![
            VocabularyEntry {
                type_tag: "Room".into(),
                sub_types: vec!["Bedroom".into(), "Kitchen".into(), "Storage".into()],
            },
            VocabularyEntry {
                type_tag: "Outbuilding".into(),
                sub_types: vec!["Shed".into(), "Storage".into()],
            },
            VocabularyEntry {
                type_tag: "Boundary".into(),
                sub_types: vec![],
            },
        ])
    }

    fn shape(id: u64) -> Shape {
        let drawn = DrawnGeometry::from_points(
            ShapeKind::Polygon,
            &[
                GeoPoint::new(51.5, -0.12),
                GeoPoint::new(51.5, -0.1198),
                GeoPoint::new(51.5002, -0.1198),
            ],
            None,
            64,
        )
        .unwrap();
        Shape::new(ShapeId(id), drawn, Utc::now()).unwrap()
    }

    #[test]
    fn test_create_prefills_area_only() {
        let mut form = AttributeWorkflow::new();
        let s = shape(1);
        form.open_create(&s);
        let pending = form.pending().unwrap();
        assert_eq!(pending.origin, FormOrigin::Create);
        assert!(pending.values.name.is_empty());
        assert_eq!(pending.values.type_tag, None);
        let shown: f64 = pending.values.area.parse().unwrap();
        assert!((shown - s.computed_area.unwrap()).abs() < 0.01);
    }

    #[test]
    fn test_edit_prefills_current_values() {
        let mut s = shape(1);
        s.attributes.name = "Bedroom 2".into();
        s.attributes.type_tag = Some("Room".into());
        s.attributes.area_override = Some(11.0);
        let mut form = AttributeWorkflow::new();
        form.open_edit(&s);
        let pending = form.pending().unwrap();
        assert_eq!(pending.origin, FormOrigin::Edit);
        assert_eq!(pending.values.name, "Bedroom 2");
        assert_eq!(pending.values.type_tag.as_deref(), Some("Room"));
        assert_eq!(pending.values.area, "11.00");
    }

    #[test]
    fn test_blank_name_blocks_save() {
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        form.set_name("   ").unwrap();
        let err = form.save().unwrap_err();
        assert!(matches!(
            err,
            EditorError::Validation {
                field: FormField::Name
            }
        ));
        assert!(form.is_open());
        assert_eq!(form.pending().unwrap().invalid, Some(FormField::Name));

        form.set_name("Kitchen").unwrap();
        assert_eq!(form.pending().unwrap().invalid, None);
        let (target, patch) = form.save().unwrap();
        assert_eq!(target, ShapeId(1));
        assert_eq!(patch.name.as_deref(), Some("Kitchen"));
        assert!(!form.is_open());
    }

    #[test]
    fn test_type_and_sub_type_optional() {
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        form.set_name("Plot").unwrap();
        let (_, patch) = form.save().unwrap();
        assert_eq!(patch.type_tag, Some(None));
        assert_eq!(patch.sub_type_tag, Some(None));
        assert_eq!(patch.area_override, Some(None));
    }

    #[test]
    fn test_sub_type_disabled_without_type() {
        let v = vocab();
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        assert!(!form.sub_type_enabled());
        assert!(form.sub_type_options(&v).is_empty());
        assert!(form.set_sub_type(Some("Bedroom")).is_err());

        form.set_type(Some("Room"), &v).unwrap();
        assert!(form.sub_type_enabled());
        assert_eq!(form.sub_type_options(&v).len(), 3);
        form.set_sub_type(Some("Bedroom")).unwrap();
    }

    #[test]
    fn test_type_change_resets_invalid_sub_type() {
        let v = vocab();
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        form.set_type(Some("Room"), &v).unwrap();
        form.set_sub_type(Some("Kitchen")).unwrap();
        form.set_type(Some("Outbuilding"), &v).unwrap();
        assert_eq!(form.pending().unwrap().values.sub_type_tag, None);
    }

    #[test]
    fn test_type_change_keeps_shared_sub_type() {
        let v = vocab();
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        form.set_type(Some("Room"), &v).unwrap();
        form.set_sub_type(Some("Storage")).unwrap();
        form.set_type(Some("Outbuilding"), &v).unwrap();
        assert_eq!(
            form.pending().unwrap().values.sub_type_tag.as_deref(),
            Some("Storage")
        );

        form.set_type(None, &v).unwrap();
        assert_eq!(form.pending().unwrap().values.sub_type_tag, None);
        assert!(!form.sub_type_enabled());
    }

    #[test]
    fn test_area_override() {
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        form.set_name("Garden").unwrap();
        form.set_area("abc").unwrap();
        assert!(matches!(
            form.save(),
            Err(EditorError::Validation {
                field: FormField::AreaOverride
            })
        ));
        form.set_area("42.5").unwrap();
        let (_, patch) = form.save().unwrap();
        assert_eq!(patch.area_override, Some(Some(42.5)));
    }

    #[test]
    fn test_prefilled_area_is_not_an_override() {
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        form.set_name("Garden").unwrap();
        let (_, patch) = form.save().unwrap();
        assert_eq!(patch.area_override, Some(None));
    }

    #[test]
    fn test_untouched_edit_reproduces_stored_attributes() {
        let mut s = shape(1);
        let computed = s.computed_area.map(geometry::round_area);
        s.attributes = ShapeAttributes {
            name: "Hall".into(),
            type_tag: Some("Room".into()),
            sub_type_tag: None,
            area_override: computed,
        };
        let mut form = AttributeWorkflow::new();
        form.open_edit(&s);
        let (_, patch) = form.save().unwrap();
        assert_eq!(patch, AttributePatch::replace_with(s.attributes.clone()));
    }

    #[test]
    fn test_opening_replaces_form() {
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        form.set_name("first").unwrap();
        form.open_edit(&shape(2));
        let pending = form.pending().unwrap();
        assert_eq!(pending.target, ShapeId(2));
        assert!(pending.values.name.is_empty());
    }

    #[test]
    fn test_cancel_and_close_if_target() {
        let mut form = AttributeWorkflow::new();
        form.open_create(&shape(1));
        assert!(form.cancel().is_some());
        assert!(!form.is_open());
        assert!(matches!(form.save(), Err(EditorError::FormClosed)));

        form.open_create(&shape(3));
        assert!(!form.close_if_target(ShapeId(4)));
        assert!(form.close_if_target(ShapeId(3)));
        assert!(!form.is_open());
    }
}
