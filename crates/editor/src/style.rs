//! Category-to-style mapping for drawn shapes.

use siteplan_shared::models::Vocabulary;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    pub color: &'static str,
    pub fill_opacity: f64,
    pub weight: f64,
}

/// Style for shapes without a type tag.
pub const UNTAGGED: ShapeStyle = ShapeStyle {
    color: "#3388ff",
    fill_opacity: 0.2,
    weight: 3.0,
};

const PALETTE: [&str; 8] = [
    "#e6194b", "#3cb44b", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#9a6324", "#469990",
];

/// FNV-1a, used to pick a stable color for tags missing from the vocabulary.
fn tag_hash(tag: &str) -> u64 {
    tag.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Style for a shape tagged `type_tag`.
///
/// Known tags are colored by their position in the vocabulary, so the legend
/// order matches the form's selector order.
pub fn style_for(type_tag: Option<&str>, vocabulary: &Vocabulary) -> ShapeStyle {
    let Some(tag) = type_tag.filter(|t| !t.trim().is_empty()) else {
        return UNTAGGED;
    };
    let slot = match vocabulary.index_of(tag) {
        Some(i) => i,
        None => (tag_hash(tag) % PALETTE.len() as u64) as usize,
    };
    ShapeStyle {
        color: PALETTE[slot % PALETTE.len()],
        fill_opacity: 0.35,
        weight: 2.0,
    }
}
