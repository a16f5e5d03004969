use siteplan_shared::models::{Vocabulary, VocabularyEntry};
use std::path::Path;

pub struct Assets {
    pub vocabulary: Vocabulary,
}

impl Assets {
    pub fn load(assets_dir: &Path) -> Result<Self, String> {
        let vocabulary_path = assets_dir.join("vocabulary.json");

        let vocabulary_data = std::fs::read_to_string(&vocabulary_path)
            .map_err(|e| format!("Failed to read {}: {}", vocabulary_path.display(), e))?;
        let entries: Vec<VocabularyEntry> = serde_json::from_str(&vocabulary_data)
            .map_err(|e| format!("Failed to parse vocabulary.json: {}", e))?;

        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = entries.iter().find(|e| !seen.insert(e.type_tag.as_str())) {
            return Err(format!("Duplicate type tag in vocabulary.json: {}", dup.type_tag));
        }

        tracing::info!(type_tags = entries.len(), "Loaded tag vocabulary");

        Ok(Assets {
            vocabulary: Vocabulary::new(entries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir_with_vocabulary(json: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vocabulary.json"), json).unwrap();
        dir
    }

    #[test]
    fn test_load_vocabulary() {
        let dir = dir_with_vocabulary(
            r#"[{"typeTag": "Room", "subTypes": ["Kitchen"]}, {"typeTag": "Tree"}]"#,
        );
        let assets = Assets::load(dir.path()).unwrap();
        assert_eq!(assets.vocabulary.index_of("Tree"), Some(1));
        assert!(assets.vocabulary.sub_types("Tree").is_empty());
        assert!(assets.vocabulary.is_valid_sub_type("Room", "Kitchen"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Assets::load(dir.path()).err().unwrap();
        assert!(err.contains("vocabulary.json"));
    }

    #[test]
    fn test_duplicate_type_tag_is_rejected() {
        let dir = dir_with_vocabulary(r#"[{"typeTag": "Room"}, {"typeTag": "Room"}]"#);
        let err = Assets::load(dir.path()).err().unwrap();
        assert!(err.contains("Duplicate"));
    }

    #[test]
    fn test_shipped_vocabulary_parses() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets");
        let assets = Assets::load(&root).unwrap();
        assert!(assets.vocabulary.index_of("Room").is_some());
    }
}
