use std::sync::Arc;

use async_graphql::{Context, InputObject, Object, SimpleObject, ID};
use siteplan_shared::interchange::FeatureCollection;
use siteplan_shared::models::{self, VocabularyEntry};

use crate::assets::Assets;
use crate::storage::Storage;

// GraphQL output types

#[derive(SimpleObject)]
pub struct GqlVocabularyEntry {
    pub type_tag: String,
    pub sub_types: Vec<String>,
}

impl From<&VocabularyEntry> for GqlVocabularyEntry {
    fn from(e: &VocabularyEntry) -> Self {
        GqlVocabularyEntry {
            type_tag: e.type_tag.clone(),
            sub_types: e.sub_types.clone(),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlAnnotationSet {
    pub id: ID,
    pub name: String,
    pub feature_count: u32,
    pub created_at: String,
    /// The stored feature-collection document, as JSON.
    pub document: String,
}

impl From<models::AnnotationSet> for GqlAnnotationSet {
    fn from(s: models::AnnotationSet) -> Self {
        GqlAnnotationSet {
            id: ID(s.id.to_string()),
            name: s.name,
            feature_count: s.feature_count,
            created_at: s.created_at,
            document: s.document,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlStats {
    pub total_annotation_sets: u64,
    pub db_size_bytes: u64,
}

// Input types

#[derive(InputObject)]
pub struct SaveAnnotationsInput {
    pub name: String,
    pub document: String,
}

/// Parse and check an exported document; returns its feature count.
fn validate_document(json: &str) -> Result<u32, String> {
    let document = FeatureCollection::from_json(json).map_err(|e| e.to_string())?;
    if document.features.is_empty() {
        return Err("Document has no features".to_string());
    }
    for (index, feature) in document.features.iter().enumerate() {
        feature.checked_ring(index).map_err(|e| e.to_string())?;
    }
    u32::try_from(document.features.len()).map_err(|e| e.to_string())
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn vocabulary(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlVocabularyEntry>> {
        let assets = ctx.data::<Arc<Assets>>()?;
        Ok(assets
            .vocabulary
            .entries
            .iter()
            .map(GqlVocabularyEntry::from)
            .collect())
    }

    async fn annotation_set(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<GqlAnnotationSet>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        let set = storage.get(&id)?;
        Ok(set.map(GqlAnnotationSet::from))
    }

    async fn annotation_sets(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlAnnotationSet>> {
        let storage = ctx.data::<Arc<Storage>>()?;
        Ok(storage
            .list()?
            .into_iter()
            .map(GqlAnnotationSet::from)
            .collect())
    }

    async fn stats(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlStats> {
        let storage = ctx.data::<Arc<Storage>>()?;
        Ok(GqlStats {
            total_annotation_sets: storage.count()?,
            db_size_bytes: storage.db_size_bytes()?,
        })
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn save_annotations(
        &self,
        ctx: &Context<'_>,
        input: SaveAnnotationsInput,
    ) -> async_graphql::Result<GqlAnnotationSet> {
        let storage = ctx.data::<Arc<Storage>>()?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(async_graphql::Error::new("Name is required"));
        }
        let feature_count = validate_document(&input.document).map_err(|reason| {
            tracing::debug!(%reason, "Rejected annotation document");
            async_graphql::Error::new(format!("Invalid document: {reason}"))
        })?;

        let set = models::AnnotationSet {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            document: input.document,
            feature_count,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        storage.save(&set)?;
        tracing::info!(id = %set.id, features = feature_count, "Annotation set saved");

        Ok(GqlAnnotationSet::from(set))
    }

    async fn delete_annotation_set(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let storage = ctx.data::<Arc<Storage>>()?;
        Ok(storage.delete(&id)?)
    }
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(assets: Arc<Assets>, storage: Arc<Storage>) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(assets)
        .data(storage)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteplan_shared::models::Vocabulary;

    const MARKER_DOC: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature",
        "geometry":{"type":"Point","coordinates":[-0.1,51.5]},
        "properties":{"name":"Gate","typeTag":"Access","subTypeTag":null,
        "computedArea":null,"shapeKind":"marker","createdAt":"2026-10-18T09:00:00Z"}}]}"#;

    fn schema() -> (tempfile::TempDir, Schema) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("test.redb")).unwrap();
        let assets = Arc::new(Assets {
            vocabulary: Vocabulary::new(vec![VocabularyEntry {
                type_tag: "Access".to_string(),
                sub_types: vec!["Gate".to_string()],
            }]),
        });
        (dir, build_schema(assets, storage))
    }

    fn save_request(name: &str, document: &str) -> async_graphql::Request {
        async_graphql::Request::new(
            "mutation Save($input: SaveAnnotationsInput!) {
                saveAnnotations(input: $input) { id name featureCount }
            }",
        )
        .variables(async_graphql::Variables::from_json(serde_json::json!({
            "input": { "name": name, "document": document }
        })))
    }

    #[tokio::test]
    async fn test_vocabulary_query() {
        let (_dir, schema) = schema();
        let resp = schema.execute("{ vocabulary { typeTag subTypes } }").await;
        assert!(resp.errors.is_empty(), "{:?}", resp.errors);
        let data = resp.data.into_json().unwrap();
        assert_eq!(data["vocabulary"][0]["typeTag"], "Access");
        assert_eq!(data["vocabulary"][0]["subTypes"][0], "Gate");
    }

    #[tokio::test]
    async fn test_save_then_fetch_annotation_set() {
        let (_dir, schema) = schema();
        let resp = schema.execute(save_request(" Plot 4 ", MARKER_DOC)).await;
        assert!(resp.errors.is_empty(), "{:?}", resp.errors);
        let data = resp.data.into_json().unwrap();
        assert_eq!(data["saveAnnotations"]["name"], "Plot 4");
        assert_eq!(data["saveAnnotations"]["featureCount"], 1);
        let id = data["saveAnnotations"]["id"].as_str().unwrap().to_string();

        let query = format!(r#"{{ annotationSet(id: "{id}") {{ name document }} }}"#);
        let data = schema.execute(query).await.data.into_json().unwrap();
        assert_eq!(data["annotationSet"]["name"], "Plot 4");
        let stored = data["annotationSet"]["document"].as_str().unwrap();
        assert_eq!(FeatureCollection::from_json(stored).unwrap().features.len(), 1);
    }

    #[tokio::test]
    async fn test_save_rejects_malformed_document() {
        let (_dir, schema) = schema();
        let resp = schema.execute(save_request("Plot", "{\"type\":\"Nope\"}")).await;
        assert_eq!(resp.errors.len(), 1);
        assert!(resp.errors[0].message.starts_with("Invalid document"));
    }

    #[tokio::test]
    async fn test_save_rejects_kind_mismatch() {
        let (_dir, schema) = schema();
        let doc = MARKER_DOC.replace(r#""shapeKind":"marker""#, r#""shapeKind":"polygon""#);
        let resp = schema.execute(save_request("Plot", &doc)).await;
        assert_eq!(resp.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_save_rejects_blank_name() {
        let (_dir, schema) = schema();
        let resp = schema.execute(save_request("   ", MARKER_DOC)).await;
        assert_eq!(resp.errors[0].message, "Name is required");
    }

    #[tokio::test]
    async fn test_missing_annotation_set_is_null() {
        let (_dir, schema) = schema();
        let data = schema
            .execute(r#"{ annotationSet(id: "nope") { name } }"#)
            .await
            .data
            .into_json()
            .unwrap();
        assert!(data["annotationSet"].is_null());
    }

    #[tokio::test]
    async fn test_delete_and_stats() {
        let (_dir, schema) = schema();
        let data = schema
            .execute(save_request("Plot", MARKER_DOC))
            .await
            .data
            .into_json()
            .unwrap();
        let id = data["saveAnnotations"]["id"].as_str().unwrap().to_string();

        let stats = schema
            .execute("{ stats { totalAnnotationSets dbSizeBytes } }")
            .await
            .data
            .into_json()
            .unwrap();
        assert_eq!(stats["stats"]["totalAnnotationSets"], 1);

        let mutation = format!(r#"mutation {{ deleteAnnotationSet(id: "{id}") }}"#);
        let data = schema.execute(mutation).await.data.into_json().unwrap();
        assert_eq!(data["deleteAnnotationSet"], true);

        let stats = schema
            .execute("{ stats { totalAnnotationSets } }")
            .await
            .data
            .into_json()
            .unwrap();
        assert_eq!(stats["stats"]["totalAnnotationSets"], 0);
    }

    #[test]
    fn test_validate_document_counts_features() {
        assert_eq!(validate_document(MARKER_DOC), Ok(1));
        assert!(validate_document(r#"{"type":"FeatureCollection","features":[]}"#).is_err());
    }
}
