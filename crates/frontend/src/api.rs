use serde::{Deserialize, Serialize};
use siteplan_editor::host::Geocoder;
use siteplan_shared::interchange::FeatureCollection;
use siteplan_shared::models::{GeoPoint, Vocabulary, VocabularyEntry};

const POSTCODES_API: &str = "https://api.postcodes.io/postcodes";

/// Build the variables JSON for a save annotations mutation.
pub fn build_save_variables(name: &str, document: &str) -> serde_json::Value {
    let name = name.trim();
    serde_json::json!({
        "input": {
            "name": if name.is_empty() { "Untitled site plan" } else { name },
            "document": document
        }
    })
}

/// Lookup URL for a postcode. Whitespace is dropped and letters uppercased.
pub fn postcode_url(postcode: &str) -> Option<String> {
    let compact: String = postcode
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if compact.is_empty() || !compact.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!("{POSTCODES_API}/{compact}"))
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

fn api_url() -> Result<String, String> {
    let origin = web_sys::window()
        .ok_or("no window")?
        .location()
        .origin()
        .map_err(|_| "no origin".to_string())?;
    Ok(format!("{}/graphql", origin))
}

async fn query<T: for<'de> Deserialize<'de>>(
    query_str: &str,
    variables: Option<serde_json::Value>,
) -> Result<T, String> {
    let req = GraphQLRequest {
        query: query_str.to_string(),
        variables,
    };

    let resp = reqwest::Client::new()
        .post(api_url()?)
        .json(&req)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let gql_resp: GraphQLResponse<T> = resp.json().await.map_err(|e| e.to_string())?;

    if let Some(errors) = gql_resp.errors {
        if !errors.is_empty() {
            return Err(errors[0].message.clone());
        }
    }

    gql_resp.data.ok_or_else(|| "No data returned".to_string())
}

// Types mirroring the GraphQL schema

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSetData {
    pub id: String,
    pub name: String,
    pub feature_count: u32,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct VocabularyResponse {
    pub vocabulary: Vec<VocabularyEntry>,
}

pub async fn fetch_vocabulary() -> Result<Vocabulary, String> {
    let resp: VocabularyResponse =
        query(r#"query { vocabulary { typeTag subTypes } }"#, None).await?;
    Ok(Vocabulary::new(resp.vocabulary))
}

#[derive(Deserialize)]
pub struct SaveAnnotationsResponse {
    #[serde(rename = "saveAnnotations")]
    pub save_annotations: AnnotationSetData,
}

pub async fn save_annotations(
    name: &str,
    document: &FeatureCollection,
) -> Result<AnnotationSetData, String> {
    let json = document.to_json().map_err(|e| e.to_string())?;
    let resp: SaveAnnotationsResponse = query(
        r#"mutation SaveAnnotations($input: SaveAnnotationsInput!) {
            saveAnnotations(input: $input) { id name featureCount createdAt }
        }"#,
        Some(build_save_variables(name, &json)),
    )
    .await?;
    Ok(resp.save_annotations)
}

// Postcode lookup

#[derive(Debug, Clone, Deserialize)]
pub struct PostcodeResponse {
    pub status: u16,
    pub result: Option<PostcodeResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostcodeResult {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PostcodeResponse {
    pub fn into_point(self) -> Result<GeoPoint, String> {
        if self.status != 200 {
            return Err(self
                .error
                .unwrap_or_else(|| format!("lookup failed with status {}", self.status)));
        }
        match self.result {
            Some(PostcodeResult {
                latitude: Some(lat),
                longitude: Some(lon),
            }) => Ok(GeoPoint::new(lat, lon)),
            _ => Err("postcode has no coordinates".to_string()),
        }
    }
}

/// Geocodes UK postcodes through postcodes.io.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostcodesGeocoder;

impl Geocoder for PostcodesGeocoder {
    async fn locate(&self, postcode: &str) -> Result<GeoPoint, String> {
        let url = postcode_url(postcode).ok_or_else(|| format!("invalid postcode {postcode:?}"))?;
        let resp = reqwest::Client::new()
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let body: PostcodeResponse = resp.json().await.map_err(|e| e.to_string())?;
        body.into_point()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_request_serializes_with_variables() {
        let req = GraphQLRequest {
            query: "query { vocabulary { typeTag } }".to_string(),
            variables: Some(serde_json::json!({"id": "abc"})),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["variables"]["id"], "abc");
    }

    #[test]
    fn test_graphql_request_omits_null_variables() {
        let req = GraphQLRequest {
            query: "query { stats { count } }".to_string(),
            variables: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("variables"));
    }

    #[test]
    fn test_vocabulary_response_deserializes() {
        let json = r#"{"vocabulary": [
            {"typeTag": "Room", "subTypes": ["Kitchen", "Bedroom"]},
            {"typeTag": "Boundary", "subTypes": []}
        ]}"#;
        let resp: VocabularyResponse = serde_json::from_str(json).unwrap();
        let vocab = Vocabulary::new(resp.vocabulary);
        assert_eq!(vocab.index_of("Boundary"), Some(1));
        assert_eq!(vocab.sub_types("Room").len(), 2);
    }

    #[test]
    fn test_save_response_deserializes() {
        let json = r#"{"saveAnnotations": {
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "name": "Plot 4",
            "featureCount": 3,
            "createdAt": "2026-10-18T09:00:00Z"
        }}"#;
        let resp: SaveAnnotationsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.save_annotations.name, "Plot 4");
        assert_eq!(resp.save_annotations.feature_count, 3);
    }

    #[test]
    fn test_graphql_error_response() {
        let json = r#"{"data": null, "errors": [{"message": "Invalid document"}]}"#;
        let resp: GraphQLResponse<SaveAnnotationsResponse> = serde_json::from_str(json).unwrap();
        assert!(resp.data.is_none());
        assert_eq!(resp.errors.unwrap()[0].message, "Invalid document");
    }

    #[test]
    fn test_build_save_variables() {
        let vars = build_save_variables("  Plot 4 ", r#"{"type":"FeatureCollection","features":[]}"#);
        assert_eq!(vars["input"]["name"], "Plot 4");
        assert!(vars["input"]["document"]
            .as_str()
            .unwrap()
            .contains("FeatureCollection"));
    }

    #[test]
    fn test_build_save_variables_blank_name() {
        let vars = build_save_variables("   ", "{}");
        assert_eq!(vars["input"]["name"], "Untitled site plan");
    }

    #[test]
    fn test_postcode_url() {
        assert_eq!(
            postcode_url(" sw1a 1aa ").as_deref(),
            Some("https://api.postcodes.io/postcodes/SW1A1AA")
        );
        assert_eq!(postcode_url("   "), None);
        assert_eq!(postcode_url("SW1A/1AA"), None);
    }

    #[test]
    fn test_postcode_response_into_point() {
        let json = r#"{"status": 200, "result": {"postcode": "SW1A 1AA", "latitude": 51.501009, "longitude": -0.141588}}"#;
        let resp: PostcodeResponse = serde_json::from_str(json).unwrap();
        let p = resp.into_point().unwrap();
        assert!((p.latitude - 51.501009).abs() < 1e-9);
        assert!((p.longitude + 0.141588).abs() < 1e-9);
    }

    #[test]
    fn test_postcode_response_not_found() {
        let json = r#"{"status": 404, "error": "Postcode not found"}"#;
        let resp: PostcodeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.into_point().unwrap_err(), "Postcode not found");
    }

    #[test]
    fn test_postcode_response_without_coordinates() {
        // Some postcodes (e.g. PO boxes) have no grid reference
        let json = r#"{"status": 200, "result": {"latitude": null, "longitude": null}}"#;
        let resp: PostcodeResponse = serde_json::from_str(json).unwrap();
        assert!(resp.into_point().is_err());
    }
}
