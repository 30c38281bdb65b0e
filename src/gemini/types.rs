//! Gemini `generateContent` request and response types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Output token cap sent with every request.
pub const MAX_OUTPUT_TOKENS: u32 = 100;

/// Top-level `generateContent` request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

/// Gemini content container holding ordered parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// Untagged union of text and inline media content parts.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

/// Base64 inline payload used for image requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

/// Response envelope. Either `error` or `candidates` is expected; fields of an
/// unexpected shape read as absent instead of failing the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<ApiError>,
    #[serde(default, deserialize_with = "lenient")]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: Option<String>,
    /// Remaining fields such as `code` and `status`.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Candidate completion item returned by Gemini.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// A response part. Non-text parts deserialize with `text: None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_deref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Reads any JSON value, then keeps it only if it has the expected shape.
/// Syntax errors still propagate.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_ignores_unknown_fields() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"parts": [{"text": "hi"}], "role": "model"},
                    "finishReason": "STOP",
                    "index": 0
                }],
                "usageMetadata": {"promptTokenCount": 3},
                "modelVersion": "gemini-1.5-flash"
            }"#,
        )
        .unwrap();

        assert!(response.error.is_none());
        assert_eq!(response.first_text(), Some("hi"));
    }

    #[test]
    fn test_misshapen_fields_read_as_absent() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":{},"error":"oops"}"#).unwrap();
        assert!(response.candidates.is_none());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_error_keeps_details() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"error":{"code":500,"status":"INTERNAL"}}"#).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.message, None);
        assert_eq!(error.details.get("code"), Some(&Value::from(500)));
    }

    #[test]
    fn test_first_text_reads_only_first_part() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"inline_data":{}},{"text":"late"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text(), None);
    }
}
