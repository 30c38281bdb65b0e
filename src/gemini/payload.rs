use super::types::{Content, GenerateContentRequest, GenerationConfig, InlineData, Part};
use crate::image::ImageAttachment;
use crate::models::Prompt;
use crate::{Error, Result};

/// Default ceiling on the serialized request body.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 512 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct PayloadLimits {
    pub max_bytes: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// Assembles the request document. The text part is always first; the image
/// part, when present, always second.
pub fn build_request(prompt: &Prompt, image: Option<&ImageAttachment>) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: prompt.as_str().to_string(),
    }];

    if let Some(image) = image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type().to_string(),
                data: image.data().to_string(),
            },
        });
    }

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig::default(),
    }
}

/// Serializes the request body, failing when it exceeds `limits.max_bytes`.
pub fn build_payload(
    prompt: &Prompt,
    image: Option<&ImageAttachment>,
    limits: PayloadLimits,
) -> Result<Vec<u8>> {
    let request = build_request(prompt, image);
    let body = serde_json::to_vec(&request)?;

    if body.len() > limits.max_bytes {
        return Err(Error::OversizedPayload {
            size: body.len(),
            limit: limits.max_bytes,
        });
    }

    tracing::debug!(
        "Built payload ({} bytes, {} parts)",
        body.len(),
        request.contents[0].parts.len()
    );
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn prompt(text: &str) -> Prompt {
        Prompt::from_line(text).unwrap()
    }

    #[test]
    fn test_text_only_payload_shape() {
        let body = build_payload(&prompt("Hello there"), None, PayloadLimits::default()).unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(
            value,
            json!({
                "contents": [{ "parts": [{ "text": "Hello there" }] }],
                "generationConfig": { "maxOutputTokens": 100 }
            })
        );
    }

    #[test]
    fn test_special_characters_round_trip() {
        let prompts = [
            r#"say "hi" to me"#,
            r"C:\path\to\file",
            "tab\there and bell\u{7} and nul\u{0}",
            "unicode ✓ and emoji 🦀",
            "}]{\"contents\":[]} injection",
        ];

        for text in prompts {
            let body = build_payload(&prompt(text), None, PayloadLimits::default()).unwrap();
            let value: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(value["contents"][0]["parts"][0]["text"], text);
        }
    }

    #[test]
    fn test_image_part_follows_text_part() {
        let image = ImageAttachment::new("image/jpeg", "QUJD");
        let body = build_payload(&prompt("describe"), Some(&image), PayloadLimits::default())
            .unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();

        let parts = value["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], json!({ "text": "describe" }));
        assert_eq!(
            parts[1],
            json!({ "inline_data": { "mime_type": "image/jpeg", "data": "QUJD" } })
        );
    }

    #[test]
    fn test_image_data_passed_through_unmodified() {
        let image = ImageAttachment::new("image/jpeg", "not*valid*base64==");
        let request = build_request(&prompt("x"), Some(&image));

        match &request.contents[0].parts[1] {
            Part::InlineData { inline_data } => assert_eq!(inline_data.data, "not*valid*base64=="),
            other => panic!("expected inline data, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let limits = PayloadLimits { max_bytes: 64 };
        let long = "a".repeat(100);

        let err = build_payload(&prompt(&long), None, limits).unwrap_err();
        match err {
            Error::OversizedPayload { size, limit } => {
                assert!(size > 100);
                assert_eq!(limit, 64);
            }
            other => panic!("expected OversizedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_payload_at_exact_limit_is_accepted() {
        let exact = build_payload(&prompt("abc"), None, PayloadLimits::default())
            .unwrap()
            .len();
        let limits = PayloadLimits { max_bytes: exact };

        assert!(build_payload(&prompt("abc"), None, limits).is_ok());
        assert!(build_payload(&prompt("abcd"), None, limits).is_err());
    }
}
