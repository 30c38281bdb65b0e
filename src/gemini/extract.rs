//! Maps a raw response body to a [`ParsedReply`].
//!
//! The body is not de-chunked. Instead everything before the first `{` is
//! dropped, which removes a leading chunk-size line, and only the first JSON
//! value is parsed so a trailing terminating chunk is ignored. This is a
//! best-effort heuristic: a body split into several chunks will not parse.

use super::types::GenerateContentResponse;
use crate::models::ParsedReply;
use serde_json::Value;

/// Returns the body starting at the first `{`, or `None` if there is none.
pub fn locate_json(body: &[u8]) -> Option<&[u8]> {
    body.iter().position(|&b| b == b'{').map(|start| &body[start..])
}

pub fn extract_reply(body: &[u8]) -> ParsedReply {
    let Some(json) = locate_json(body) else {
        tracing::warn!("No JSON object in {} byte response body", body.len());
        return parse_error("no JSON object in response body");
    };

    let skipped = body.len() - json.len();
    if skipped > 0 {
        tracing::debug!("Skipped {} bytes of framing before JSON", skipped);
    }

    let response = match serde_json::Deserializer::from_slice(json)
        .into_iter::<GenerateContentResponse>()
        .next()
    {
        Some(Ok(response)) => response,
        Some(Err(e)) => {
            tracing::error!("JSON parse error: {}", e);
            return parse_error(&e.to_string());
        }
        None => return parse_error("empty response body"),
    };

    reply_from_response(&response)
}

/// Interprets a parsed `generateContent` response.
pub fn reply_from_response(response: &GenerateContentResponse) -> ParsedReply {
    if let Some(error) = &response.error {
        let message = error
            .message
            .clone()
            .unwrap_or_else(|| format!("API error: {}", Value::Object(error.details.clone())));
        tracing::warn!("Gemini API returned an error: {}", message);
        return ParsedReply::ErrorMessage(message);
    }

    let Some(candidates) = &response.candidates else {
        tracing::warn!("No candidates array found in JSON response");
        return ParsedReply::NoReplyFound;
    };

    match response.first_text() {
        Some(text) => {
            tracing::info!("Parsed Gemini reply successfully");
            ParsedReply::ReplyText(text.to_string())
        }
        None => {
            tracing::warn!(
                "Candidates array ({} entries) holds no reply text",
                candidates.len()
            );
            ParsedReply::NoReplyFound
        }
    }
}

fn parse_error(diagnostic: &str) -> ParsedReply {
    ParsedReply::ErrorMessage(format!("Parse error: {}", diagnostic))
}
