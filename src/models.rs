//! Data models and structures
//!
//! Defines the prompt and reply types exchanged with the session driver,
//! and the environment-backed client configuration.

use std::fmt;

/// Reply text used when a response parses but carries no candidate text.
pub const NO_REPLY_TEXT: &str = "No reply found in JSON";

/// A single line of user input, with the trailing line ending removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Builds a prompt from a raw input line.
    ///
    /// Returns `None` when nothing but whitespace is left after trimming the
    /// trailing line ending.
    pub fn from_line(line: &str) -> Option<Self> {
        let trimmed = line.trim_end();
        if trimmed.trim_start().is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReply {
    /// API error, transport failure, or unparseable response.
    ErrorMessage(String),
    /// Text of the first candidate's first part.
    ReplyText(String),
    /// The response parsed but held no candidate text.
    NoReplyFound,
}

impl ParsedReply {
    pub fn is_reply(&self) -> bool {
        matches!(self, ParsedReply::ReplyText(_))
    }
}

impl fmt::Display for ParsedReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedReply::ErrorMessage(message) => f.write_str(message),
            ParsedReply::ReplyText(text) => f.write_str(text),
            ParsedReply::NoReplyFound => f.write_str(NO_REPLY_TEXT),
        }
    }
}

pub const DEFAULT_HOST: &str = "generativelanguage.googleapis.com";
pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub insecure_tls: bool,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        match dotenvy::dotenv() {
            Err(e) if !e.not_found() => return Err(e.into()),
            _ => {}
        }

        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| crate::Error::Config("GEMINI_API_KEY not set".to_string()))?;

        let port = match std::env::var("GEMINI_PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| crate::Error::Config(format!("Invalid GEMINI_PORT: {}", raw)))?,
            Err(_) => DEFAULT_PORT,
        };

        let insecure_tls = match std::env::var("GEMINI_INSECURE_TLS") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                crate::Error::Config(format!(
                    "Invalid GEMINI_INSECURE_TLS value (expected true|false): {}",
                    raw
                ))
            })?,
            Err(_) => false,
        };

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let model = model.strip_prefix("models/").unwrap_or(&model).to_string();

        Ok(Self {
            api_key,
            host: std::env::var("GEMINI_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port,
            model,
            insecure_tls,
        })
    }

    /// Request target for `generateContent`, including the API key.
    pub fn request_path(&self) -> String {
        format!(
            "/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        )
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}
