//! Error handling and custom error types
//!
//! Provides unified error handling across the client using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    OversizedPayload { size: usize, limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network unavailable: {0}")]
    Network(String),

    #[error("Image error: {0}")]
    Image(String),
}

pub type Result<T> = std::result::Result<T, Error>;
