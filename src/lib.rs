//! Line-oriented Gemini client over a raw TLS socket
//!
//! Turns one line of text, optionally with an inline image, into a single
//! hand-framed HTTPS request against the Gemini `generateContent` API and
//! extracts the reply text from whatever the server sends back.

pub mod error;
pub mod gemini;
pub mod image;
pub mod models;
pub mod network;
pub mod session;

pub use error::{Error, Result};
