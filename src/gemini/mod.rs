//! Gemini `generateContent` pipeline over a raw socket
//!
//! Payload building, hand-framed HTTP/1.1 transport, deadline-bounded
//! response reading, and reply extraction.

pub mod extract;
pub mod mock;
pub mod payload;
pub mod reader;
pub mod transport;
pub mod types;

pub use extract::extract_reply;
pub use mock::MockConnector;
pub use payload::{build_payload, PayloadLimits};
pub use reader::{ReadBudget, ReadEnd, RawResponse, ResponseHead, ResponseReader};
pub use transport::{Connector, Endpoint, PlainConnector, TlsConnector};
