//! Session driver: one prompt in, one reply out.
//!
//! Each call to [`Session::ask`] walks the request through
//! Connecting → Sending → AwaitingHeaders → ReadingBody → Parsing → Done and
//! returns to Idle. Every failure becomes a [`ParsedReply`]; the transport is
//! released on every path.

use crate::gemini::reader::ResponseReader;
use crate::gemini::transport::{release, send_request};
use crate::gemini::{
    build_payload, extract_reply, Connector, Endpoint, PayloadLimits, ReadBudget, TlsConnector,
};
use crate::image::ImageAttachment;
use crate::models::{Config, ParsedReply, Prompt};
use crate::Result;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Reply given when the transport cannot be established or written to.
pub const CONNECTION_FAILED: &str = "Connection failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Sending,
    AwaitingHeaders,
    ReadingBody,
    Parsing,
    Done,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub image: Option<ImageAttachment>,
    pub payload_limits: PayloadLimits,
    pub read_budget: ReadBudget,
}

pub struct Session {
    connector: Box<dyn Connector>,
    endpoint: Endpoint,
    image: Option<ImageAttachment>,
    payload_limits: PayloadLimits,
    read_budget: ReadBudget,
    state: SessionState,
    cycle: Vec<SessionState>,
}

impl Session {
    /// Build a session around any connector. Tests and local harnesses use
    /// this to inject a mock or plain-TCP connector.
    pub fn with_connector(
        connector: Box<dyn Connector>,
        endpoint: Endpoint,
        options: SessionOptions,
    ) -> Self {
        Self {
            connector,
            endpoint,
            image: options.image,
            payload_limits: options.payload_limits,
            read_budget: options.read_budget,
            state: SessionState::Idle,
            cycle: Vec::new(),
        }
    }

    /// Construct a TLS session from environment configuration.
    pub fn from_config(config: &Config, options: SessionOptions) -> Result<Self> {
        let connector = TlsConnector::new(config.insecure_tls)?;
        info!(
            "Gemini endpoint: {}:{} (model: {})",
            config.host, config.port, config.model
        );
        Ok(Self::with_connector(
            Box::new(connector),
            Endpoint::from_config(config),
            options,
        ))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// States entered during the most recent [`Session::ask`], in order.
    pub fn last_cycle(&self) -> &[SessionState] {
        &self.cycle
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    /// Send one prompt and wait for its reply.
    pub async fn ask(&mut self, prompt: &Prompt) -> ParsedReply {
        self.cycle.clear();
        let reply = self.run_cycle(prompt).await;
        self.transition(SessionState::Done);
        self.transition(SessionState::Idle);
        reply
    }

    async fn run_cycle(&mut self, prompt: &Prompt) -> ParsedReply {
        let body = match build_payload(prompt, self.image.as_ref(), self.payload_limits) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to build payload: {}", e);
                return ParsedReply::ErrorMessage(e.to_string());
            }
        };
        debug!("Payload: {}", String::from_utf8_lossy(&body));

        self.transition(SessionState::Connecting);
        info!(
            "Attempting connection to {}:{}",
            self.endpoint.host, self.endpoint.port
        );
        let mut stream = match self.connector.connect(&self.endpoint).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Connection to Gemini server failed: {}", e);
                return ParsedReply::ErrorMessage(CONNECTION_FAILED.to_string());
            }
        };
        let connected_at = Instant::now();
        info!("Connected to Gemini server");

        self.transition(SessionState::Sending);
        if let Err(e) = send_request(&mut stream, &self.endpoint, &body).await {
            error!("Failed to send request: {}", e);
            release(stream).await;
            return ParsedReply::ErrorMessage(CONNECTION_FAILED.to_string());
        }

        self.transition(SessionState::AwaitingHeaders);
        info!("Request sent. Waiting for response headers");
        let mut reader = ResponseReader::new(&mut stream, self.read_budget, connected_at);
        let head = reader.read_head().await;
        match head.status_code() {
            Some(status) if (200..300).contains(&status) => info!("Response status: {}", status),
            Some(status) => warn!("Response status: {}", status),
            None => warn!("No HTTP status line received"),
        }

        self.transition(SessionState::ReadingBody);
        let (raw_body, end) = reader.read_body().await;
        release(stream).await;
        info!("Read {} byte response body ({})", raw_body.len(), end);
        debug!("Raw response: {}", String::from_utf8_lossy(&raw_body));

        self.transition(SessionState::Parsing);
        extract_reply(&raw_body)
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session state: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.cycle.push(next);
    }
}
