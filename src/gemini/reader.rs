//! Deadline-bounded response reader.
//!
//! The response is read in two phases. Header lines are collected until the
//! first empty line or until the header deadline (measured from connect)
//! passes. Body bytes are then accumulated until the peer closes, the body
//! deadline passes, the peer goes quiet for the idle gap, or the size cap is
//! reached. `Content-Length` and `Transfer-Encoding` are never consulted.

use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;

pub const DEFAULT_HEADER_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BODY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBudget {
    /// Time allowed from connect until the end of the headers.
    pub header_timeout: Duration,
    /// Time allowed for the body, starting when the headers end.
    pub body_timeout: Duration,
    /// Longest gap between body reads before the body is considered done.
    pub idle_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for ReadBudget {
    fn default() -> Self {
        Self {
            header_timeout: DEFAULT_HEADER_TIMEOUT,
            body_timeout: DEFAULT_BODY_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Why reading stopped. Informational only: every variant yields whatever
/// bytes were accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEnd {
    Closed,
    Deadline,
    Idle,
    Capped,
    Failed,
}

impl fmt::Display for ReadEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ReadEnd::Closed => "peer closed the connection",
            ReadEnd::Deadline => "deadline elapsed",
            ReadEnd::Idle => "no more bytes available",
            ReadEnd::Capped => "size cap reached",
            ReadEnd::Failed => "read error",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    /// Status line followed by header lines, line endings stripped.
    pub lines: Vec<String>,
    /// Whether the terminating empty line was seen.
    pub complete: bool,
}

impl ResponseHead {
    pub fn status_line(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    pub fn status_code(&self) -> Option<u16> {
        let mut tokens = self.status_line()?.split_whitespace();
        if !tokens.next()?.starts_with("HTTP/") {
            return None;
        }
        tokens.next()?.parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub head: ResponseHead,
    pub body: Vec<u8>,
    pub end: ReadEnd,
}

pub struct ResponseReader<'a, S: ?Sized> {
    stream: &'a mut S,
    budget: ReadBudget,
    connected_at: Instant,
    pending: Vec<u8>,
    end: Option<ReadEnd>,
}

impl<'a, S> ResponseReader<'a, S>
where
    S: AsyncRead + Unpin + ?Sized,
{
    pub fn new(stream: &'a mut S, budget: ReadBudget, connected_at: Instant) -> Self {
        Self {
            stream,
            budget,
            connected_at,
            pending: Vec::new(),
            end: None,
        }
    }

    /// Collects header lines. Bytes following the empty line stay buffered
    /// for [`read_body`](Self::read_body).
    pub async fn read_head(&mut self) -> ResponseHead {
        let deadline = self.connected_at + self.budget.header_timeout;
        let mut head = ResponseHead::default();

        loop {
            while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = self.pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches('\n').trim_end_matches('\r');

                if line.is_empty() {
                    tracing::debug!("End of headers");
                    head.complete = true;
                    return head;
                }

                tracing::debug!("Header: {}", line);
                head.lines.push(line.to_string());
            }

            if self.end.is_none() && self.pending.len() > self.budget.max_body_bytes {
                self.end = Some(ReadEnd::Capped);
            }

            if let Some(end) = self.end {
                tracing::warn!(
                    "Headers incomplete after {} lines: {}",
                    head.lines.len(),
                    end
                );
                self.pending.clear();
                return head;
            }

            self.fill(deadline, None).await;
        }
    }

    /// Accumulates body bytes until one of the stop conditions is met.
    pub async fn read_body(mut self) -> (Vec<u8>, ReadEnd) {
        let deadline = Instant::now() + self.budget.body_timeout;
        let max = self.budget.max_body_bytes;

        let end = loop {
            if let Some(end) = self.end {
                break end;
            }
            if self.pending.len() >= max {
                break ReadEnd::Capped;
            }
            self.fill(deadline, Some(self.budget.idle_timeout)).await;
        };

        if self.pending.len() > max {
            tracing::warn!(
                "Response body truncated from {} to {} bytes",
                self.pending.len(),
                max
            );
            self.pending.truncate(max);
        }

        tracing::debug!("Body read finished ({} bytes): {}", self.pending.len(), end);
        (self.pending, end)
    }

    /// Performs one read into `pending`, recording why reading must stop if it
    /// cannot continue.
    async fn fill(&mut self, deadline: Instant, idle: Option<Duration>) {
        let now = Instant::now();
        if now >= deadline {
            self.end = Some(ReadEnd::Deadline);
            return;
        }

        let wake = match idle {
            Some(idle) => deadline.min(now + idle),
            None => deadline,
        };

        let mut chunk = [0u8; READ_CHUNK];
        match tokio::time::timeout_at(wake, self.stream.read(&mut chunk)).await {
            Ok(Ok(0)) => self.end = Some(ReadEnd::Closed),
            Ok(Ok(n)) => self.pending.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) => {
                tracing::warn!("Read error, keeping {} bytes: {}", self.pending.len(), e);
                self.end = Some(ReadEnd::Failed);
            }
            Err(_) if wake < deadline => self.end = Some(ReadEnd::Idle),
            Err(_) => self.end = Some(ReadEnd::Deadline),
        }
    }
}

/// Reads a whole response in one call.
pub async fn read_response<S>(
    stream: &mut S,
    budget: ReadBudget,
    connected_at: Instant,
) -> RawResponse
where
    S: AsyncRead + Unpin + ?Sized,
{
    let mut reader = ResponseReader::new(stream, budget, connected_at);
    let head = reader.read_head().await;
    let (body, end) = reader.read_body().await;
    RawResponse { head, body, end }
}
