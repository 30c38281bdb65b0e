use super::transport::{BoxedTransport, Connector, Endpoint};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

const DUPLEX_CAPACITY: usize = 64 * 1024;

/// Builds a raw HTTP/1.1 response. With `chunked`, the body is sent as one
/// chunk followed by the terminating zero-length chunk.
pub fn http_response(status: &str, body: &str, chunked: bool) -> Vec<u8> {
    if chunked {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json; charset=UTF-8\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{}\r\n0\r\n\r\n",
            status,
            body.len(),
            body
        )
        .into_bytes()
    } else {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json; charset=UTF-8\r\nContent-Length: {}\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .into_bytes()
    }
}

/// In-memory peer that reads one request per connection and answers with
/// scripted bytes.
#[derive(Clone)]
pub struct MockConnector {
    responses: Arc<Mutex<Vec<Vec<u8>>>>,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
    call_count: Arc<Mutex<usize>>,
    fail_connect: bool,
    hold_open: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            fail_connect: false,
            hold_open: false,
        }
    }

    pub fn with_response(self, response: Vec<u8>) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_reply_text(self, text: &str) -> Self {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        });
        self.with_response(http_response("200 OK", &body.to_string(), true))
    }

    pub fn with_connect_failure(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Keeps the connection open after the response instead of closing it.
    pub fn with_hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Raw request bytes received so far, one entry per connection.
    pub fn captured_requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self, call: usize) -> Vec<u8> {
        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            http_response(
                "200 OK",
                r#"{"candidates":[{"content":{"parts":[{"text":"Mock reply"}]}}]}"#,
                false,
            )
        } else {
            responses[(call - 1) % responses.len()].clone()
        }
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<BoxedTransport> {
        let call = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };

        if self.fail_connect {
            return Err(Error::Connection(format!(
                "mock refused connection to {}:{}",
                endpoint.host, endpoint.port
            )));
        }

        let response = self.next_response(call);
        let requests = Arc::clone(&self.requests);
        let hold_open = self.hold_open;
        let (client, server) = tokio::io::duplex(DUPLEX_CAPACITY);

        tokio::spawn(async move {
            let (mut rd, mut wr) = tokio::io::split(server);
            let request = read_framed_request(&mut rd).await;
            requests.lock().unwrap().push(request);

            if wr.write_all(&response).await.is_err() {
                return;
            }
            if hold_open {
                std::future::pending::<()>().await;
            }
            let _ = wr.shutdown().await;
        });

        Ok(Box::new(client))
    }
}

/// Reads one request, using its `Content-Length` to find the end of the body.
pub(crate) async fn read_framed_request<R: AsyncRead + Unpin>(reader: &mut R) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(expected) = expected_request_len(&buf) {
            if buf.len() >= expected {
                return buf;
            }
        }
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => return buf,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

fn expected_request_len(buf: &[u8]) -> Option<usize> {
    let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let head = String::from_utf8_lossy(&buf[..head_end]);
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    Some(head_end + content_length)
}
