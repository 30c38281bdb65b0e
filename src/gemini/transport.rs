//! Socket transport for a single hand-framed HTTP/1.1 request.
//!
//! One connection carries one request. The request is written with an exact
//! `Content-Length` and `Connection: close`; the response side is consumed by
//! [`super::reader`] without trusting the server's framing.

use crate::models::Config;
use crate::{Error, Result};
use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Byte stream carrying one request/response exchange.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

pub type BoxedTransport = Box<dyn Transport>;

/// Opens a fresh transport per request.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<BoxedTransport>;
}

/// Where a request goes: socket address plus HTTP request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.host.clone(), config.port, config.request_path())
    }

    /// Request target with the `key` query parameter masked, for trace output.
    pub fn redacted_path(&self) -> String {
        match self.path.split_once('?') {
            Some((base, query)) => {
                let query = query
                    .split('&')
                    .map(|pair| {
                        if pair.starts_with("key=") {
                            "key=REDACTED"
                        } else {
                            pair
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("&");
                format!("{}?{}", base, query)
            }
            None => self.path.clone(),
        }
    }
}

/// Frames a POST with its JSON body.
pub fn frame_request(endpoint: &Endpoint, body: &[u8]) -> Vec<u8> {
    let head = format!(
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        endpoint.path,
        endpoint.host,
        body.len()
    );

    let mut request = Vec::with_capacity(head.len() + body.len());
    request.extend_from_slice(head.as_bytes());
    request.extend_from_slice(body);
    request
}

pub async fn send_request<W>(stream: &mut W, endpoint: &Endpoint, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    tracing::info!(
        "Sending HTTP POST {} ({} byte body)",
        endpoint.redacted_path(),
        body.len()
    );
    stream.write_all(&frame_request(endpoint, body)).await?;
    stream.flush().await?;
    Ok(())
}

/// Shuts the transport down. Errors are logged, not returned: the connection
/// is being discarded either way.
pub async fn release(mut stream: BoxedTransport) {
    if let Err(e) = stream.shutdown().await {
        tracing::debug!("Transport shutdown error (ignored): {}", e);
    }
}

async fn connect_tcp(endpoint: &Endpoint) -> Result<TcpStream> {
    let tcp = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|e| {
            Error::Connection(format!(
                "TCP connect to {}:{} failed: {}",
                endpoint.host, endpoint.port, e
            ))
        })?;
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

/// TLS over TCP. Certificates are verified against the webpki roots unless
/// the connector was built with `insecure = true`.
pub struct TlsConnector {
    connector: tokio_rustls::TlsConnector,
    connect_timeout: Duration,
}

impl TlsConnector {
    pub fn new(insecure: bool) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?;

        let config = if insecure {
            tracing::warn!("TLS certificate verification is DISABLED for this connector");
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
                .with_no_client_auth()
        } else {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            builder.with_root_certificates(roots).with_no_client_auth()
        };

        Ok(Self {
            connector: tokio_rustls::TlsConnector::from(Arc::new(config)),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector for TlsConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<BoxedTransport> {
        let server_name = ServerName::try_from(endpoint.host.clone())
            .map_err(|e| Error::Connection(format!("Invalid host {}: {}", endpoint.host, e)))?;

        let handshake = async {
            let tcp = connect_tcp(endpoint).await?;
            self.connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| Error::Connection(format!("TLS handshake failed: {}", e)))
        };

        let stream = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "connecting to {}:{} took longer than {:?}",
                    endpoint.host, endpoint.port, self.connect_timeout
                ))
            })??;

        Ok(Box::new(stream))
    }
}

/// Plain TCP, for local servers that do not speak TLS.
pub struct PlainConnector {
    connect_timeout: Duration,
}

impl PlainConnector {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Default for PlainConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for PlainConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<BoxedTransport> {
        let tcp = tokio::time::timeout(self.connect_timeout, connect_tcp(endpoint))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "connecting to {}:{} took longer than {:?}",
                    endpoint.host, endpoint.port, self.connect_timeout
                ))
            })??;
        Ok(Box::new(tcp))
    }
}

/// Skips certificate chain and hostname checks. Handshake signatures are
/// still verified so the session keys belong to whoever presented the cert.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
