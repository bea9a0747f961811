//! The seam between request building and response resolution.
//!
//! # Design
//! `Transport` executes one `HttpRequest` and reports either the response,
//! whatever its status, or a failure that happened before any status was
//! received. Status interpretation stays in the resolver. `UreqTransport` is
//! the production implementation; tests inject canned transports.

use std::fmt;
use std::io;

use crate::config::EndpointConfig;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// A failure that produced no HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("read timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Timeouts and connection failures both mean the upstream is unreachable.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Connect(_))
    }
}

pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a pooled `ureq` agent.
///
/// The read timeout bounds both waiting for the response head and reading
/// the body. The connect timeout is not applied.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(config: &EndpointConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_recv_response(Some(config.read_timeout))
            .timeout_recv_body(Some(config.read_timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = req.path.as_str();
        let body = req.body.as_deref().unwrap_or("").as_bytes();

        let result = match req.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &req.headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), &req.headers).call(),
            HttpMethod::Post => with_headers(self.agent.post(url), &req.headers).send(body),
            HttpMethod::Put => with_headers(self.agent.put(url), &req.headers).send(body),
            HttpMethod::Patch => with_headers(self.agent.patch(url), &req.headers).send(body),
        };
        let mut response = result.map_err(map_ureq_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(map_ureq_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(t) => TransportError::Timeout(t.to_string()),
        err @ (ureq::Error::HostNotFound | ureq::Error::ConnectionFailed) => {
            TransportError::Connect(err.to_string())
        }
        ureq::Error::Io(io_err) => map_io_error(io_err),
        other => TransportError::Other(other.to_string()),
    }
}

fn map_io_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout(err.to_string()),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::UnexpectedEof => TransportError::Connect(err.to_string()),
        _ => TransportError::Other(err.to_string()),
    }
}
