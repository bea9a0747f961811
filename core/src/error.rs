//! Error taxonomy for outbound calls.
//!
//! # Design
//! `InvalidDescriptor` is raised locally by the builder and never reaches the
//! network. Every other variant is produced by the resolver and carries an
//! [`ErrorEnvelope`], the uniform record rendered to callers. `NotFound` is
//! split from other 4xx statuses because a missing resource is an expected
//! CRUD outcome while other client errors point at a caller bug.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CLIENT_ERROR_PREFIX: &str = "External API request failed: ";
pub const SERVER_ERROR_PREFIX: &str = "External API server error: ";
pub const UNREACHABLE_PREFIX: &str = "Unable to access external API: ";
pub const UNEXPECTED_PREFIX: &str = "An unexpected error occurred: ";

/// Uniform error record: `{status, error, message, timestamp, path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub path: String,
}

impl ErrorEnvelope {
    /// Build an envelope stamped with the current time. The reason phrase is
    /// the canonical one for `status`.
    pub fn new(status: u16, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            status,
            error: reason_phrase(status).to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            path: path.into(),
        }
    }

    /// True when both envelopes agree on everything but the timestamp.
    pub fn same_failure(&self, other: &ErrorEnvelope) -> bool {
        self.status == other.status
            && self.error == other.error
            && self.message == other.message
            && self.path == other.path
    }
}

/// Canonical reason phrase for a status code, `"Unknown"` when there is none.
pub fn reason_phrase(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// The operation descriptor is malformed; no request was sent.
    #[error("invalid operation descriptor: {0}")]
    InvalidDescriptor(String),

    /// Upstream answered 404.
    #[error("{}", .0.message)]
    NotFound(ErrorEnvelope),

    /// Upstream answered a 4xx other than 404.
    #[error("{}", .0.message)]
    ClientError(ErrorEnvelope),

    /// Upstream answered 5xx.
    #[error("{}", .0.message)]
    ServerError(ErrorEnvelope),

    /// No status was received: connection failure or read timeout.
    #[error("{}", .0.message)]
    Unreachable(ErrorEnvelope),

    #[error("{}", .0.message)]
    Unexpected(ErrorEnvelope),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>, path: &str) -> Self {
        ApiError::NotFound(ErrorEnvelope::new(404, message, path))
    }

    pub fn client_error(status: u16, detail: &str, path: &str) -> Self {
        ApiError::ClientError(ErrorEnvelope::new(
            status,
            format!("{CLIENT_ERROR_PREFIX}{detail}"),
            path,
        ))
    }

    pub fn server_error(status: u16, detail: &str, path: &str) -> Self {
        ApiError::ServerError(ErrorEnvelope::new(
            status,
            format!("{SERVER_ERROR_PREFIX}{detail}"),
            path,
        ))
    }

    pub fn unreachable(cause: &str, path: &str) -> Self {
        ApiError::Unreachable(ErrorEnvelope::new(
            503,
            format!("{UNREACHABLE_PREFIX}{cause}"),
            path,
        ))
    }

    pub fn unexpected(cause: &str, path: &str) -> Self {
        ApiError::Unexpected(ErrorEnvelope::new(
            500,
            format!("{UNEXPECTED_PREFIX}{cause}"),
            path,
        ))
    }

    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            ApiError::InvalidDescriptor(_) => None,
            ApiError::NotFound(e)
            | ApiError::ClientError(e)
            | ApiError::ServerError(e)
            | ApiError::Unreachable(e)
            | ApiError::Unexpected(e) => Some(e),
        }
    }

    /// Status to surface to the caller. Malformed descriptors map to 400.
    pub fn status(&self) -> u16 {
        self.envelope().map_or(400, |e| e.status)
    }

    /// Replace the envelope path, e.g. with the inbound request path.
    pub fn with_path(mut self, path: &str) -> Self {
        match &mut self {
            ApiError::InvalidDescriptor(_) => {}
            ApiError::NotFound(e)
            | ApiError::ClientError(e)
            | ApiError::ServerError(e)
            | ApiError::Unreachable(e)
            | ApiError::Unexpected(e) => e.path = path.to_string(),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_to_wire_shape() {
        let envelope = ErrorEnvelope::new(404, "gone", "/resources/1");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "Not Found");
        assert_eq!(json["message"], "gone");
        assert_eq!(json["path"], "/resources/1");
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn unknown_status_has_fallback_reason() {
        assert_eq!(reason_phrase(599), "Unknown");
        assert_eq!(reason_phrase(503), "Service Unavailable");
    }

    #[test]
    fn constructors_apply_prefixes() {
        let err = ApiError::client_error(400, "400 Bad Request", "/p");
        assert_eq!(err.to_string(), "External API request failed: 400 Bad Request");
        let err = ApiError::unreachable("timed out", "/p");
        assert_eq!(err.status(), 503);
        assert_eq!(err.envelope().unwrap().error, "Service Unavailable");
    }

    #[test]
    fn with_path_rewrites_envelope() {
        let err = ApiError::not_found("missing", "/posts/9").with_path("/resources/9");
        assert_eq!(err.envelope().unwrap().path, "/resources/9");
    }

    #[test]
    fn invalid_descriptor_has_no_envelope() {
        let err = ApiError::InvalidDescriptor("unbound placeholder {id}".to_string());
        assert!(err.envelope().is_none());
        assert_eq!(err.status(), 400);
    }
}
