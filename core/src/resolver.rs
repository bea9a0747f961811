//! Maps the outcome of one outbound call to a value or an `ApiError`.
//!
//! # Design
//! Each outcome transitions exactly once; there is no retry. Resolution
//! order is: transport failure, caller-registered status handlers in order,
//! then the default table:
//!
//! | outcome                      | result                      |
//! |------------------------------|-----------------------------|
//! | 2xx                          | decoded body (or `()`)      |
//! | 404                          | `NotFound`                  |
//! | other 4xx                    | `ClientError`               |
//! | 5xx                          | `ServerError`               |
//! | timeout / connection failure | `Unreachable` (503)         |
//! | anything else                | `Unexpected` (500)          |
//!
//! `exchange` bypasses the table and hands back the raw response.

use serde::de::DeserializeOwned;

use crate::error::{reason_phrase, ApiError};
use crate::http::HttpResponse;
use crate::transport::TransportError;

/// What the transport reported for a single call.
pub type Outcome = Result<HttpResponse, TransportError>;

type Predicate = Box<dyn Fn(u16) -> bool + Send + Sync>;
type Handler<T> = Box<dyn Fn(&HttpResponse, &str) -> Result<T, ApiError> + Send + Sync>;

/// Ordered `(predicate, handler)` pairs evaluated before the default table.
/// The first predicate matching the status wins and its handler's result is
/// final.
pub struct StatusHandlers<T> {
    entries: Vec<(Predicate, Handler<T>)>,
}

impl<T> StatusHandlers<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn on_status<P, H>(mut self, predicate: P, handler: H) -> Self
    where
        P: Fn(u16) -> bool + Send + Sync + 'static,
        H: Fn(&HttpResponse, &str) -> Result<T, ApiError> + Send + Sync + 'static,
    {
        self.entries.push((Box::new(predicate), Box::new(handler)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn intercept(&self, response: &HttpResponse, path: &str) -> Option<Result<T, ApiError>> {
        self.entries
            .iter()
            .find(|(predicate, _)| predicate(response.status))
            .map(|(_, handler)| handler(response, path))
    }
}

impl<T> Default for StatusHandlers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve an outcome whose 2xx body decodes into `T`.
pub fn resolve<T: DeserializeOwned>(outcome: Outcome, path: &str) -> Result<T, ApiError> {
    resolve_with(outcome, path, &StatusHandlers::new())
}

/// Like [`resolve`], consulting `handlers` before the default table.
pub fn resolve_with<T: DeserializeOwned>(
    outcome: Outcome,
    path: &str,
    handlers: &StatusHandlers<T>,
) -> Result<T, ApiError> {
    let response = outcome.map_err(|e| transport_failure(e, path))?;
    if let Some(result) = handlers.intercept(&response, path) {
        return result;
    }
    check_status(&response, path)?;
    serde_json::from_str(&response.body).map_err(|e| {
        tracing::error!(path, error = %e, "failed to decode upstream response");
        ApiError::unexpected(&format!("failed to decode response body: {e}"), path)
    })
}

/// Resolve an outcome where success carries no value, e.g. a delete.
pub fn resolve_empty(outcome: Outcome, path: &str) -> Result<(), ApiError> {
    let response = outcome.map_err(|e| transport_failure(e, path))?;
    check_status(&response, path)
}

/// Raw exchange: any status is returned as-is. Only transport failures
/// become errors.
pub fn exchange(outcome: Outcome, path: &str) -> Result<HttpResponse, ApiError> {
    outcome.map_err(|e| transport_failure(e, path))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, path: &str) -> Result<(), ApiError> {
    let status = response.status;
    match status {
        200..=299 => Ok(()),
        404 => {
            tracing::warn!(path, "upstream resource not found");
            Err(ApiError::not_found(
                format!("External API resource not found: {path}"),
                path,
            ))
        }
        400..=499 => {
            tracing::error!(status, path, "upstream client error");
            Err(ApiError::client_error(status, &status_detail(response), path))
        }
        500..=599 => {
            tracing::error!(status, path, "upstream server error");
            Err(ApiError::server_error(status, &status_detail(response), path))
        }
        _ => {
            tracing::error!(status, path, "unexpected upstream status");
            Err(ApiError::unexpected(&format!("unexpected status {}", status_detail(response)), path))
        }
    }
}

fn transport_failure(err: TransportError, path: &str) -> ApiError {
    tracing::error!(path, error = %err, "upstream call failed before a response");
    if err.is_unreachable() {
        ApiError::unreachable(&err.to_string(), path)
    } else {
        ApiError::unexpected(&err.to_string(), path)
    }
}

/// `"<status> <reason>"`, followed by the upstream body when there is one.
fn status_detail(response: &HttpResponse) -> String {
    let head = format!("{} {}", response.status, reason_phrase(response.status));
    let body = response.body.trim();
    if body.is_empty() {
        head
    } else {
        format!("{head}: {body}")
    }
}
