//! Resource client: one method per upstream operation.
//!
//! # Design
//! `ResourceClient` holds the immutable `EndpointConfig` and an injected
//! `Transport`, and carries no other state between calls. Each operation
//! describes its call as an `OperationDescriptor`, builds it, executes it once
//! and hands the outcome to the resolver. Concurrent calls need no
//! coordination; pooling is the transport's business.

use std::collections::BTreeMap;

use crate::builder;
use crate::config::EndpointConfig;
use crate::descriptor::OperationDescriptor;
use crate::error::ApiError;
use crate::resolver::{self, Outcome, StatusHandlers};
use crate::transport::{Transport, UreqTransport};
use crate::types::{FormData, FullResponse, PartialUpdate, Resource, ResourcePayload};

const COLLECTION: &str = "/posts";
const ITEM: &str = "/posts/{id}";

#[derive(Debug, Clone)]
pub struct ResourceClient<T = UreqTransport> {
    config: EndpointConfig,
    transport: T,
}

impl ResourceClient<UreqTransport> {
    /// Client backed by a `ureq` agent honouring the configured read timeout.
    pub fn new(config: EndpointConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self { config, transport }
    }
}

impl<T: Transport> ResourceClient<T> {
    pub fn with_transport(config: EndpointConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn list_all(&self) -> Result<Vec<Resource>, ApiError> {
        tracing::info!("fetching all resources");
        let (outcome, path) = self.send(&OperationDescriptor::get(COLLECTION))?;
        resolver::resolve(outcome, &path)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Resource, ApiError> {
        tracing::info!(id, "fetching resource");
        let (outcome, path) = self.send(&OperationDescriptor::get(ITEM).path_param("id", id))?;
        resolver::resolve(outcome, &path)
    }

    /// Resources owned by `user_id`. Without an owner the query string is
    /// omitted and the upstream returns everything.
    pub fn search_by_owner(&self, user_id: Option<i64>) -> Result<Vec<Resource>, ApiError> {
        tracing::info!(?user_id, "searching resources by owner");
        let desc = OperationDescriptor::get(COLLECTION).query("userId", user_id);
        let (outcome, path) = self.send(&desc)?;
        resolver::resolve(outcome, &path)
    }

    pub fn create(&self, payload: &ResourcePayload) -> Result<Resource, ApiError> {
        tracing::info!(?payload, "creating resource");
        let desc = OperationDescriptor::post(COLLECTION).json(payload)?;
        let (outcome, path) = self.send(&desc)?;
        resolver::resolve(outcome, &path)
    }

    /// Create a resource from form fields, sent form-urlencoded.
    pub fn create_form(&self, fields: FormData) -> Result<Resource, ApiError> {
        tracing::info!(fields = fields.len(), "submitting form data");
        let desc = OperationDescriptor::post(COLLECTION).form(fields);
        let (outcome, path) = self.send(&desc)?;
        resolver::resolve(outcome, &path)
    }

    pub fn update(&self, id: i64, payload: &ResourcePayload) -> Result<Resource, ApiError> {
        tracing::info!(id, "updating resource");
        let desc = OperationDescriptor::put(ITEM).path_param("id", id).json(payload)?;
        let (outcome, path) = self.send(&desc)?;
        resolver::resolve(outcome, &path)
    }

    pub fn partial_update(&self, id: i64, updates: &PartialUpdate) -> Result<Resource, ApiError> {
        tracing::info!(id, keys = updates.len(), "partially updating resource");
        let desc = OperationDescriptor::patch(ITEM).path_param("id", id).json(updates)?;
        let (outcome, path) = self.send(&desc)?;
        resolver::resolve(outcome, &path)
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        tracing::info!(id, "deleting resource");
        let (outcome, path) = self.send(&OperationDescriptor::delete(ITEM).path_param("id", id))?;
        resolver::resolve_empty(outcome, &path)
    }

    /// Fetch a resource, forwarding `headers` on top of the defaults.
    pub fn get_with_headers(&self, id: i64, headers: &BTreeMap<String, String>) -> Result<Resource, ApiError> {
        tracing::info!(id, headers = headers.len(), "fetching resource with custom headers");
        let desc = OperationDescriptor::get(ITEM)
            .path_param("id", id)
            .headers(headers.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let (outcome, path) = self.send(&desc)?;
        resolver::resolve(outcome, &path)
    }

    /// Fetch a resource with per-call overrides: 404 and 5xx are reported
    /// with short messages of their own before the default mapping applies.
    pub fn get_with_status_handling(&self, id: i64) -> Result<Resource, ApiError> {
        tracing::info!(id, "fetching resource with status handling");
        let handlers = StatusHandlers::new()
            .on_status(
                |status| status == 404,
                move |_, path| {
                    tracing::error!(id, "resource not found");
                    Err(ApiError::not_found(format!("Resource not found with id: {id}"), path))
                },
            )
            .on_status(
                |status| (500..600).contains(&status),
                |response, path| {
                    tracing::error!(status = response.status, "server error occurred");
                    Err(ApiError::server_error(response.status, "Server error", path))
                },
            );
        let (outcome, path) = self.send(&OperationDescriptor::get(ITEM).path_param("id", id))?;
        resolver::resolve_with(outcome, &path, &handlers)
    }

    /// Fetch a resource and return status and headers alongside the body.
    /// Non-2xx statuses are returned, not raised; the body is decoded only
    /// for a non-empty 2xx response.
    pub fn get_with_full_response(&self, id: i64) -> Result<FullResponse, ApiError> {
        tracing::info!(id, "fetching resource with full response");
        let (outcome, path) = self.send(&OperationDescriptor::get(ITEM).path_param("id", id))?;
        let raw = resolver::exchange(outcome, &path)?;
        tracing::info!(status = raw.status, headers = ?raw.headers, "upstream response");

        let body = if raw.is_success() && !raw.body.trim().is_empty() {
            let resource = serde_json::from_str(&raw.body).map_err(|e| {
                ApiError::unexpected(&format!("failed to decode response body: {e}"), &path)
            })?;
            Some(resource)
        } else {
            None
        };

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in raw.headers {
            headers.entry(name.to_ascii_lowercase()).or_default().push(value);
        }

        Ok(FullResponse {
            status: raw.status,
            headers,
            body,
        })
    }

    /// Build and execute one call. Returns the outcome together with the
    /// request path (without base URL) used in error envelopes.
    fn send(&self, descriptor: &OperationDescriptor) -> Result<(Outcome, String), ApiError> {
        let request = builder::build(&self.config, descriptor)?;
        let path = request
            .path
            .strip_prefix(self.config.base_url())
            .unwrap_or(&request.path)
            .to_string();
        tracing::debug!(method = %request.method, url = %request.path, "sending upstream request");
        Ok((self.transport.execute(&request), path))
    }
}
