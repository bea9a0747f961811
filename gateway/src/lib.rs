//! Inbound HTTP surface for the resource relay.
//!
//! # Design
//! Every route parses its inputs, hands them to the blocking
//! `ResourceClient` on the blocking pool and renders the result. Errors are
//! rendered as the client's error envelope, stamped with the inbound path.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use relay_core::{
    ApiError, ErrorEnvelope, FullResponse, PartialUpdate, Resource, ResourceClient, ResourcePayload,
};
use serde::Deserialize;

pub const API_PREFIX: &str = "/api/v1/external";

/// Inbound headers never forwarded upstream.
const SKIPPED_HEADERS: [&str; 8] = [
    "host",
    "content-type",
    "content-length",
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "te",
];

pub type Shared = Arc<ResourceClient>;

pub fn app(client: ResourceClient) -> Router {
    let shared: Shared = Arc::new(client);
    let routes = Router::new()
        .route("/resources", get(list_all).post(create))
        .route("/resources/search", get(search_by_owner))
        .route("/resources/form", post(create_form))
        .route(
            "/resources/{id}",
            get(get_by_id)
                .put(update)
                .patch(partial_update)
                .delete(delete),
        )
        .route("/resources/{id}/with-headers", get(get_with_headers))
        .route(
            "/resources/{id}/with-status-handling",
            get(get_with_status_handling),
        )
        .route("/resources/{id}/full-response", get(get_with_full_response));
    Router::new().nest(API_PREFIX, routes).with_state(shared)
}

pub async fn run(listener: tokio::net::TcpListener, client: ResourceClient) -> Result<(), std::io::Error> {
    axum::serve(listener, app(client)).await
}

/// An `ApiError` bound to the inbound path it occurred on.
#[derive(Debug)]
pub struct Failure {
    envelope: ErrorEnvelope,
}

impl Failure {
    pub fn new(err: ApiError, path: &str) -> Self {
        let err = err.with_path(path);
        let envelope = match err.envelope() {
            Some(envelope) => envelope.clone(),
            None => ErrorEnvelope::new(err.status(), err.to_string(), path),
        };
        Self { envelope }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        tracing::error!(
            status = self.envelope.status,
            path = %self.envelope.path,
            message = %self.envelope.message,
            "request failed"
        );
        let status = StatusCode::from_u16(self.envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.envelope)).into_response()
    }
}

/// Run `op` against the client on the blocking pool.
async fn call<R, F>(client: &Shared, uri: &Uri, op: F) -> Result<R, Failure>
where
    R: Send + 'static,
    F: FnOnce(&ResourceClient) -> Result<R, ApiError> + Send + 'static,
{
    let client = Arc::clone(client);
    let path = uri.path().to_string();
    match tokio::task::spawn_blocking(move || op(client.as_ref())).await {
        Ok(result) => result.map_err(|e| Failure::new(e, &path)),
        Err(join) => Err(Failure::new(ApiError::unexpected(&join.to_string(), &path), &path)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub user_id: i64,
}

async fn list_all(State(client): State<Shared>, OriginalUri(uri): OriginalUri) -> Result<Json<Vec<Resource>>, Failure> {
    call(&client, &uri, |c| c.list_all()).await.map(Json)
}

async fn get_by_id(
    State(client): State<Shared>,
    Path(id): Path<i64>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Resource>, Failure> {
    call(&client, &uri, move |c| c.get_by_id(id)).await.map(Json)
}

async fn search_by_owner(
    State(client): State<Shared>,
    Query(params): Query<SearchParams>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<Resource>>, Failure> {
    call(&client, &uri, move |c| c.search_by_owner(Some(params.user_id)))
        .await
        .map(Json)
}

async fn create(
    State(client): State<Shared>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<ResourcePayload>,
) -> Result<(StatusCode, Json<Resource>), Failure> {
    let created = call(&client, &uri, move |c| c.create(&payload)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn create_form(
    State(client): State<Shared>,
    OriginalUri(uri): OriginalUri,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<Resource>), Failure> {
    let created = call(&client, &uri, move |c| c.create_form(fields)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    State(client): State<Shared>,
    Path(id): Path<i64>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<ResourcePayload>,
) -> Result<Json<Resource>, Failure> {
    call(&client, &uri, move |c| c.update(id, &payload)).await.map(Json)
}

async fn partial_update(
    State(client): State<Shared>,
    Path(id): Path<i64>,
    OriginalUri(uri): OriginalUri,
    Json(updates): Json<PartialUpdate>,
) -> Result<Json<Resource>, Failure> {
    call(&client, &uri, move |c| c.partial_update(id, &updates))
        .await
        .map(Json)
}

async fn delete(
    State(client): State<Shared>,
    Path(id): Path<i64>,
    OriginalUri(uri): OriginalUri,
) -> Result<StatusCode, Failure> {
    call(&client, &uri, move |c| c.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_with_headers(
    State(client): State<Shared>,
    Path(id): Path<i64>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Json<Resource>, Failure> {
    let forwarded = forwardable(&headers);
    call(&client, &uri, move |c| c.get_with_headers(id, &forwarded))
        .await
        .map(Json)
}

async fn get_with_status_handling(
    State(client): State<Shared>,
    Path(id): Path<i64>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Resource>, Failure> {
    call(&client, &uri, move |c| c.get_with_status_handling(id))
        .await
        .map(Json)
}

async fn get_with_full_response(
    State(client): State<Shared>,
    Path(id): Path<i64>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<FullResponse>, Failure> {
    call(&client, &uri, move |c| c.get_with_full_response(id))
        .await
        .map(Json)
}

/// Inbound headers minus hop-by-hop ones and those describing the inbound
/// request itself. Non-UTF-8 values are dropped.
fn forwardable(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| !SKIPPED_HEADERS.contains(&name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn forwardable_drops_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:8080"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

        let forwarded = forwardable(&headers);
        assert_eq!(
            forwarded.into_iter().collect::<Vec<_>>(),
            vec![
                ("accept-language".to_string(), "en".to_string()),
                ("x-request-id".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn failure_uses_inbound_path() {
        let err = ApiError::not_found("missing", "/posts/9");
        let failure = Failure::new(err, "/api/v1/external/resources/9");
        assert_eq!(failure.envelope.status, 404);
        assert_eq!(failure.envelope.path, "/api/v1/external/resources/9");
    }

    #[test]
    fn invalid_descriptor_renders_as_bad_request() {
        let err = ApiError::InvalidDescriptor("unbound placeholder {id}".to_string());
        let failure = Failure::new(err, "/api/v1/external/resources");
        assert_eq!(failure.envelope.status, 400);
        assert_eq!(failure.envelope.error, "Bad Request");
        assert_eq!(failure.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
