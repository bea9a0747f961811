use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// First id handed out by `POST /posts`.
pub const FIRST_CREATED_ID: i64 = 101;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Fields the server does not model are kept and echoed back.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub user_id: Option<i64>,
}

pub struct Store {
    posts: BTreeMap<i64, Post>,
    next_id: i64,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Vec::new())
}

/// Router pre-loaded with `posts`. Created posts get ids from
/// `FIRST_CREATED_ID` upwards, or past the highest seeded id.
pub fn app_with(posts: Vec<Post>) -> Router {
    let next_id = posts
        .iter()
        .map(|p| p.id + 1)
        .max()
        .unwrap_or(FIRST_CREATED_ID)
        .max(FIRST_CREATED_ID);
    let store = Store {
        posts: posts.into_iter().map(|p| (p.id, p)).collect(),
        next_id,
    };
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post)
                .put(replace_post)
                .patch(patch_post)
                .delete(delete_post),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, posts: Vec<Post>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(posts)).await
}

async fn list_posts(State(db): State<Db>, Query(params): Query<ListParams>) -> Response {
    let store = db.read().await;
    let posts: Vec<Post> = store
        .posts
        .values()
        .filter(|p| params.user_id.is_none() || p.user_id == params.user_id)
        .cloned()
        .collect();
    let count = HeaderValue::from(posts.len());
    ([(TOTAL_COUNT_HEADER, count)], Json(posts)).into_response()
}

async fn create_post(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Post>), StatusCode> {
    let fields = parse_fields(&headers, &body)?;
    let mut store = db.write().await;
    let id = store.next_id;
    store.next_id += 1;
    let mut post = Post {
        id,
        user_id: None,
        name: None,
        email: None,
        message: None,
        status: Some("active".to_string()),
        created_at: None,
        extra: Map::new(),
    };
    apply(&mut post, fields);
    store.posts.insert(id, post.clone());
    tracing::debug!(id, "created post");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(State(db): State<Db>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    let store = db.read().await;
    let Some(post) = store.posts.get(&id).cloned() else {
        return (StatusCode::NOT_FOUND, Json(Map::new())).into_response();
    };
    let mut response = Json(post).into_response();
    if let Some(request_id) = headers.get(REQUEST_ID_HEADER) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, request_id.clone());
    }
    response
}

async fn replace_post(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Post>, StatusCode> {
    let fields = parse_fields(&headers, &body)?;
    let mut store = db.write().await;
    let post = store.posts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    post.name = None;
    post.email = None;
    post.message = None;
    post.extra.clear();
    apply(post, fields);
    Ok(Json(post.clone()))
}

async fn patch_post(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Post>, StatusCode> {
    let fields = parse_fields(&headers, &body)?;
    let mut store = db.write().await;
    let post = store.posts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    apply(post, fields);
    Ok(Json(post.clone()))
}

async fn delete_post(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Map<String, Value>>, StatusCode> {
    let mut store = db.write().await;
    store
        .posts
        .remove(&id)
        .map(|_| Json(Map::new()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// Decode a JSON object or form-urlencoded body into a field map.
fn parse_fields(headers: &HeaderMap, body: &[u8]) -> Result<Map<String, Value>, StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if content_type.starts_with("application/x-www-form-urlencoded") {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(body).map_err(|_| StatusCode::BAD_REQUEST)?;
        return Ok(pairs.into_iter().map(|(k, v)| (k, Value::String(v))).collect());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => Err(StatusCode::BAD_REQUEST),
    }
}

/// Apply fields to `post`. Known fields are typed, `id` is ignored, anything
/// else lands in `extra`.
fn apply(post: &mut Post, fields: Map<String, Value>) {
    for (key, value) in fields {
        let text = value.as_str().map(str::to_string);
        match key.as_str() {
            "id" => {}
            "userId" => post.user_id = value.as_i64(),
            "name" => post.name = text,
            "email" => post.email = text,
            "message" => post.message = text,
            "status" => post.status = text,
            "createdAt" => post.created_at = text,
            _ => {
                post.extra.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(id: i64) -> Post {
        Post {
            id,
            user_id: None,
            name: None,
            email: None,
            message: None,
            status: None,
            created_at: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn post_serializes_to_camel_case() {
        let mut post = blank(1);
        post.user_id = Some(7);
        post.created_at = Some("2024-12-14T10:00:00Z".to_string());
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["userId"], 7);
        assert_eq!(json["createdAt"], "2024-12-14T10:00:00Z");
        assert!(json["name"].is_null());
    }

    #[test]
    fn unknown_fields_round_trip_through_extra() {
        let post: Post = serde_json::from_str(r#"{"id":2,"title":"kept","tags":["a"]}"#).unwrap();
        assert_eq!(post.extra["title"], "kept");
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["tags"][0], "a");
    }

    #[test]
    fn apply_ignores_id_and_types_known_fields() {
        let mut post = blank(3);
        let fields = serde_json::json!({"id": 99, "userId": 4, "name": "n", "pinned": true});
        apply(&mut post, fields.as_object().unwrap().clone());
        assert_eq!(post.id, 3);
        assert_eq!(post.user_id, Some(4));
        assert_eq!(post.name.as_deref(), Some("n"));
        assert_eq!(post.extra["pinned"], true);
    }

    #[test]
    fn parse_fields_reads_form_bodies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let fields = parse_fields(&headers, b"name=John+Doe&email=john%40example.com").unwrap();
        assert_eq!(fields["name"], "John Doe");
        assert_eq!(fields["email"], "john@example.com");
    }

    #[test]
    fn parse_fields_rejects_non_object_json() {
        let headers = HeaderMap::new();
        assert_eq!(parse_fields(&headers, b"[1,2]"), Err(StatusCode::BAD_REQUEST));
        assert_eq!(parse_fields(&headers, b"nope"), Err(StatusCode::BAD_REQUEST));
    }
}
