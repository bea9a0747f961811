//! Inbound routes exercised against the live mock upstream.

use std::net::SocketAddr;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{Post, FIRST_CREATED_ID};
use relay_core::{EndpointConfig, ResourceClient};
use serde_json::Value;
use tower::ServiceExt;

fn start_mock(posts: Vec<Post>) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, posts).await
        })
        .unwrap();
    });

    addr
}

fn gateway(addr: SocketAddr) -> axum::Router {
    let config = EndpointConfig::new(&format!("http://{addr}")).unwrap();
    relay_gateway::app(ResourceClient::new(config))
}

fn seeded(id: i64) -> Post {
    Post {
        id,
        user_id: Some(1),
        name: Some("Seed".to_string()),
        email: None,
        message: None,
        status: Some("active".to_string()),
        created_at: None,
        extra: serde_json::Map::new(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

#[tokio::test]
async fn missing_resource_renders_not_found_envelope() {
    let app = gateway(start_mock(Vec::new()));
    let resp = app.oneshot(get("/api/v1/external/resources/999")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let envelope = body_json(resp).await;
    assert_eq!(envelope["status"], 404);
    assert_eq!(envelope["error"], "Not Found");
    assert_eq!(envelope["path"], "/api/v1/external/resources/999");
    assert!(envelope["timestamp"].is_string());
    assert!(envelope["message"].as_str().unwrap().contains("/posts/999"));
}

#[tokio::test]
async fn create_returns_201_with_assigned_id() {
    let app = gateway(start_mock(Vec::new()));
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/external/resources")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"name":"John Doe","email":"john@example.com","message":"Test"}"#.to_string())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["id"], FIRST_CREATED_ID);
    assert_eq!(created["name"], "John Doe");
    assert_eq!(created["message"], "Test");
}

#[tokio::test]
async fn form_create_returns_201() {
    let app = gateway(start_mock(Vec::new()));
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/external/resources/form")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("name=Jane+Roe&email=jane%40example.com".to_string())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["name"], "Jane Roe");
    assert_eq!(created["email"], "jane@example.com");
}

#[tokio::test]
async fn search_requires_user_id() {
    let addr = start_mock(vec![seeded(1)]);

    let resp = gateway(addr)
        .oneshot(get("/api/v1/external/resources/search?userId=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

    let resp = gateway(addr)
        .oneshot(get("/api/v1/external/resources/search"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_then_delete() {
    let addr = start_mock(vec![seeded(4)]);

    let req = Request::builder()
        .method("PATCH")
        .uri("/api/v1/external/resources/4")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"message":"patched"}"#.to_string())
        .unwrap();
    let resp = gateway(addr).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let patched = body_json(resp).await;
    assert_eq!(patched["name"], "Seed");
    assert_eq!(patched["message"], "patched");

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/v1/external/resources/4")
        .body(String::new())
        .unwrap();
    let resp = gateway(addr).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn full_response_and_status_handling() {
    let addr = start_mock(vec![seeded(1)]);

    let resp = gateway(addr)
        .oneshot(get("/api/v1/external/resources/1/full-response"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let full = body_json(resp).await;
    assert_eq!(full["status"], 200);
    assert_eq!(full["body"]["id"], 1);
    assert!(full["headers"]["content-type"][0]
        .as_str()
        .unwrap()
        .starts_with("application/json"));

    let resp = gateway(addr)
        .oneshot(get("/api/v1/external/resources/2/with-status-handling"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let envelope = body_json(resp).await;
    assert_eq!(envelope["message"], "Resource not found with id: 2");
}

#[tokio::test]
async fn with_headers_forwards_request() {
    let addr = start_mock(vec![seeded(1)]);
    let req = Request::builder()
        .uri("/api/v1/external/resources/1/with-headers")
        .header("x-request-id", "abc")
        .body(String::new())
        .unwrap();
    let resp = gateway(addr).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["id"], 1);
}

#[tokio::test]
async fn unreachable_upstream_renders_503() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let resp = gateway(addr)
        .oneshot(get("/api/v1/external/resources"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let envelope = body_json(resp).await;
    assert_eq!(envelope["status"], 503);
    assert_eq!(envelope["error"], "Service Unavailable");
    assert!(envelope["message"]
        .as_str()
        .unwrap()
        .starts_with("Unable to access external API: "));
}
