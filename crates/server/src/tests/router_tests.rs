use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    response::Response,
};
use serde_json::json;
use tower::ServiceExt;

async fn test_router() -> Router {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    build_router(new_state(storage), 1024)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = test_router().await;
    let response = app
        .oneshot(empty_request(Method::GET, "/healthz"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn people_collection_supports_create_and_list() {
    let app = test_router().await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/people/",
            json!({ "name": "Ann", "age": 30, "email": "ann@example.com" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["id"], json!(1));

    let response = app
        .oneshot(empty_request(Method::GET, "/api/people/"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([created]));
}

#[tokio::test]
async fn invalid_person_is_a_bad_request_with_field_errors() {
    let app = test_router().await;
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/people/",
            json!({ "name": "Ann", "age": "old", "email": "ann@example.com" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("validation"));
    assert_eq!(body["fields"]["age"], json!(["A valid integer is required."]));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = test_router().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");

    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], json!("validation"));
}

#[tokio::test]
async fn missing_items_are_not_found() {
    let app = test_router().await;

    for request in [
        empty_request(Method::GET, "/api/people/7/"),
        empty_request(Method::DELETE, "/api/tasks/7/"),
        json_request(Method::PATCH, "/api/tasks/7/", json!({ "done": true })),
    ] {
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], json!("not_found"));
    }
}

#[tokio::test]
async fn task_item_replace_and_delete() {
    let app = test_router().await;

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/tasks/",
            json!({ "title": "draft", "done": false }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            "/api/tasks/1/",
            json!({ "id": 1, "title": "final" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "id": 1, "title": "final" }));

    let response = app
        .clone()
        .oneshot(empty_request(Method::DELETE, "/api/tasks/1/"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(empty_request(Method::GET, "/api/tasks/"))
        .await
        .expect("response");
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let app = test_router().await;
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/api/tasks/",
            json!({ "notes": "x".repeat(4096) }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
