//! Routing, authentication and permission outcomes decided before any query

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{lazy_app, send};

#[tokio::test]
async fn test_anonymous_writes_are_rejected() {
    let app = lazy_app();

    for (method, uri) in [
        (Method::POST, "/api/problem/"),
        (Method::POST, "/api/contest"),
        (Method::PUT, "/api/problem/1/"),
        (Method::DELETE, "/api/contest/1"),
        (Method::POST, "/api/test-case/"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(body["error"]["code"], "NOT_AUTHENTICATED");
    }
}

#[tokio::test]
async fn test_disabled_actions_are_method_not_allowed() {
    let app = lazy_app();

    let (status, body) = send(&app, Method::PATCH, "/api/test-case/1/", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");

    let (status, _) = send(&app, Method::PUT, "/api/test-case/1", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(&app, Method::PATCH, "/api/submission/1/", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(&app, Method::GET, "/api/user-profile/", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unrouted_method_is_json_405() {
    let app = lazy_app();
    let (status, body) = send(&app, Method::POST, "/api/problem/1/", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["message"], "Method \"POST\" not allowed");
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let app = lazy_app();
    let (status, body) = send(&app, Method::GET, "/api/problem/", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = lazy_app();
    let (status, _) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = lazy_app();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/user/")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = lazy_app();
    let (status, _) = send(&app, Method::GET, "/api/nothing-here/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
