// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept bearer tokens and session cookies
//! 3. Browse routes stay public
//! 4. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use brewlog::middleware::auth::SESSION_COOKIE;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(common::empty_request("GET", "/api/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(common::empty_request("GET", "/api/me", Some("not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_token_signed_by_other_key() {
    let app = common::create_test_app();
    let token = common::create_test_jwt("u1", b"some_other_key_that_is_long_enough");

    let response = app
        .router
        .oneshot(common::empty_request("GET", "/api/me", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let app = common::create_test_app();
    let token = common::create_test_jwt("u1", &app.state.config.jwt_signing_key);

    let response = app
        .router
        .oneshot(common::empty_request("GET", "/api/me", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["id"], "u1");
    assert_eq!(body["username"], "coffee_lover");
}

#[tokio::test]
async fn test_protected_route_with_session_cookie() {
    let app = common::create_test_app();
    let token = common::create_test_jwt("u2", &app.state.config.jwt_signing_key);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["username"], "bean_hunter");
}

#[tokio::test]
async fn test_first_request_creates_profile() {
    let app = common::create_test_app();
    let token = common::create_test_jwt("new-user", &app.state.config.jwt_signing_key);

    let response = app
        .router
        .oneshot(common::empty_request("GET", "/api/me", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["id"], "new-user");
    assert_eq!(body["username"], "new_user");
    assert!(app.backend.get("users", "new-user").is_some());
}

#[tokio::test]
async fn test_browse_routes_are_public() {
    let app = common::create_test_app();

    for uri in ["/api/roasters", "/api/beans", "/api/reviews", "/api/users/u1"] {
        let response = app
            .router
            .clone()
            .oneshot(common::empty_request("GET", uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    }
}

#[tokio::test]
async fn test_public_write_route_still_requires_auth() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(common::json_request(
            "POST",
            "/api/roasters",
            None,
            serde_json::json!({ "name": "Anonymous Roasters" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_ok() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(common::empty_request("GET", "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["loading"], false);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/me")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}
