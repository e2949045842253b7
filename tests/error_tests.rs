// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use brewlog::auth::IdentityError;
use brewlog::error::AppError;
use brewlog::store::StoreError;

fn status(err: AppError) -> StatusCode {
    err.into_response().status()
}

#[test]
fn test_store_errors_map_to_client_statuses() {
    assert_eq!(
        status(StoreError::UnknownBean("b".to_string()).into()),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status(
            StoreError::NotAuthor {
                review_id: "r".to_string(),
                user_id: "u".to_string(),
            }
            .into()
        ),
        StatusCode::FORBIDDEN
    );
    assert_eq!(status(StoreError::SelfFollow.into()), StatusCode::BAD_REQUEST);
}

#[test]
fn test_identity_errors_map_to_statuses() {
    assert_eq!(
        status(IdentityError::InvalidCredentials.into()),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status(IdentityError::RateLimited.into()),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
        status(IdentityError::AlreadyRegistered.into()),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status(IdentityError::WeakPassword(6).into()),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status(IdentityError::InvalidRefreshToken.into()),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status(IdentityError::Network("timeout".to_string()).into()),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn test_backend_failure_hides_details() {
    assert_eq!(
        status(AppError::Database("connection reset".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status(AppError::Internal(anyhow::anyhow!("boom"))),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_error_body_shape() {
    let response = AppError::NotFound("Bean 9 not found".to_string()).into_response();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["error"], "not_found");
    assert_eq!(body["details"], "Bean 9 not found");
}

#[tokio::test]
async fn test_database_error_body_is_generic() {
    let response = AppError::Database("secret connection string".to_string()).into_response();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("database_error"));
    assert!(!text.contains("secret connection string"));
}
