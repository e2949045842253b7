// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page guard: applies the redirect table to page requests.
//!
//! API, auth and health endpoints pass through untouched. For pages, an
//! unreadable or expired session counts as signed out.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::auth::{redirect_for, Location};
use crate::middleware::auth::auth_user;
use crate::AppState;

/// Path prefixes that are not pages.
const UNGUARDED_PREFIXES: &[&str] = &["/api/", "/auth/", "/health"];

/// Whether `path` is served as a page rather than an API, auth or health
/// endpoint.
pub fn is_page_path(path: &str) -> bool {
    !UNGUARDED_PREFIXES.iter().any(|p| path.starts_with(p))
}

pub async fn guard_pages(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if !is_page_path(path) {
        return next.run(request).await;
    }

    let location = Location {
        path: path.to_string(),
        query: request.uri().query().map(str::to_string),
    };
    let user = auth_user(&jar, request.headers(), &state.config.jwt_signing_key);

    match redirect_for(user.is_some(), &location) {
        Some(target) => {
            tracing::debug!(from = %location.path_and_query(), to = %target, "Page redirect");
            Redirect::temporary(&target).into_response()
        }
        None => next.run(request).await,
    }
}
