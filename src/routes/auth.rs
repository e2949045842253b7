// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.
//!
//! The access token travels in an HttpOnly session cookie. A readable
//! `brewlog_logged_in` hint cookie lets the page bundle know a session exists
//! without exposing the token.

use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::auth::navigation::{post_login_destination, SIGNED_OUT_PATH};
use crate::error::{AppError, Result};
use crate::middleware::auth::{REFRESH_COOKIE, SESSION_COOKIE};
use crate::models::{AppUser, Session};
use crate::services::ensure_profile;
use crate::AppState;

/// Readable cookie signalling that a session exists.
pub const LOGGED_IN_COOKIE: &str = "brewlog_logged_in";

/// Refresh cookie lifetime.
const REFRESH_COOKIE_DAYS: i64 = 30;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RedirectParams {
    /// Post-login destination (local path)
    #[serde(default)]
    redirect: Option<String>,
}

/// Response of a successful sign-in or sign-up.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user: AppUser,
    /// Where the page should navigate next
    pub redirect: String,
    pub expires_at: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogoutResponse {
    pub redirect: String,
}

/// Cookies are `Secure` except when the frontend is served from localhost.
fn is_secure(frontend_url: &str) -> bool {
    !(frontend_url.contains("localhost") || frontend_url.contains("127.0.0.1"))
}

fn base_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Add the session, refresh and hint cookies for `session`.
fn with_session_cookies(jar: CookieJar, session: &Session, secure: bool) -> CookieJar {
    let access_ttl = session.remaining_secs(chrono::Utc::now());

    let mut access = base_cookie(SESSION_COOKIE, session.access_token.clone(), secure);
    access.set_http_only(true);
    access.set_max_age(time::Duration::seconds(access_ttl));

    let mut refresh = base_cookie(REFRESH_COOKIE, session.refresh_token.clone(), secure);
    refresh.set_http_only(true);
    refresh.set_max_age(time::Duration::days(REFRESH_COOKIE_DAYS));

    let mut hint = base_cookie(LOGGED_IN_COOKIE, "1".to_string(), secure);
    hint.set_max_age(time::Duration::days(REFRESH_COOKIE_DAYS));

    jar.add(access).add(refresh).add(hint)
}

/// Expire every session cookie with the attributes they were created with.
fn without_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    let mut jar = jar;
    for (name, http_only) in [
        (SESSION_COOKIE, true),
        (REFRESH_COOKIE, true),
        (LOGGED_IN_COOKIE, false),
    ] {
        let mut cookie = base_cookie(name, String::new(), secure);
        cookie.set_http_only(http_only);
        cookie.make_removal();
        jar = jar.add(cookie);
    }
    jar
}

async fn session_response(
    state: &AppState,
    jar: CookieJar,
    session: Session,
    requested: Option<&str>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let user = ensure_profile(&state.sync, &session.user.id, session.user.email.as_deref()).await?;
    let jar = with_session_cookies(jar, &session, is_secure(&state.config.frontend_url));

    Ok((
        jar,
        Json(SessionResponse {
            user,
            redirect: post_login_destination(requested),
            expires_at: crate::time_utils::format_utc_rfc3339(session.expires_at),
        }),
    ))
}

/// Create an account and sign in.
async fn signup(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RedirectParams>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    credentials
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let session = state
        .auth
        .sign_up(&credentials.email, &credentials.password)
        .await?;
    tracing::info!(user_id = %session.user.id, "Account created");

    session_response(&state, jar, session, params.redirect.as_deref()).await
}

/// Sign in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RedirectParams>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    credentials
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let session = state
        .auth
        .sign_in_with_password(&credentials.email, &credentials.password)
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "Sign-in failed");
            e
        })?;
    tracing::info!(user_id = %session.user.id, "Signed in");

    session_response(&state, jar, session, params.redirect.as_deref()).await
}

/// Exchange the refresh cookie for a new session.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let session = state.auth.refresh_session(&refresh_token).await?;
    tracing::debug!(user_id = %session.user.id, "Session refreshed");

    session_response(&state, jar, session, None).await
}

/// Sign out: revoke the session and clear the cookies.
///
/// The cookies are cleared even when revocation fails.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        if let Err(e) = state.auth.sign_out(&token).await {
            tracing::warn!(error = %e, "Failed to revoke session at identity provider");
        }
    }

    let jar = without_session_cookies(jar, is_secure(&state.config.frontend_url));
    (
        jar,
        Json(LogoutResponse {
            redirect: SIGNED_OUT_PATH.to_string(),
        }),
    )
}
