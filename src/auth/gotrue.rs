// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for a hosted GoTrue-compatible identity service.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::local::MIN_PASSWORD_LEN;
use super::provider::{AuthApi, IdentityError};
use crate::models::{Session, SessionUser};

/// Hosted identity service accessed over HTTP.
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: TokenUser,
}

impl TryFrom<TokenResponse> for Session {
    type Error = IdentityError;

    fn try_from(token: TokenResponse) -> Result<Self, Self::Error> {
        let expires_at = Duration::try_seconds(token.expires_in)
            .filter(|ttl| *ttl >= Duration::zero())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                IdentityError::Provider(format!("Invalid token lifetime: {}", token.expires_in))
            })?;

        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: SessionUser {
                id: token.user.id,
                email: token.user.email,
            },
        })
    }
}

/// Map a failed identity service response to an [`IdentityError`].
pub fn classify_failure(status: u16, body: &str) -> IdentityError {
    if status == 429 {
        return IdentityError::RateLimited;
    }

    let lower = body.to_ascii_lowercase();
    if lower.contains("already registered") || lower.contains("user_already_exists") {
        IdentityError::AlreadyRegistered
    } else if lower.contains("email_not_confirmed") || lower.contains("email not confirmed") {
        IdentityError::ConfirmationRequired
    } else if lower.contains("refresh_token_not_found") || lower.contains("invalid refresh token")
    {
        IdentityError::InvalidRefreshToken
    } else if lower.contains("weak_password") {
        IdentityError::WeakPassword(MIN_PASSWORD_LEN)
    } else if lower.contains("email_address_invalid") {
        IdentityError::InvalidEmail
    } else if matches!(status, 400 | 401 | 422) {
        IdentityError::InvalidCredentials
    } else {
        IdentityError::Provider(format!("HTTP {}: {}", status, body))
    }
}

impl GoTrueClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, IdentityError> {
        let mut request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_key)
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if status == 429 {
            tracing::warn!("Identity service rate limit hit (429)");
        }
        Err(classify_failure(status, &body))
    }

    async fn session_from(response: reqwest::Response) -> Result<Session, IdentityError> {
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(format!("JSON parse error: {}", e)))?;

        // Sign-up with email confirmation enabled returns a bare user, no tokens.
        if value.get("access_token").is_none() {
            return Err(IdentityError::ConfirmationRequired);
        }

        serde_json::from_value::<TokenResponse>(value)
            .map_err(|e| IdentityError::Provider(format!("JSON parse error: {}", e)))?
            .try_into()
    }
}

#[async_trait]
impl AuthApi for GoTrueClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let response = self
            .post("/signup", &PasswordGrant { email, password }, None)
            .await?;
        Self::session_from(response).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let response = self
            .post(
                "/token?grant_type=password",
                &PasswordGrant { email, password },
                None,
            )
            .await?;
        Self::session_from(response).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let response = self
            .post(
                "/token?grant_type=refresh_token",
                &RefreshGrant { refresh_token },
                None,
            )
            .await?;
        Self::session_from(response).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.post("/logout", &serde_json::json!({}), Some(access_token))
            .await
            .map(|_| ())
    }
}
