// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Self-hosted email/password identity service.
//!
//! Accounts and refresh tokens live in memory. Access tokens are HS256 JWTs
//! signed with the server key, so the auth middleware accepts them directly.
//! Password hashes are HMAC-SHA256 over a per-account salt, keyed with a
//! password key derived from the signing key.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::provider::{AuthApi, IdentityError};
use crate::middleware::auth::{create_jwt, verify_jwt};
use crate::models::{Session, SessionUser};

type HmacSha256 = Hmac<Sha256>;

/// Access token lifetime.
pub const ACCESS_TOKEN_TTL_SECS: u64 = 3600;
/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;
/// Failed sign-ins tolerated per email inside one window.
const MAX_FAILED_ATTEMPTS: u32 = 5;
const FAILED_ATTEMPT_WINDOW_SECS: i64 = 60;
/// Unused refresh tokens expire after this long.
const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

const SALT_LEN: usize = 16;
const REFRESH_TOKEN_LEN: usize = 32;

#[derive(Debug, Clone)]
struct Credential {
    user_id: String,
    salt: [u8; SALT_LEN],
    hash: Vec<u8>,
}

#[derive(Debug, Clone)]
struct RefreshGrant {
    user_id: String,
    email: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct FailedAttempts {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Lower-case and trim an email; `None` when it is not plausibly an address.
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// In-memory [`AuthApi`].
pub struct LocalAuth {
    signing_key: Vec<u8>,
    password_key: [u8; 32],
    accounts: DashMap<String, Credential>,
    refresh_tokens: DashMap<String, RefreshGrant>,
    failures: DashMap<String, FailedAttempts>,
}

impl LocalAuth {
    pub fn new(signing_key: &[u8]) -> Self {
        let hk = Hkdf::<Sha256>::new(None, signing_key);
        let mut password_key = [0u8; 32];
        // 32 bytes is always a valid HKDF-SHA256 output length.
        let _ = hk.expand(b"brewlog password hashing", &mut password_key);

        Self {
            signing_key: signing_key.to_vec(),
            password_key,
            accounts: DashMap::new(),
            refresh_tokens: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    /// Number of registered accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn hash_password(&self, salt: &[u8], password: &str) -> Result<Vec<u8>, IdentityError> {
        let mut mac = HmacSha256::new_from_slice(&self.password_key)
            .map_err(|e| IdentityError::Provider(format!("HMAC init failed: {}", e)))?;
        mac.update(salt);
        mac.update(password.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn check_rate_limit(&self, email: &str, now: DateTime<Utc>) -> Result<(), IdentityError> {
        match self.failures.get(email) {
            Some(f)
                if f.count >= MAX_FAILED_ATTEMPTS
                    && now - f.window_start < Duration::seconds(FAILED_ATTEMPT_WINDOW_SECS) =>
            {
                Err(IdentityError::RateLimited)
            }
            _ => Ok(()),
        }
    }

    /// Drop closed failure windows and expired refresh grants.
    fn prune_expired(&self, now: DateTime<Utc>) {
        let window = Duration::seconds(FAILED_ATTEMPT_WINDOW_SECS);
        self.failures.retain(|_, f| now - f.window_start < window);
        self.refresh_tokens.retain(|_, grant| grant.expires_at > now);
    }

    fn record_failure(&self, email: &str, now: DateTime<Utc>) {
        self.prune_expired(now);
        let mut entry = self.failures.entry(email.to_string()).or_insert(FailedAttempts {
            count: 0,
            window_start: now,
        });
        if now - entry.window_start >= Duration::seconds(FAILED_ATTEMPT_WINDOW_SECS) {
            *entry = FailedAttempts {
                count: 0,
                window_start: now,
            };
        }
        entry.count += 1;
    }

    fn issue_session(&self, user_id: &str, email: &str) -> Result<Session, IdentityError> {
        let access_token = create_jwt(
            user_id,
            Some(email),
            ACCESS_TOKEN_TTL_SECS,
            &self.signing_key,
        )
        .map_err(|e| IdentityError::Provider(e.to_string()))?;

        let now = Utc::now();
        self.prune_expired(now);

        let refresh_token = hex::encode(rand::rng().random::<[u8; REFRESH_TOKEN_LEN]>());
        self.refresh_tokens.insert(
            refresh_token.clone(),
            RefreshGrant {
                user_id: user_id.to_string(),
                email: email.to_string(),
                expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            },
        );

        Ok(Session {
            access_token,
            refresh_token,
            expires_at: now + Duration::seconds(ACCESS_TOKEN_TTL_SECS as i64),
            user: SessionUser {
                id: user_id.to_string(),
                email: Some(email.to_string()),
            },
        })
    }
}

#[async_trait]
impl AuthApi for LocalAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = normalize_email(email).ok_or(IdentityError::InvalidEmail)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword(MIN_PASSWORD_LEN));
        }

        let salt: [u8; SALT_LEN] = rand::rng().random();
        let hash = self.hash_password(&salt, password)?;
        let user_id = uuid::Uuid::new_v4().to_string();

        match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => return Err(IdentityError::AlreadyRegistered),
            Entry::Vacant(slot) => {
                slot.insert(Credential {
                    user_id: user_id.clone(),
                    salt,
                    hash,
                });
            }
        }

        tracing::info!(user_id = %user_id, "Registered new account");
        self.issue_session(&user_id, &email)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let email = normalize_email(email).ok_or(IdentityError::InvalidCredentials)?;
        let now = Utc::now();
        self.check_rate_limit(&email, now)?;

        let credential = self.accounts.get(&email).map(|c| c.value().clone());
        let verified = match &credential {
            Some(c) => {
                let hash = self.hash_password(&c.salt, password)?;
                bool::from(hash.as_slice().ct_eq(c.hash.as_slice()))
            }
            None => false,
        };

        match credential {
            Some(c) if verified => {
                self.failures.remove(&email);
                self.issue_session(&c.user_id, &email)
            }
            _ => {
                self.record_failure(&email, now);
                tracing::debug!("Rejected sign-in attempt");
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        // Refresh tokens are single use.
        let (_, grant) = self
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(IdentityError::InvalidRefreshToken)?;
        if grant.expires_at <= Utc::now() {
            return Err(IdentityError::InvalidRefreshToken);
        }
        self.issue_session(&grant.user_id, &grant.email)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let claims = match verify_jwt(access_token, &self.signing_key) {
            Ok(claims) => claims,
            // Nothing to revoke for a token we never issued or that already expired.
            Err(_) => return Ok(()),
        };
        self.refresh_tokens
            .retain(|_, grant| grant.user_id != claims.sub);
        Ok(())
    }
}
