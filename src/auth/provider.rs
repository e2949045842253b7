// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider seams.
//!
//! [`AuthApi`] is the stateless wire API of an identity service (used by the
//! HTTP routes). [`IdentityProvider`] is the stateful, SDK-style view a
//! client holds: one current session plus change notifications.
//! [`SessionHandle`] builds the latter on top of the former.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::models::Session;

/// Capacity of the session-change channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Errors reported by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many attempts, try again later")]
    RateLimited,

    #[error("An account with this email already exists")]
    AlreadyRegistered,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Email confirmation required before signing in")]
    ConfirmationRequired,

    #[error("Session refresh token is invalid or expired")]
    InvalidRefreshToken,

    #[error("Identity provider unreachable: {0}")]
    Network(String),

    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// Session change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

/// Stateless identity service operations.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError>;

    /// Revoke the session identified by `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

/// Client-side identity provider: one current session and its change feed.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, `None` when signed out.
    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    /// Subscribe to session changes.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// [`IdentityProvider`] holding one session obtained through an [`AuthApi`].
pub struct SessionHandle<A: ?Sized> {
    api: Arc<A>,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<A: AuthApi + ?Sized> SessionHandle<A> {
    pub fn new(api: Arc<A>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            current: RwLock::new(None),
            events,
        }
    }

    /// Handle resuming a previously stored session.
    pub fn with_session(api: Arc<A>, session: Session) -> Self {
        let handle = Self::new(api);
        handle.current.try_write().map(|mut current| *current = Some(session)).ok();
        handle
    }

    /// Exchange the refresh token for a new session.
    pub async fn refresh(&self) -> Result<Session, IdentityError> {
        let refresh_token = self
            .current
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(IdentityError::InvalidRefreshToken)?;

        let session = self.api.refresh_session(&refresh_token).await?;
        *self.current.write().await = Some(session.clone());
        self.notify(SessionEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl<A: AuthApi + ?Sized> IdentityProvider for SessionHandle<A> {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        let current = self.current.read().await.clone();
        match current {
            Some(session) if session.is_expired(Utc::now()) => self.refresh().await.map(Some),
            other => Ok(other),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let session = self.api.sign_in_with_password(email, password).await?;
        *self.current.write().await = Some(session.clone());
        self.notify(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let previous = self.current.write().await.take();
        self.notify(SessionEvent::SignedOut);

        // The local session is gone either way; report a failed revocation.
        match previous {
            Some(session) => self.api.sign_out(&session.access_token).await,
            None => Ok(()),
        }
    }
}
