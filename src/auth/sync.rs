// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session synchronizer.
//!
//! Mirrors the identity provider's session into an [`AuthState`] and drives
//! redirects through a [`Navigator`]. Only one redirect is in flight at a
//! time: after navigating, the synchronizer stays in
//! [`NavState::Redirecting`] until the navigator reports arrival (or the
//! location is observed at the target), and suppresses further redirects
//! meanwhile.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast::error::RecvError, oneshot};

use super::navigation::{redirect_for, Location};
use super::provider::{IdentityProvider, SessionEvent};
use crate::models::SessionUser;

/// Where the application currently is, and how to move it.
pub trait Navigator: Send + Sync {
    fn location(&self) -> Location;
    fn navigate(&self, target: &str);
}

/// Session state visible to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<SessionUser>,
    pub is_loading: bool,
    pub is_initialized: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
            is_initialized: false,
        }
    }
}

/// Redirect re-entrancy state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NavState {
    #[default]
    Idle,
    Redirecting { target: String },
}

#[derive(Default)]
struct Inner {
    auth: AuthState,
    nav: NavState,
}

pub struct SessionSynchronizer<P: ?Sized, N> {
    provider: Arc<P>,
    navigator: N,
    inner: Mutex<Inner>,
}

impl<P, N> SessionSynchronizer<P, N>
where
    P: IdentityProvider + ?Sized,
    N: Navigator,
{
    pub fn new(provider: Arc<P>, navigator: N) -> Self {
        Self {
            provider,
            navigator,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn state(&self) -> AuthState {
        self.lock().auth.clone()
    }

    pub fn nav_state(&self) -> NavState {
        self.lock().nav.clone()
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_user(&self, user: Option<SessionUser>) {
        let mut inner = self.lock();
        inner.auth = AuthState {
            user,
            is_loading: false,
            is_initialized: true,
        };
    }

    /// Fetch the current session once and apply the redirect table.
    ///
    /// Provider errors are treated as "no user".
    pub async fn initialize(&self) -> Option<String> {
        let user = match self.provider.get_session().await {
            Ok(session) => session.map(|s| s.user),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch session, continuing signed out");
                None
            }
        };

        self.set_user(user);
        self.evaluate()
    }

    /// Apply a session change. Returns the redirect issued, if any.
    pub fn handle_event(&self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::SignedIn(session) => {
                tracing::debug!(user_id = %session.user.id, "Session signed in");
                self.set_user(Some(session.user.clone()));
                self.evaluate()
            }
            SessionEvent::SignedOut => {
                tracing::debug!("Session signed out");
                self.set_user(None);
                self.evaluate()
            }
            SessionEvent::TokenRefreshed(session) => {
                self.set_user(Some(session.user.clone()));
                None
            }
        }
    }

    /// The navigator finished the pending redirect.
    ///
    /// Session changes suppressed while it was in flight are re-evaluated
    /// against the new location.
    pub fn navigation_settled(&self) -> Option<String> {
        self.lock().nav = NavState::Idle;
        self.evaluate()
    }

    /// Decide and perform a redirect for the current location.
    pub fn evaluate(&self) -> Option<String> {
        let location = self.navigator.location();
        let target = {
            let mut inner = self.lock();
            if let NavState::Redirecting { target } = &inner.nav {
                if Location::parse(target).path != location.path {
                    tracing::debug!(pending = %target, "Redirect already in flight");
                    return None;
                }
                inner.nav = NavState::Idle;
            }

            let target = redirect_for(inner.auth.user.is_some(), &location)?;
            inner.nav = NavState::Redirecting {
                target: target.clone(),
            };
            target
        };

        tracing::debug!(from = %location.path, to = %target, "Redirecting");
        self.navigator.navigate(&target);
        Some(target)
    }

    /// Initialize, then follow session changes until `shutdown` fires.
    ///
    /// A shutdown during the initial fetch drops it before any state is applied.
    pub async fn run(&self, mut shutdown: oneshot::Receiver<()>) {
        let mut events = self.provider.subscribe();

        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("Session synchronizer stopped before initialization");
                return;
            }
            _ = self.initialize() => {}
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Ok(event) => {
                        self.handle_event(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed session events, re-fetching session");
                        self.initialize().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        tracing::debug!("Session synchronizer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityError;
    use crate::models::Session;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::time::Duration as StdDuration;
    use tokio::sync::broadcast;

    struct FakeProvider {
        session: Mutex<Option<Session>>,
        fail: bool,
        delay: Option<StdDuration>,
        events: broadcast::Sender<SessionEvent>,
    }

    impl FakeProvider {
        fn new(session: Option<Session>) -> Self {
            let (events, _) = broadcast::channel(4);
            Self {
                session: Mutex::new(session),
                fail: false,
                delay: None,
                events,
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(IdentityError::Network("timeout".to_string()));
            }
            Ok(self.session.lock().unwrap().clone())
        }

        fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
            self.events.subscribe()
        }

        async fn sign_in_with_password(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<Session, IdentityError> {
            Err(IdentityError::InvalidCredentials)
        }

        async fn sign_out(&self) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    /// Records navigations; `follow` moves the location to the target.
    struct RecordingNavigator {
        location: Mutex<Location>,
        visits: Mutex<Vec<String>>,
        follow: bool,
    }

    impl RecordingNavigator {
        fn at(path: &str, follow: bool) -> Self {
            Self {
                location: Mutex::new(Location::parse(path)),
                visits: Mutex::new(Vec::new()),
                follow,
            }
        }

        fn visits(&self) -> Vec<String> {
            self.visits.lock().unwrap().clone()
        }

        fn go(&self, path: &str) {
            *self.location.lock().unwrap() = Location::parse(path);
        }
    }

    impl Navigator for RecordingNavigator {
        fn location(&self) -> Location {
            self.location.lock().unwrap().clone()
        }

        fn navigate(&self, target: &str) {
            self.visits.lock().unwrap().push(target.to_string());
            if self.follow {
                self.go(target);
            }
        }
    }

    fn session(user_id: &str) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            user: SessionUser {
                id: user_id.to_string(),
                email: Some("brewer@example.com".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(None)),
            RecordingNavigator::at("/", true),
        );
        let state = sync.state();
        assert!(state.is_loading);
        assert!(!state.is_initialized);
        assert_eq!(sync.nav_state(), NavState::Idle);
    }

    #[tokio::test]
    async fn test_logged_out_on_protected_redirects_to_login() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(None)),
            RecordingNavigator::at("/create-roaster", true),
        );

        let target = sync.initialize().await;

        assert_eq!(target.as_deref(), Some("/login?redirect=%2Fcreate-roaster"));
        assert_eq!(sync.state().user, None);
        assert!(sync.state().is_initialized);
        assert!(!sync.state().is_loading);
    }

    #[tokio::test]
    async fn test_session_fetch_error_fails_open_to_signed_out() {
        let mut provider = FakeProvider::new(Some(session("u1")));
        provider.fail = true;
        let sync = SessionSynchronizer::new(
            Arc::new(provider),
            RecordingNavigator::at("/profile", true),
        );

        let target = sync.initialize().await;

        assert_eq!(sync.state().user, None);
        assert!(sync.state().is_initialized);
        assert_eq!(target.as_deref(), Some("/login?redirect=%2Fprofile"));
    }

    #[tokio::test]
    async fn test_signed_in_on_login_follows_redirect_param() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(Some(session("u1")))),
            RecordingNavigator::at("/login?redirect=%2Fcreate-bean", true),
        );

        sync.initialize().await;
        assert_eq!(sync.navigator().visits(), vec!["/create-bean".to_string()]);
    }

    #[tokio::test]
    async fn test_sign_in_event_on_auth_page_goes_home() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(None)),
            RecordingNavigator::at("/signup", true),
        );
        assert_eq!(sync.initialize().await, None);

        let target = sync.handle_event(&SessionEvent::SignedIn(session("u1")));
        assert_eq!(target.as_deref(), Some("/"));
        assert_eq!(sync.state().user.map(|u| u.id).as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_token_refresh_updates_state_without_redirect() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(None)),
            RecordingNavigator::at("/login", true),
        );
        sync.initialize().await;

        let target = sync.handle_event(&SessionEvent::TokenRefreshed(session("u1")));

        assert_eq!(target, None);
        assert!(sync.state().user.is_some());
        assert!(sync.navigator().visits().is_empty());
    }

    #[tokio::test]
    async fn test_only_one_redirect_in_flight() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(None)),
            RecordingNavigator::at("/profile", false),
        );

        sync.initialize().await;
        assert_eq!(
            sync.nav_state(),
            NavState::Redirecting {
                target: "/login?redirect=%2Fprofile".to_string()
            }
        );

        // Overlapping updates while the first redirect is pending.
        assert_eq!(sync.handle_event(&SessionEvent::SignedOut), None);
        assert_eq!(sync.evaluate(), None);
        assert_eq!(sync.navigator().visits().len(), 1);

        sync.navigator().go("/login?redirect=%2Fprofile");
        assert_eq!(sync.navigation_settled(), None);
        assert_eq!(sync.nav_state(), NavState::Idle);
        assert_eq!(
            sync.handle_event(&SessionEvent::SignedIn(session("u1"))).as_deref(),
            Some("/profile")
        );
        assert_eq!(sync.navigator().visits().len(), 2);
    }

    #[tokio::test]
    async fn test_sign_in_during_redirect_is_applied_on_arrival() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(None)),
            RecordingNavigator::at("/profile", false),
        );
        sync.initialize().await;

        // Suppressed while the redirect to the login page is in flight.
        assert_eq!(sync.handle_event(&SessionEvent::SignedIn(session("u1"))), None);

        sync.navigator().go("/login?redirect=%2Fprofile");
        let target = sync.navigation_settled();

        assert_eq!(target.as_deref(), Some("/profile"));
        assert_eq!(
            sync.navigator().visits(),
            vec!["/login?redirect=%2Fprofile".to_string(), "/profile".to_string()]
        );
        assert_eq!(
            sync.nav_state(),
            NavState::Redirecting {
                target: "/profile".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_settling_without_pending_change_stays_idle() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(Some(session("u1")))),
            RecordingNavigator::at("/", false),
        );
        sync.initialize().await;

        assert_eq!(sync.navigation_settled(), None);
        assert_eq!(sync.nav_state(), NavState::Idle);
        assert!(sync.navigator().visits().is_empty());
    }

    #[tokio::test]
    async fn test_arrival_at_target_settles_redirect() {
        let sync = SessionSynchronizer::new(
            Arc::new(FakeProvider::new(None)),
            RecordingNavigator::at("/profile", true),
        );

        sync.initialize().await;
        // The navigator followed the redirect; the next evaluation sees arrival.
        assert_eq!(sync.evaluate(), None);
        assert_eq!(sync.nav_state(), NavState::Idle);
    }

    #[tokio::test]
    async fn test_run_follows_provider_events() {
        let provider = Arc::new(FakeProvider::new(None));
        let sync = Arc::new(SessionSynchronizer::new(
            provider.clone(),
            RecordingNavigator::at("/login", true),
        ));
        let (stop, shutdown) = oneshot::channel();

        let task = tokio::spawn({
            let sync = sync.clone();
            async move { sync.run(shutdown).await }
        });

        for _ in 0..100 {
            if sync.state().is_initialized {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        provider
            .events
            .send(SessionEvent::SignedIn(session("u1")))
            .unwrap();

        for _ in 0..100 {
            if !sync.navigator().visits().is_empty() {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }

        assert_eq!(sync.navigator().visits(), vec!["/".to_string()]);
        stop.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_during_initial_fetch_applies_nothing() {
        let mut provider = FakeProvider::new(Some(session("u1")));
        provider.delay = Some(StdDuration::from_millis(200));
        let sync = SessionSynchronizer::new(
            Arc::new(provider),
            RecordingNavigator::at("/login", true),
        );
        let (stop, shutdown) = oneshot::channel();

        stop.send(()).unwrap();
        sync.run(shutdown).await;

        assert_eq!(sync.state(), AuthState::default());
        assert!(sync.navigator().visits().is_empty());
    }
}
