// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity providers, route classification and session synchronization.

pub mod gotrue;
pub mod local;
pub mod navigation;
pub mod provider;
pub mod sync;

pub use gotrue::GoTrueClient;
pub use local::LocalAuth;
pub use navigation::{classify, post_login_destination, redirect_for, Location, RouteClass};
pub use provider::{AuthApi, IdentityError, IdentityProvider, SessionEvent, SessionHandle};
pub use sync::{AuthState, NavState, Navigator, SessionSynchronizer};
