// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, page guard, security headers).

pub mod auth;
pub mod page_guard;
pub mod security;

pub use auth::require_auth;
pub use page_guard::guard_pages;
