// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod bean;
pub mod review;
pub mod roaster;
pub mod session;
pub mod user;

pub use bean::{Bean, FlavorIntensity};
pub use review::{Review, ReviewComment, ReviewLike};
pub use roaster::{Coordinates, Roaster};
pub use session::{Session, SessionUser};
pub use user::AppUser;
