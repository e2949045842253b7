// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod sync;

pub use accounts::ensure_profile;
pub use sync::{HydrateSource, SyncService};
