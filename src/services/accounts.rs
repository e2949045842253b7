// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application profiles for identity provider users.

use crate::error::AppError;
use crate::models::AppUser;
use crate::store::Action;
use crate::time_utils::now_rfc3339;

use super::SyncService;

/// Longest generated username (before any disambiguating suffix).
const MAX_USERNAME_LEN: usize = 24;

/// Username derived from the local part of an email address.
///
/// Keeps ASCII alphanumerics and `_`, lower-cased; falls back to `brewer`.
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut username: String = local
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| if c == '.' || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(MAX_USERNAME_LEN)
        .collect();
    if username.trim_matches('_').is_empty() {
        username = "brewer".to_string();
    }
    username
}

/// Make sure `user_id` has a profile, creating one on first login.
pub async fn ensure_profile(
    sync: &SyncService,
    user_id: &str,
    email: Option<&str>,
) -> Result<AppUser, AppError> {
    if let Some(existing) = sync.store().read(|state| state.users.get(user_id).cloned()) {
        return Ok(existing);
    }

    // The store picks a free variant of the username under its writer lock.
    let base = email.map(username_from_email).unwrap_or_else(|| "brewer".to_string());
    let profile = AppUser::new(user_id, &base, &base, &now_rfc3339());
    sync.apply(Action::EnsureUser(profile)).await?;

    let created = sync
        .store()
        .read(|state| state.users.get(user_id).cloned())
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
    tracing::info!(user_id = %user_id, username = %created.username, "Created profile on first login");
    Ok(created)
}
