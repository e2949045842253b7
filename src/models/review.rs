// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Review model and its child records (likes, comments).

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A bean review stored in the `reviews` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Review {
    /// Document ID
    pub id: String,
    /// Author
    pub user_id: String,
    pub bean_id: String,
    /// Overall rating, 1-5
    pub rating: u8,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub brew_method: Option<String>,
    #[serde(default)]
    pub flavor_notes: Vec<String>,

    // ─── Tasting scores (1-5) ────────────────────────────────────
    #[serde(default)]
    pub aroma: Option<u8>,
    #[serde(default)]
    pub body: Option<u8>,
    #[serde(default)]
    pub acidity: Option<u8>,
    #[serde(default)]
    pub sweetness: Option<u8>,
    #[serde(default)]
    pub aftertaste: Option<u8>,

    #[serde(default)]
    pub photo_url: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A like on a review, keyed by (review_id, user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReviewLike {
    pub id: String,
    pub review_id: String,
    pub user_id: String,
    pub created_at: String,
}

/// A comment on a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReviewComment {
    pub id: String,
    pub review_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}
