//! User model for storage and API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Experience granted for each published review.
pub const REVIEW_EXPERIENCE: u32 = 10;
/// Experience needed per level.
const EXPERIENCE_PER_LEVEL: u32 = 100;

/// Badges awarded once a review count threshold is reached.
const REVIEW_BADGES: &[(u32, &str)] = &[
    (1, "first_sip"),
    (10, "regular"),
    (50, "connoisseur"),
];

/// Application user profile stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AppUser {
    /// Identity provider user ID (also used as document ID)
    pub id: String,
    pub username: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub favorite_styles: Vec<String>,
    /// IDs of users following this user
    #[serde(default)]
    pub followers: BTreeSet<String>,
    /// IDs of users this user follows
    #[serde(default)]
    pub following: BTreeSet<String>,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub experience_points: u32,

    // ─── Denormalized review counters ────────────────────────────
    #[serde(default)]
    pub review_ids: Vec<String>,
    #[serde(default)]
    pub review_count: u32,

    // ─── Private flags (only shown to the user themselves) ───────
    /// Beans this user has reviewed at least once
    #[serde(default)]
    pub tried_beans: BTreeSet<String>,
    /// Roasters this user marked as visited
    #[serde(default)]
    pub visited_roasters: BTreeSet<String>,

    /// When the profile was created (ISO 8601)
    #[serde(default)]
    pub created_at: String,
}

fn default_level() -> u32 {
    1
}

impl AppUser {
    /// Build a fresh profile for a first login.
    pub fn new(id: &str, username: &str, name: &str, created_at: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            name: name.to_string(),
            avatar_url: None,
            bio: None,
            favorite_styles: Vec::new(),
            followers: BTreeSet::new(),
            following: BTreeSet::new(),
            badges: Vec::new(),
            level: default_level(),
            experience_points: 0,
            review_ids: Vec::new(),
            review_count: 0,
            tried_beans: BTreeSet::new(),
            visited_roasters: BTreeSet::new(),
            created_at: created_at.to_string(),
        }
    }

    /// Record a newly published review against this user's counters.
    pub fn record_review(&mut self, review_id: &str, bean_id: &str) {
        self.review_count += 1;
        self.review_ids.push(review_id.to_string());
        self.tried_beans.insert(bean_id.to_string());
        self.experience_points += REVIEW_EXPERIENCE;
        self.level = level_for(self.experience_points);

        for (threshold, badge) in REVIEW_BADGES {
            if self.review_count >= *threshold && !self.badges.iter().any(|b| b == badge) {
                self.badges.push((*badge).to_string());
            }
        }
    }

    /// Undo the counters of a deleted review. Counts never go below zero.
    ///
    /// Earned badges and tried beans are kept.
    pub fn forget_review(&mut self, review_id: &str) {
        self.review_count = self.review_count.saturating_sub(1);
        self.review_ids.retain(|id| id != review_id);
        self.experience_points = self.experience_points.saturating_sub(REVIEW_EXPERIENCE);
        self.level = level_for(self.experience_points);
    }
}

/// Level derived from accumulated experience.
pub fn level_for(experience_points: u32) -> u32 {
    experience_points / EXPERIENCE_PER_LEVEL + 1
}
