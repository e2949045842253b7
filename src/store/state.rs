//! Cached entity state and its read-side queries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{AppUser, Bean, Review, ReviewComment, ReviewLike, Roaster};

/// Every cached collection, keyed by document ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub users: BTreeMap<String, AppUser>,
    #[serde(default)]
    pub roasters: BTreeMap<String, Roaster>,
    #[serde(default)]
    pub beans: BTreeMap<String, Bean>,
    #[serde(default)]
    pub reviews: BTreeMap<String, Review>,
    #[serde(default)]
    pub review_likes: BTreeMap<String, ReviewLike>,
    #[serde(default)]
    pub review_comments: BTreeMap<String, ReviewComment>,

    /// Set while a hydration from the backend is in progress. Never persisted.
    #[serde(skip)]
    pub loading: bool,
}

impl StoreState {
    /// True when no collection holds a document.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.roasters.is_empty()
            && self.beans.is_empty()
            && self.reviews.is_empty()
            && self.review_likes.is_empty()
            && self.review_comments.is_empty()
    }

    /// Beans of one roaster, by name.
    pub fn beans_for_roaster(&self, roaster_id: &str) -> Vec<&Bean> {
        let mut beans: Vec<_> = self
            .beans
            .values()
            .filter(|bean| bean.roaster_id == roaster_id)
            .collect();
        beans.sort_by(|a, b| a.name.cmp(&b.name));
        beans
    }

    /// Reviews of one bean, newest first.
    pub fn reviews_for_bean(&self, bean_id: &str) -> Vec<&Review> {
        newest_first(self.reviews.values().filter(|r| r.bean_id == bean_id))
    }

    /// Most recent reviews across the community.
    pub fn recent_reviews(&self, limit: usize) -> Vec<&Review> {
        let mut reviews = newest_first(self.reviews.values());
        reviews.truncate(limit);
        reviews
    }

    /// Reviews written by the users `user_id` follows, newest first.
    pub fn feed_for(&self, user_id: &str, limit: usize) -> Vec<&Review> {
        let Some(user) = self.users.get(user_id) else {
            return Vec::new();
        };
        let mut reviews = newest_first(
            self.reviews
                .values()
                .filter(|r| user.following.contains(&r.user_id)),
        );
        reviews.truncate(limit);
        reviews
    }

    /// Comments on one review, oldest first.
    pub fn comments_for_review(&self, review_id: &str) -> Vec<&ReviewComment> {
        let mut comments: Vec<_> = self
            .review_comments
            .values()
            .filter(|c| c.review_id == review_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        comments
    }

    pub fn like_count(&self, review_id: &str) -> usize {
        self.review_likes
            .values()
            .filter(|l| l.review_id == review_id)
            .count()
    }

    /// The like `user_id` left on `review_id`, if any.
    pub fn find_like(&self, review_id: &str, user_id: &str) -> Option<&ReviewLike> {
        self.review_likes
            .values()
            .find(|l| l.review_id == review_id && l.user_id == user_id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&AppUser> {
        self.users.values().find(|u| u.username == username)
    }

    pub fn roaster_by_slug(&self, slug: &str) -> Option<&Roaster> {
        self.roasters.values().find(|r| r.slug == slug)
    }

    /// First variant of `base` (`base`, `base2`, `base3`, ...) that no other
    /// user holds.
    pub fn free_username(&self, base: &str, user_id: &str) -> String {
        let taken = |name: &str| {
            self.user_by_username(name)
                .is_some_and(|existing| existing.id != user_id)
        };
        if !taken(base) {
            return base.to_string();
        }
        (2..=self.users.len() + 1)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| format!("{base}_{user_id}"))
    }

    /// `slug` if free, else `slug-<id prefix>`; `None` if both are taken.
    pub fn free_slug(&self, slug: &str, roaster_id: &str) -> Option<String> {
        let taken = |candidate: &str| {
            self.roaster_by_slug(candidate)
                .is_some_and(|existing| existing.id != roaster_id)
        };
        if !taken(slug) {
            return Some(slug.to_string());
        }
        let prefix = roaster_id.get(..8).unwrap_or(roaster_id);
        let fallback = format!("{slug}-{prefix}");
        (!taken(&fallback)).then_some(fallback)
    }
}

fn newest_first<'a>(reviews: impl Iterator<Item = &'a Review>) -> Vec<&'a Review> {
    let mut reviews: Vec<_> = reviews.collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    reviews
}
