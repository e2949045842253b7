// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public browse routes: roasters, beans, reviews and profiles.
//!
//! Everything here reads from the entity store; none of it needs a session.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::{AppUser, Bean, Review, ReviewComment, Roaster};
use crate::store::StoreState;
use crate::AppState;

/// Default and maximum page size for review lists.
const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/roasters", get(list_roasters))
        .route("/api/roasters/{id}", get(get_roaster))
        .route("/api/beans", get(list_beans))
        .route("/api/beans/{id}", get(get_bean))
        .route("/api/beans/{id}/reviews", get(get_bean_reviews))
        .route("/api/reviews", get(get_recent_reviews))
        .route("/api/reviews/{id}/comments", get(get_review_comments))
        .route("/api/users/{id}", get(get_user))
}

// ─── Response types ──────────────────────────────────────────

/// Author details shown next to a review or comment.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub level: u32,
}

impl From<&AppUser> for AuthorSummary {
    fn from(user: &AppUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            level: user.level,
        }
    }
}

/// A review with its author and engagement counts.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub author: Option<AuthorSummary>,
    pub bean_name: Option<String>,
    pub like_count: usize,
    pub comment_count: usize,
}

impl ReviewView {
    pub fn build(state: &StoreState, review: &Review) -> Self {
        Self {
            review: review.clone(),
            author: state.users.get(&review.user_id).map(AuthorSummary::from),
            bean_name: state.beans.get(&review.bean_id).map(|b| b.name.clone()),
            like_count: state.like_count(&review.id),
            comment_count: state.comments_for_review(&review.id).len(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoasterSummary {
    #[serde(flatten)]
    pub roaster: Roaster,
    pub bean_count: usize,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoasterDetail {
    #[serde(flatten)]
    pub roaster: Roaster,
    pub beans: Vec<Bean>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BeanDetail {
    #[serde(flatten)]
    pub bean: Bean,
    pub roaster: Option<Roaster>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: ReviewComment,
    pub author: Option<AuthorSummary>,
}

/// Profile as seen by other users: no private sets.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub favorite_styles: Vec<String>,
    pub badges: Vec<String>,
    pub level: u32,
    pub experience_points: u32,
    pub review_count: u32,
    pub follower_count: usize,
    pub following_count: usize,
    pub reviews: Vec<ReviewView>,
    pub created_at: String,
}

// ─── Query parameters ────────────────────────────────────────

#[derive(Deserialize)]
pub struct BeansQuery {
    #[serde(default)]
    roaster_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    limit: Option<usize>,
}

impl LimitQuery {
    pub fn resolve(&self) -> Result<usize> {
        match self.limit {
            None => Ok(DEFAULT_LIMIT),
            Some(0) => Err(AppError::BadRequest("limit must be positive".to_string())),
            Some(n) if n > MAX_LIMIT => Err(AppError::BadRequest(format!(
                "limit must be at most {}",
                MAX_LIMIT
            ))),
            Some(n) => Ok(n),
        }
    }
}

// ─── Handlers ────────────────────────────────────────────────

/// Look up a roaster by ID, falling back to its slug.
fn find_roaster<'a>(state: &'a StoreState, key: &str) -> Option<&'a Roaster> {
    state
        .roasters
        .get(key)
        .or_else(|| state.roaster_by_slug(key))
}

async fn list_roasters(State(state): State<Arc<AppState>>) -> Json<Vec<RoasterSummary>> {
    let roasters = state.store.read(|s| {
        let mut roasters: Vec<RoasterSummary> = s
            .roasters
            .values()
            .map(|r| RoasterSummary {
                roaster: r.clone(),
                bean_count: s.beans_for_roaster(&r.id).len(),
            })
            .collect();
        roasters.sort_by(|a, b| a.roaster.name.cmp(&b.roaster.name));
        roasters
    });
    Json(roasters)
}

async fn get_roaster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RoasterDetail>> {
    state
        .store
        .read(|s| {
            find_roaster(s, &id).map(|roaster| RoasterDetail {
                roaster: roaster.clone(),
                beans: s
                    .beans_for_roaster(&roaster.id)
                    .into_iter()
                    .cloned()
                    .collect(),
            })
        })
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Roaster {} not found", id)))
}

async fn list_beans(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BeansQuery>,
) -> Json<Vec<Bean>> {
    let beans = state.store.read(|s| match &params.roaster_id {
        Some(roaster_id) => s
            .beans_for_roaster(roaster_id)
            .into_iter()
            .cloned()
            .collect(),
        None => {
            let mut beans: Vec<Bean> = s.beans.values().cloned().collect();
            beans.sort_by(|a, b| a.name.cmp(&b.name));
            beans
        }
    });
    Json(beans)
}

async fn get_bean(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BeanDetail>> {
    state
        .store
        .read(|s| {
            s.beans.get(&id).map(|bean| BeanDetail {
                bean: bean.clone(),
                roaster: s.roasters.get(&bean.roaster_id).cloned(),
            })
        })
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Bean {} not found", id)))
}

async fn get_bean_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReviewView>>> {
    state
        .store
        .read(|s| {
            s.beans.get(&id).map(|_| {
                s.reviews_for_bean(&id)
                    .into_iter()
                    .map(|r| ReviewView::build(s, r))
                    .collect()
            })
        })
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Bean {} not found", id)))
}

async fn get_recent_reviews(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<ReviewView>>> {
    let limit = params.resolve()?;
    Ok(Json(state.store.read(|s| {
        s.recent_reviews(limit)
            .into_iter()
            .map(|r| ReviewView::build(s, r))
            .collect()
    })))
}

async fn get_review_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CommentView>>> {
    state
        .store
        .read(|s| {
            s.reviews.get(&id).map(|_| {
                s.comments_for_review(&id)
                    .into_iter()
                    .map(|c| CommentView {
                        comment: c.clone(),
                        author: s.users.get(&c.user_id).map(AuthorSummary::from),
                    })
                    .collect()
            })
        })
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Review {} not found", id)))
}

/// Public profile by user ID or username.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PublicProfile>> {
    state
        .store
        .read(|s| {
            let user = s.users.get(&id).or_else(|| s.user_by_username(&id))?;
            let mut reviews: Vec<&Review> = user
                .review_ids
                .iter()
                .filter_map(|rid| s.reviews.get(rid))
                .collect();
            reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            Some(PublicProfile {
                id: user.id.clone(),
                username: user.username.clone(),
                name: user.name.clone(),
                avatar_url: user.avatar_url.clone(),
                bio: user.bio.clone(),
                favorite_styles: user.favorite_styles.clone(),
                badges: user.badges.clone(),
                level: user.level,
                experience_points: user.experience_points,
                review_count: user.review_count,
                follower_count: user.followers.len(),
                following_count: user.following.len(),
                reviews: reviews.into_iter().map(|r| ReviewView::build(s, r)).collect(),
                created_at: user.created_at.clone(),
            })
        })
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}
