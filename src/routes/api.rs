// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.
//!
//! Every write goes through [`crate::services::SyncService::apply`], which
//! writes to the backend before the store commits. Create requests may carry
//! a client-generated `id`; resubmitting the same request after a failure is
//! then a no-op instead of a duplicate.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use super::catalog::{LimitQuery, ReviewView};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::roaster::slugify;
use crate::models::{
    AppUser, Bean, Coordinates, FlavorIntensity, Review, ReviewComment, ReviewLike, Roaster,
};
use crate::services::ensure_profile;
use crate::store::{Action, ProfileUpdate, ReviewUpdate};
use crate::time_utils::now_rfc3339;
use crate::AppState;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/feed", get(get_feed))
        .route("/api/roasters", post(create_roaster))
        .route("/api/roasters/{id}/visited", post(toggle_visited))
        .route("/api/beans", post(create_bean))
        .route("/api/reviews", post(create_review))
        .route("/api/reviews/{id}", put(update_review).delete(delete_review))
        .route("/api/reviews/{id}/like", post(toggle_like))
        .route("/api/reviews/{id}/comments", post(create_comment))
        .route("/api/users/{id}/follow", post(toggle_follow))
}

fn validate<T: Validate>(payload: &T) -> Result<()> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Client-supplied ID, or a fresh one.
fn entity_id(requested: Option<Uuid>) -> String {
    requested.unwrap_or_else(Uuid::new_v4).to_string()
}

/// The caller's profile, created on first use.
async fn profile(state: &AppState, user: &AuthUser) -> Result<AppUser> {
    ensure_profile(&state.sync, &user.user_id, user.email.as_deref()).await
}

// ─── Profile ─────────────────────────────────────────────────

/// Get the current user's full profile, including private sets.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AppUser>> {
    profile(&state, &user).await.map(Json)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileEdit {
    #[validate(length(min = 3, max = 30), custom(function = "validate_username"))]
    pub username: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub name: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(length(max = 10))]
    pub favorite_styles: Option<Vec<String>>,
}

fn validate_username(username: &str) -> std::result::Result<(), validator::ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("username_charset"))
    }
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(edit): Json<ProfileEdit>,
) -> Result<Json<AppUser>> {
    validate(&edit)?;
    profile(&state, &user).await?;

    state
        .sync
        .apply(Action::UpdateProfile {
            user_id: user.user_id.clone(),
            update: ProfileUpdate {
                username: edit.username,
                name: edit.name,
                avatar_url: edit.avatar_url,
                bio: edit.bio,
                favorite_styles: edit.favorite_styles,
            },
        })
        .await?;

    profile(&state, &user).await.map(Json)
}

/// Reviews by the users the caller follows.
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<ReviewView>>> {
    let limit = params.resolve()?;
    Ok(Json(state.store.read(|s| {
        s.feed_for(&user.user_id, limit)
            .into_iter()
            .map(|r| ReviewView::build(s, r))
            .collect()
    })))
}

// ─── Catalog contributions ───────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct NewRoaster {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub location: String,
    #[serde(default)]
    #[validate(nested)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub specialties: Vec<String>,
}

async fn create_roaster(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(new): Json<NewRoaster>,
) -> Result<(StatusCode, Json<Roaster>)> {
    validate(&new)?;
    profile(&state, &user).await?;

    let id = entity_id(new.id);
    let base_slug = slugify(&new.name);
    if base_slug.is_empty() {
        return Err(AppError::BadRequest(
            "Roaster name needs at least one letter or digit".to_string(),
        ));
    }

    let roaster = Roaster {
        id: id.clone(),
        slug: base_slug,
        name: new.name.trim().to_string(),
        location: new.location,
        coordinates: new.coordinates,
        description: new.description,
        specialties: new.specialties,
        created_by: Some(user.user_id.clone()),
        created_at: now_rfc3339(),
    };

    state.sync.apply(Action::AddRoaster(roaster)).await?;
    tracing::info!(roaster_id = %id, user_id = %user.user_id, "Roaster added");

    stored(&state, |s| s.roasters.get(&id).cloned(), "Roaster", &id)
        .map(|r| (StatusCode::CREATED, Json(r)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewBean {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub roaster_id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub origin: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub process: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub roast_level: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub tasting_notes: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub flavor_profile: Vec<FlavorIntensity>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 10000.0))]
    pub price: Option<f64>,
}

async fn create_bean(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(new): Json<NewBean>,
) -> Result<(StatusCode, Json<Bean>)> {
    validate(&new)?;
    profile(&state, &user).await?;

    let id = entity_id(new.id);
    let bean = Bean {
        id: id.clone(),
        roaster_id: new.roaster_id,
        name: new.name.trim().to_string(),
        origin: new.origin,
        process: new.process,
        roast_level: new.roast_level,
        tasting_notes: new.tasting_notes,
        flavor_profile: new.flavor_profile,
        price: new.price,
        rating: None,
        review_count: 0,
        created_by: Some(user.user_id.clone()),
        created_at: now_rfc3339(),
    };

    state.sync.apply(Action::AddBean(bean)).await?;
    tracing::info!(bean_id = %id, user_id = %user.user_id, "Bean added");

    stored(&state, |s| s.beans.get(&id).cloned(), "Bean", &id)
        .map(|b| (StatusCode::CREATED, Json(b)))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VisitedResponse {
    pub roaster_id: String,
    pub visited: bool,
}

async fn toggle_visited(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(roaster_id): Path<String>,
) -> Result<Json<VisitedResponse>> {
    profile(&state, &user).await?;

    state
        .sync
        .apply(Action::ToggleVisited {
            user_id: user.user_id.clone(),
            roaster_id: roaster_id.clone(),
        })
        .await?;

    let visited = state.store.read(|s| {
        s.users
            .get(&user.user_id)
            .is_some_and(|u| u.visited_roasters.contains(&roaster_id))
    });
    Ok(Json(VisitedResponse {
        roaster_id,
        visited,
    }))
}

// ─── Reviews ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct NewReview {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub bean_id: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub brew_method: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub flavor_notes: Vec<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5))]
    pub aroma: Option<u8>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5))]
    pub body: Option<u8>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5))]
    pub acidity: Option<u8>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5))]
    pub sweetness: Option<u8>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5))]
    pub aftertaste: Option<u8>,
    #[serde(default)]
    #[validate(url)]
    pub photo_url: Option<String>,
}

/// Publish a review. Resubmitting with the same `id` returns the stored
/// review without counting it twice.
async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(new): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    validate(&new)?;
    profile(&state, &user).await?;

    let id = entity_id(new.id);

    let review = Review {
        id: id.clone(),
        user_id: user.user_id.clone(),
        bean_id: new.bean_id,
        rating: new.rating,
        content: new.content,
        brew_method: new.brew_method,
        flavor_notes: new.flavor_notes,
        aroma: new.aroma,
        body: new.body,
        acidity: new.acidity,
        sweetness: new.sweetness,
        aftertaste: new.aftertaste,
        photo_url: new.photo_url,
        created_at: now_rfc3339(),
        updated_at: None,
    };

    let changes = state.sync.apply(Action::AddReview(review)).await?;
    if changes.is_empty() {
        tracing::info!(review_id = %id, "Duplicate review submission ignored");
    } else {
        tracing::info!(review_id = %id, user_id = %user.user_id, "Review published");
    }

    stored(&state, |s| s.reviews.get(&id).cloned(), "Review", &id)
        .map(|r| (StatusCode::CREATED, Json(r)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewEdit {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<u8>,
    #[validate(length(min = 1, max = 5000))]
    pub content: Option<String>,
    #[validate(length(max = 50))]
    pub brew_method: Option<String>,
    #[validate(length(max = 20))]
    pub flavor_notes: Option<Vec<String>>,
    #[validate(range(min = 1, max = 5))]
    pub aroma: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub body: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub acidity: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub sweetness: Option<u8>,
    #[validate(range(min = 1, max = 5))]
    pub aftertaste: Option<u8>,
    #[validate(url)]
    pub photo_url: Option<String>,
}

async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(review_id): Path<String>,
    Json(edit): Json<ReviewEdit>,
) -> Result<Json<Review>> {
    validate(&edit)?;

    state
        .sync
        .apply(Action::UpdateReview {
            review_id: review_id.clone(),
            user_id: user.user_id.clone(),
            update: ReviewUpdate {
                rating: edit.rating,
                content: edit.content,
                brew_method: edit.brew_method,
                flavor_notes: edit.flavor_notes,
                aroma: edit.aroma,
                body: edit.body,
                acidity: edit.acidity,
                sweetness: edit.sweetness,
                aftertaste: edit.aftertaste,
                photo_url: edit.photo_url,
            },
            at: now_rfc3339(),
        })
        .await?;

    stored(&state, |s| s.reviews.get(&review_id).cloned(), "Review", &review_id).map(Json)
}

async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(review_id): Path<String>,
) -> Result<StatusCode> {
    state
        .sync
        .apply(Action::DeleteReview {
            review_id: review_id.clone(),
            user_id: user.user_id.clone(),
        })
        .await?;

    tracing::info!(review_id = %review_id, user_id = %user.user_id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: usize,
}

async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(review_id): Path<String>,
) -> Result<Json<LikeResponse>> {
    profile(&state, &user).await?;

    state
        .sync
        .apply(Action::ToggleLike(ReviewLike {
            id: Uuid::new_v4().to_string(),
            review_id: review_id.clone(),
            user_id: user.user_id.clone(),
            created_at: now_rfc3339(),
        }))
        .await?;

    Ok(Json(state.store.read(|s| LikeResponse {
        liked: s.find_like(&review_id, &user.user_id).is_some(),
        like_count: s.like_count(&review_id),
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewComment {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(review_id): Path<String>,
    Json(new): Json<NewComment>,
) -> Result<(StatusCode, Json<ReviewComment>)> {
    validate(&new)?;
    profile(&state, &user).await?;

    let id = entity_id(new.id);
    state
        .sync
        .apply(Action::AddComment(ReviewComment {
            id: id.clone(),
            review_id,
            user_id: user.user_id.clone(),
            content: new.content,
            created_at: now_rfc3339(),
        }))
        .await?;

    stored(&state, |s| s.review_comments.get(&id).cloned(), "Comment", &id)
        .map(|c| (StatusCode::CREATED, Json(c)))
}

// ─── Social ──────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FollowResponse {
    pub following: bool,
    pub follower_count: usize,
}

async fn toggle_follow(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(followee_id): Path<String>,
) -> Result<Json<FollowResponse>> {
    profile(&state, &user).await?;

    state
        .sync
        .apply(Action::ToggleFollow {
            follower_id: user.user_id.clone(),
            followee_id: followee_id.clone(),
        })
        .await?;

    Ok(Json(state.store.read(|s| {
        let followers = s.users.get(&followee_id).map(|u| &u.followers);
        FollowResponse {
            following: followers.is_some_and(|f| f.contains(&user.user_id)),
            follower_count: followers.map_or(0, |f| f.len()),
        }
    })))
}

/// Read back an entity after a committed write.
fn stored<T>(
    state: &AppState,
    find: impl FnOnce(&crate::store::StoreState) -> Option<T>,
    kind: &str,
    id: &str,
) -> Result<T> {
    state
        .store
        .read(find)
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind, id)))
}
