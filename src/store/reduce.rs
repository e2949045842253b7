//! Pure state transitions of the entity store.
//!
//! [`reduce`] never touches the outside world: it takes the current state and
//! an action and returns the next state plus the list of documents that
//! changed, which callers replay against the backend before committing.

use crate::db::Collection;
use crate::models::bean::average_rating;
use crate::models::{AppUser, Review, Roaster};

use super::action::{Action, ProfileUpdate, ReviewUpdate};
use super::StoreState;

/// A document touched by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Insert { collection: Collection, id: String },
    Update { collection: Collection, id: String },
    Delete { collection: Collection, id: String },
}

impl Change {
    fn insert(collection: Collection, id: &str) -> Self {
        Change::Insert {
            collection,
            id: id.to_string(),
        }
    }

    fn update(collection: Collection, id: &str) -> Self {
        Change::Update {
            collection,
            id: id.to_string(),
        }
    }

    fn delete(collection: Collection, id: &str) -> Self {
        Change::Delete {
            collection,
            id: id.to_string(),
        }
    }
}

/// Result of reducing one action.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: StoreState,
    pub changes: Vec<Change>,
}

/// Errors raised when an action would break a store invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("User {0} not found")]
    UnknownUser(String),

    #[error("Roaster {0} not found")]
    UnknownRoaster(String),

    #[error("Bean {0} not found")]
    UnknownBean(String),

    #[error("Review {0} not found")]
    UnknownReview(String),

    #[error("Review {review_id} was not written by {user_id}")]
    NotAuthor { review_id: String, user_id: String },

    #[error("Users cannot follow themselves")]
    SelfFollow,

    #[error("Username {0} is already taken")]
    UsernameTaken(String),

    #[error("Roaster slug {0} is already taken")]
    SlugTaken(String),
}

/// Compute the transition for `action` applied to `state`.
///
/// Adding an entity whose ID already exists is a no-op, so a client that
/// resubmits after a failed call (with the same ID) never double counts.
pub fn reduce(state: &StoreState, action: &Action) -> Result<Transition, StoreError> {
    let mut next = state.clone();
    let mut changes = Vec::new();

    match action {
        Action::Hydrate(loaded) => {
            next = StoreState {
                loading: false,
                ..(**loaded).clone()
            };
        }

        Action::EnsureUser(user) => {
            if !next.users.contains_key(&user.id) {
                let mut user = user.clone();
                user.username = next.free_username(&user.username, &user.id);
                changes.push(Change::insert(Collection::Users, &user.id));
                next.users.insert(user.id.clone(), user);
            }
        }

        Action::UpdateProfile { user_id, update } => {
            if let Some(username) = &update.username {
                if next
                    .user_by_username(username)
                    .is_some_and(|other| other.id != *user_id)
                {
                    return Err(StoreError::UsernameTaken(username.clone()));
                }
            }
            let user = next
                .users
                .get_mut(user_id)
                .ok_or_else(|| StoreError::UnknownUser(user_id.clone()))?;
            apply_profile_update(user, update);
            changes.push(Change::update(Collection::Users, user_id));
        }

        Action::AddRoaster(roaster) => {
            if !next.roasters.contains_key(&roaster.id) {
                let slug = next
                    .free_slug(&roaster.slug, &roaster.id)
                    .ok_or_else(|| StoreError::SlugTaken(roaster.slug.clone()))?;
                let roaster = Roaster {
                    slug,
                    ..roaster.clone()
                };
                changes.push(Change::insert(Collection::Roasters, &roaster.id));
                next.roasters.insert(roaster.id.clone(), roaster);
            }
        }

        Action::AddBean(bean) => {
            if !next.beans.contains_key(&bean.id) {
                if !next.roasters.contains_key(&bean.roaster_id) {
                    return Err(StoreError::UnknownRoaster(bean.roaster_id.clone()));
                }
                next.beans.insert(bean.id.clone(), bean.clone());
                changes.push(Change::insert(Collection::Beans, &bean.id));
            }
        }

        Action::AddReview(review) => {
            if let Some(existing) = next.reviews.get(&review.id) {
                if existing.user_id != review.user_id {
                    return Err(StoreError::NotAuthor {
                        review_id: review.id.clone(),
                        user_id: review.user_id.clone(),
                    });
                }
            } else {
                if !next.beans.contains_key(&review.bean_id) {
                    return Err(StoreError::UnknownBean(review.bean_id.clone()));
                }
                let author = next
                    .users
                    .get_mut(&review.user_id)
                    .ok_or_else(|| StoreError::UnknownUser(review.user_id.clone()))?;
                author.record_review(&review.id, &review.bean_id);
                next.reviews.insert(review.id.clone(), review.clone());
                refresh_bean_rating(&mut next, &review.bean_id);

                changes.push(Change::insert(Collection::Reviews, &review.id));
                changes.push(Change::update(Collection::Users, &review.user_id));
                changes.push(Change::update(Collection::Beans, &review.bean_id));
            }
        }

        Action::UpdateReview {
            review_id,
            user_id,
            update,
            at,
        } => {
            let review = next
                .reviews
                .get_mut(review_id)
                .ok_or_else(|| StoreError::UnknownReview(review_id.clone()))?;
            if review.user_id != *user_id {
                return Err(StoreError::NotAuthor {
                    review_id: review_id.clone(),
                    user_id: user_id.clone(),
                });
            }
            let rating_changed = apply_review_update(review, update);
            review.updated_at = Some(at.clone());
            let bean_id = review.bean_id.clone();
            changes.push(Change::update(Collection::Reviews, review_id));

            if rating_changed && refresh_bean_rating(&mut next, &bean_id) {
                changes.push(Change::update(Collection::Beans, &bean_id));
            }
        }

        Action::DeleteReview { review_id, user_id } => {
            let Some(review) = next.reviews.remove(review_id) else {
                return Err(StoreError::UnknownReview(review_id.clone()));
            };
            if review.user_id != *user_id {
                return Err(StoreError::NotAuthor {
                    review_id: review_id.clone(),
                    user_id: user_id.clone(),
                });
            }

            let like_ids: Vec<String> = next
                .review_likes
                .values()
                .filter(|l| l.review_id == *review_id)
                .map(|l| l.id.clone())
                .collect();
            for id in like_ids {
                next.review_likes.remove(&id);
                changes.push(Change::delete(Collection::ReviewLikes, &id));
            }

            let comment_ids: Vec<String> = next
                .review_comments
                .values()
                .filter(|c| c.review_id == *review_id)
                .map(|c| c.id.clone())
                .collect();
            for id in comment_ids {
                next.review_comments.remove(&id);
                changes.push(Change::delete(Collection::ReviewComments, &id));
            }

            changes.push(Change::delete(Collection::Reviews, review_id));

            if let Some(author) = next.users.get_mut(user_id) {
                author.forget_review(review_id);
                changes.push(Change::update(Collection::Users, user_id));
            }
            if refresh_bean_rating(&mut next, &review.bean_id) {
                changes.push(Change::update(Collection::Beans, &review.bean_id));
            }
        }

        Action::ToggleVisited {
            user_id,
            roaster_id,
        } => {
            if !next.roasters.contains_key(roaster_id) {
                return Err(StoreError::UnknownRoaster(roaster_id.clone()));
            }
            let user = next
                .users
                .get_mut(user_id)
                .ok_or_else(|| StoreError::UnknownUser(user_id.clone()))?;
            if !user.visited_roasters.remove(roaster_id) {
                user.visited_roasters.insert(roaster_id.clone());
            }
            changes.push(Change::update(Collection::Users, user_id));
        }

        Action::ToggleFollow {
            follower_id,
            followee_id,
        } => {
            if follower_id == followee_id {
                return Err(StoreError::SelfFollow);
            }
            if !next.users.contains_key(followee_id) {
                return Err(StoreError::UnknownUser(followee_id.clone()));
            }
            let follower = next
                .users
                .get_mut(follower_id)
                .ok_or_else(|| StoreError::UnknownUser(follower_id.clone()))?;
            let now_following = !follower.following.remove(followee_id);
            if now_following {
                follower.following.insert(followee_id.clone());
            }

            if let Some(followee) = next.users.get_mut(followee_id) {
                if now_following {
                    followee.followers.insert(follower_id.clone());
                } else {
                    followee.followers.remove(follower_id);
                }
            }

            changes.push(Change::update(Collection::Users, follower_id));
            changes.push(Change::update(Collection::Users, followee_id));
        }

        Action::ToggleLike(like) => {
            if !next.reviews.contains_key(&like.review_id) {
                return Err(StoreError::UnknownReview(like.review_id.clone()));
            }
            if !next.users.contains_key(&like.user_id) {
                return Err(StoreError::UnknownUser(like.user_id.clone()));
            }

            let existing = next
                .find_like(&like.review_id, &like.user_id)
                .map(|l| l.id.clone());
            match existing {
                Some(id) => {
                    next.review_likes.remove(&id);
                    changes.push(Change::delete(Collection::ReviewLikes, &id));
                }
                None => {
                    next.review_likes.insert(like.id.clone(), like.clone());
                    changes.push(Change::insert(Collection::ReviewLikes, &like.id));
                }
            }
        }

        Action::AddComment(comment) => {
            if !next.review_comments.contains_key(&comment.id) {
                if !next.reviews.contains_key(&comment.review_id) {
                    return Err(StoreError::UnknownReview(comment.review_id.clone()));
                }
                if !next.users.contains_key(&comment.user_id) {
                    return Err(StoreError::UnknownUser(comment.user_id.clone()));
                }
                next.review_comments
                    .insert(comment.id.clone(), comment.clone());
                changes.push(Change::insert(Collection::ReviewComments, &comment.id));
            }
        }
    }

    Ok(Transition {
        state: next,
        changes,
    })
}

fn apply_profile_update(user: &mut AppUser, update: &ProfileUpdate) {
    if let Some(username) = &update.username {
        user.username = username.clone();
    }
    if let Some(name) = &update.name {
        user.name = name.clone();
    }
    if let Some(avatar_url) = &update.avatar_url {
        user.avatar_url = Some(avatar_url.clone());
    }
    if let Some(bio) = &update.bio {
        user.bio = Some(bio.clone());
    }
    if let Some(styles) = &update.favorite_styles {
        user.favorite_styles = styles.clone();
    }
}

/// Apply the edited fields; returns whether the rating changed.
fn apply_review_update(review: &mut Review, update: &ReviewUpdate) -> bool {
    let mut rating_changed = false;
    if let Some(rating) = update.rating {
        rating_changed = review.rating != rating;
        review.rating = rating;
    }
    if let Some(content) = &update.content {
        review.content = content.clone();
    }
    if let Some(brew_method) = &update.brew_method {
        review.brew_method = Some(brew_method.clone());
    }
    if let Some(notes) = &update.flavor_notes {
        review.flavor_notes = notes.clone();
    }
    if let Some(photo_url) = &update.photo_url {
        review.photo_url = Some(photo_url.clone());
    }

    let scores = [
        (&mut review.aroma, update.aroma),
        (&mut review.body, update.body),
        (&mut review.acidity, update.acidity),
        (&mut review.sweetness, update.sweetness),
        (&mut review.aftertaste, update.aftertaste),
    ];
    for (score, value) in scores {
        if value.is_some() {
            *score = value;
        }
    }

    rating_changed
}

/// Recompute a bean's mean rating and review count from its reviews.
///
/// Returns false when the bean is unknown.
fn refresh_bean_rating(state: &mut StoreState, bean_id: &str) -> bool {
    let ratings: Vec<u8> = state
        .reviews
        .values()
        .filter(|r| r.bean_id == bean_id)
        .map(|r| r.rating)
        .collect();

    match state.beans.get_mut(bean_id) {
        Some(bean) => {
            bean.rating = average_rating(&ratings);
            bean.review_count = ratings.len() as u32;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReviewComment, ReviewLike};
    use crate::store::seed::seed_state;

    fn make_review(id: &str, user_id: &str, bean_id: &str, rating: u8) -> Review {
        Review {
            id: id.to_string(),
            user_id: user_id.to_string(),
            bean_id: bean_id.to_string(),
            rating,
            content: "great".to_string(),
            brew_method: Some("V60".to_string()),
            flavor_notes: vec!["chocolate".to_string()],
            aroma: Some(4),
            body: None,
            acidity: None,
            sweetness: None,
            aftertaste: None,
            photo_url: None,
            created_at: format!("2026-02-01T00:00:0{}.000Z", rating),
            updated_at: None,
        }
    }

    fn apply(state: &StoreState, action: Action) -> StoreState {
        reduce(state, &action).expect("action should apply").state
    }

    #[test]
    fn test_add_review_updates_author_counters() {
        let state = seed_state();
        let review = make_review("r-1", "u1", "1", 5);

        let transition = reduce(&state, &Action::AddReview(review)).unwrap();
        let next = transition.state;

        assert_eq!(next.reviews.len(), 1);
        assert_eq!(next.users["u1"].review_count, 1);
        assert_eq!(next.users["u1"].review_ids, vec!["r-1".to_string()]);
        assert!(next.users["u1"].tried_beans.contains("1"));
        assert_eq!(next.beans["1"].rating, Some(5.0));
        assert_eq!(next.beans["1"].review_count, 1);
        assert_eq!(
            transition.changes,
            vec![
                Change::insert(Collection::Reviews, "r-1"),
                Change::update(Collection::Users, "u1"),
                Change::update(Collection::Beans, "1"),
            ]
        );
    }

    #[test]
    fn test_resubmitted_review_does_not_double_count() {
        let state = seed_state();
        let review = make_review("r-1", "u1", "1", 5);

        let once = apply(&state, Action::AddReview(review.clone()));
        let retry = reduce(&once, &Action::AddReview(review)).unwrap();

        assert!(retry.changes.is_empty());
        assert_eq!(retry.state.users["u1"].review_count, 1);
        assert_eq!(retry.state.users["u1"].tried_beans.len(), 1);
        assert_eq!(retry.state.reviews.len(), 1);
    }

    #[test]
    fn test_add_review_requires_existing_bean_and_user() {
        let state = seed_state();

        let result = reduce(&state, &Action::AddReview(make_review("r", "u1", "nope", 3)));
        assert_eq!(result.unwrap_err(), StoreError::UnknownBean("nope".to_string()));

        let result = reduce(&state, &Action::AddReview(make_review("r", "ghost", "1", 3)));
        assert_eq!(result.unwrap_err(), StoreError::UnknownUser("ghost".to_string()));
    }

    #[test]
    fn test_delete_review_decrements_and_cascades() {
        let state = seed_state();
        let mut next = apply(&state, Action::AddReview(make_review("r-1", "u1", "1", 4)));
        next = apply(
            &next,
            Action::ToggleLike(ReviewLike {
                id: "l-1".to_string(),
                review_id: "r-1".to_string(),
                user_id: "u2".to_string(),
                created_at: "2026-02-02T00:00:00.000Z".to_string(),
            }),
        );
        next = apply(
            &next,
            Action::AddComment(ReviewComment {
                id: "c-1".to_string(),
                review_id: "r-1".to_string(),
                user_id: "u2".to_string(),
                content: "agreed".to_string(),
                created_at: "2026-02-02T00:00:00.000Z".to_string(),
            }),
        );

        let transition = reduce(
            &next,
            &Action::DeleteReview {
                review_id: "r-1".to_string(),
                user_id: "u1".to_string(),
            },
        )
        .unwrap();
        let after = transition.state;

        assert!(after.reviews.is_empty());
        assert!(after.review_likes.is_empty());
        assert!(after.review_comments.is_empty());
        assert_eq!(after.users["u1"].review_count, 0);
        assert!(after.users["u1"].review_ids.is_empty());
        assert_eq!(after.beans["1"].rating, None);
        assert!(transition
            .changes
            .contains(&Change::delete(Collection::ReviewLikes, "l-1")));
        assert!(transition
            .changes
            .contains(&Change::delete(Collection::ReviewComments, "c-1")));
    }

    #[test]
    fn test_delete_review_count_floors_at_zero() {
        let mut state = seed_state();
        state
            .reviews
            .insert("r-x".to_string(), make_review("r-x", "u1", "1", 3));
        assert_eq!(state.users["u1"].review_count, 0);

        let after = apply(
            &state,
            Action::DeleteReview {
                review_id: "r-x".to_string(),
                user_id: "u1".to_string(),
            },
        );
        assert_eq!(after.users["u1"].review_count, 0);
    }

    #[test]
    fn test_only_author_can_edit_or_delete() {
        let state = seed_state();
        let next = apply(&state, Action::AddReview(make_review("r-1", "u1", "1", 4)));

        let result = reduce(
            &next,
            &Action::DeleteReview {
                review_id: "r-1".to_string(),
                user_id: "u2".to_string(),
            },
        );
        assert!(matches!(result, Err(StoreError::NotAuthor { .. })));

        let result = reduce(
            &next,
            &Action::UpdateReview {
                review_id: "r-1".to_string(),
                user_id: "u2".to_string(),
                update: ReviewUpdate::default(),
                at: "2026-02-03T00:00:00.000Z".to_string(),
            },
        );
        assert!(matches!(result, Err(StoreError::NotAuthor { .. })));
    }

    #[test]
    fn test_update_review_recomputes_bean_rating() {
        let state = seed_state();
        let mut next = apply(&state, Action::AddReview(make_review("r-1", "u1", "1", 4)));
        next = apply(&next, Action::AddReview(make_review("r-2", "u2", "1", 2)));
        assert_eq!(next.beans["1"].rating, Some(3.0));

        let transition = reduce(
            &next,
            &Action::UpdateReview {
                review_id: "r-2".to_string(),
                user_id: "u2".to_string(),
                update: ReviewUpdate {
                    rating: Some(5),
                    sweetness: Some(3),
                    ..ReviewUpdate::default()
                },
                at: "2026-02-03T00:00:00.000Z".to_string(),
            },
        )
        .unwrap();

        let review = &transition.state.reviews["r-2"];
        assert_eq!(review.rating, 5);
        assert_eq!(review.sweetness, Some(3));
        assert_eq!(review.aroma, Some(4));
        assert_eq!(review.updated_at.as_deref(), Some("2026-02-03T00:00:00.000Z"));
        assert_eq!(transition.state.beans["1"].rating, Some(4.5));
        assert!(transition
            .changes
            .contains(&Change::update(Collection::Beans, "1")));
    }

    #[test]
    fn test_toggle_visited_twice_restores_membership() {
        let state = seed_state();
        let toggle = Action::ToggleVisited {
            user_id: "u1".to_string(),
            roaster_id: "1".to_string(),
        };

        let once = apply(&state, toggle.clone());
        assert!(once.users["u1"].visited_roasters.contains("1"));

        let twice = apply(&once, toggle);
        assert_eq!(
            twice.users["u1"].visited_roasters,
            state.users["u1"].visited_roasters
        );
    }

    #[test]
    fn test_toggle_follow_updates_both_sides() {
        let state = seed_state();
        let follow = Action::ToggleFollow {
            follower_id: "u1".to_string(),
            followee_id: "u2".to_string(),
        };

        let followed = apply(&state, follow.clone());
        assert!(followed.users["u1"].following.contains("u2"));
        assert!(followed.users["u2"].followers.contains("u1"));

        let unfollowed = apply(&followed, follow);
        assert!(!unfollowed.users["u1"].following.contains("u2"));
        assert!(!unfollowed.users["u2"].followers.contains("u1"));
    }

    #[test]
    fn test_self_follow_is_rejected() {
        let state = seed_state();
        let result = reduce(
            &state,
            &Action::ToggleFollow {
                follower_id: "u1".to_string(),
                followee_id: "u1".to_string(),
            },
        );
        assert_eq!(result.unwrap_err(), StoreError::SelfFollow);
    }

    #[test]
    fn test_toggle_like_removes_existing_like_of_same_user() {
        let state = seed_state();
        let next = apply(&state, Action::AddReview(make_review("r-1", "u1", "1", 4)));
        let like = |id: &str| ReviewLike {
            id: id.to_string(),
            review_id: "r-1".to_string(),
            user_id: "u2".to_string(),
            created_at: "2026-02-02T00:00:00.000Z".to_string(),
        };

        let liked = apply(&next, Action::ToggleLike(like("l-1")));
        assert_eq!(liked.like_count("r-1"), 1);

        // The second toggle carries a fresh ID but still removes the first like.
        let unliked = reduce(&liked, &Action::ToggleLike(like("l-2"))).unwrap();
        assert_eq!(unliked.state.like_count("r-1"), 0);
        assert_eq!(
            unliked.changes,
            vec![Change::delete(Collection::ReviewLikes, "l-1")]
        );
    }

    #[test]
    fn test_add_bean_requires_roaster() {
        let state = seed_state();
        let mut bean = state.beans["1"].clone();
        bean.id = "new".to_string();
        bean.roaster_id = "missing".to_string();

        let result = reduce(&state, &Action::AddBean(bean));
        assert_eq!(
            result.unwrap_err(),
            StoreError::UnknownRoaster("missing".to_string())
        );
    }

    #[test]
    fn test_ensure_user_keeps_existing_profile() {
        let state = seed_state();
        let mut replacement = state.users["u1"].clone();
        replacement.name = "Someone Else".to_string();

        let transition = reduce(&state, &Action::EnsureUser(replacement)).unwrap();
        assert!(transition.changes.is_empty());
        assert_eq!(transition.state.users["u1"].name, state.users["u1"].name);
    }

    #[test]
    fn test_hydrate_replaces_collections_and_clears_loading() {
        let mut state = seed_state();
        state.loading = true;

        let next = apply(&state, Action::Hydrate(Box::new(StoreState::default())));
        assert!(next.roasters.is_empty());
        assert!(!next.loading);
    }

    fn new_roaster(id: &str, slug: &str) -> Roaster {
        Roaster {
            slug: slug.to_string(),
            id: id.to_string(),
            name: "Stumptown".to_string(),
            ..seed_state().roasters["1"].clone()
        }
    }

    #[test]
    fn test_update_profile_rejects_taken_username() {
        let state = seed_state();
        let action = Action::UpdateProfile {
            user_id: "u2".to_string(),
            update: ProfileUpdate {
                username: Some("coffee_lover".to_string()),
                ..Default::default()
            },
        };

        assert_eq!(
            reduce(&state, &action).unwrap_err(),
            StoreError::UsernameTaken("coffee_lover".to_string())
        );

        // Keeping your own username is fine.
        let keep = Action::UpdateProfile {
            user_id: "u1".to_string(),
            update: ProfileUpdate {
                username: Some("coffee_lover".to_string()),
                ..Default::default()
            },
        };
        assert!(reduce(&state, &keep).is_ok());
    }

    #[test]
    fn test_concurrent_first_logins_get_distinct_usernames() {
        let state = seed_state();
        let first = AppUser::new("a", "pour", "pour", "2026-03-01T00:00:00.000Z");
        let second = AppUser::new("b", "pour", "pour", "2026-03-01T00:00:00.000Z");

        let next = apply(&state, Action::EnsureUser(first));
        let next = apply(&next, Action::EnsureUser(second));

        assert_eq!(next.users["a"].username, "pour");
        assert_eq!(next.users["b"].username, "pour2");
        assert_eq!(next.user_by_username("pour").map(|u| u.id.as_str()), Some("a"));
    }

    #[test]
    fn test_add_roaster_disambiguates_slug() {
        let state = seed_state();

        let next = apply(
            &state,
            Action::AddRoaster(new_roaster("0b7e2a8c-1111-4000-8000-000000000000", "stumptown")),
        );
        assert_eq!(
            next.roasters["0b7e2a8c-1111-4000-8000-000000000000"].slug,
            "stumptown-0b7e2a8c"
        );

        // Same prefix and base slug: nothing left to fall back to.
        let clash = Action::AddRoaster(new_roaster("0b7e2a8c-2222-4000-8000-000000000000", "stumptown"));
        assert_eq!(
            reduce(&next, &clash).unwrap_err(),
            StoreError::SlugTaken("stumptown".to_string())
        );
    }

    #[test]
    fn test_reused_review_id_from_other_user_is_rejected() {
        let state = apply(&seed_state(), Action::AddReview(make_review("r-1", "u1", "1", 4)));

        let err = reduce(&state, &Action::AddReview(make_review("r-1", "u2", "2", 1))).unwrap_err();

        assert_eq!(
            err,
            StoreError::NotAuthor {
                review_id: "r-1".to_string(),
                user_id: "u2".to_string(),
            }
        );
        // The author resubmitting stays a no-op.
        let again = reduce(&state, &Action::AddReview(make_review("r-1", "u1", "1", 4))).unwrap();
        assert!(again.changes.is_empty());
    }
}
