//! Typed mutations of the entity store.

use crate::models::{AppUser, Bean, Review, ReviewComment, ReviewLike, Roaster};

use super::StoreState;

/// Profile fields a user may edit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub favorite_styles: Option<Vec<String>>,
}

/// Review fields an author may edit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub content: Option<String>,
    pub brew_method: Option<String>,
    pub flavor_notes: Option<Vec<String>>,
    pub aroma: Option<u8>,
    pub body: Option<u8>,
    pub acidity: Option<u8>,
    pub sweetness: Option<u8>,
    pub aftertaste: Option<u8>,
    pub photo_url: Option<String>,
}

/// A store mutation. New entities arrive with their IDs already assigned.
#[derive(Debug, Clone)]
pub enum Action {
    /// Replace every collection with a freshly loaded state.
    Hydrate(Box<StoreState>),
    /// Create the profile on first login; an existing profile is kept as is.
    EnsureUser(AppUser),
    UpdateProfile {
        user_id: String,
        update: ProfileUpdate,
    },
    AddRoaster(Roaster),
    AddBean(Bean),
    AddReview(Review),
    UpdateReview {
        review_id: String,
        user_id: String,
        update: ReviewUpdate,
        at: String,
    },
    DeleteReview {
        review_id: String,
        user_id: String,
    },
    ToggleVisited {
        user_id: String,
        roaster_id: String,
    },
    ToggleFollow {
        follower_id: String,
        followee_id: String,
    },
    /// Like the review, or remove the existing like of the same user.
    ToggleLike(ReviewLike),
    AddComment(ReviewComment),
}

impl Action {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Hydrate(_) => "hydrate",
            Action::EnsureUser(_) => "ensure_user",
            Action::UpdateProfile { .. } => "update_profile",
            Action::AddRoaster(_) => "add_roaster",
            Action::AddBean(_) => "add_bean",
            Action::AddReview(_) => "add_review",
            Action::UpdateReview { .. } => "update_review",
            Action::DeleteReview { .. } => "delete_review",
            Action::ToggleVisited { .. } => "toggle_visited",
            Action::ToggleFollow { .. } => "toggle_follow",
            Action::ToggleLike(_) => "toggle_like",
            Action::AddComment(_) => "add_comment",
        }
    }
}
