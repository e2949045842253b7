//! Database layer: the remote backend abstraction and its implementations.
//!
//! The backend is the authoritative copy of every collection. The entity
//! store in [`crate::store`] caches it and never talks to it directly.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::AppError;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ROASTERS: &str = "roasters";
    pub const BEANS: &str = "beans";
    pub const REVIEWS: &str = "reviews";
    pub const REVIEW_LIKES: &str = "review_likes";
    pub const REVIEW_COMMENTS: &str = "review_comments";
}

/// Typed handle for one of the backend collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Roasters,
    Beans,
    Reviews,
    ReviewLikes,
    ReviewComments,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::Roasters,
        Collection::Beans,
        Collection::Reviews,
        Collection::ReviewLikes,
        Collection::ReviewComments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => collections::USERS,
            Collection::Roasters => collections::ROASTERS,
            Collection::Beans => collections::BEANS,
            Collection::Reviews => collections::REVIEWS,
            Collection::ReviewLikes => collections::REVIEW_LIKES,
            Collection::ReviewComments => collections::REVIEW_COMMENTS,
        }
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A simple backend query: equality filters, one ordering, and a limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter on `field`.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Generic query interface of the hosted backend.
///
/// Documents are exchanged as JSON objects; every document carries its own
/// `id` field, which is also its document ID.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the documents of `collection` matching `query`.
    async fn select(&self, collection: &str, query: &Query) -> Result<Vec<Value>, AppError>;

    /// Create a new document.
    async fn insert(&self, collection: &str, id: &str, document: &Value) -> Result<(), AppError>;

    /// Replace (or create) a document.
    async fn update(&self, collection: &str, id: &str, document: &Value) -> Result<(), AppError>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;
}

/// Load a whole collection keyed by document ID.
///
/// Documents that do not match the expected shape are skipped with a warning.
pub async fn load_collection<T: DeserializeOwned>(
    backend: &dyn Backend,
    collection: Collection,
) -> Result<BTreeMap<String, T>, AppError> {
    let documents = backend.select(collection.name(), &Query::new()).await?;
    let mut loaded = BTreeMap::new();

    for document in documents {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        match (id, serde_json::from_value::<T>(document)) {
            (Some(id), Ok(entity)) => {
                loaded.insert(id, entity);
            }
            (_, Err(e)) => {
                tracing::warn!(
                    collection = collection.name(),
                    error = %e,
                    "Skipping malformed document"
                );
            }
            (None, Ok(_)) => {
                tracing::warn!(
                    collection = collection.name(),
                    "Skipping document without id"
                );
            }
        }
    }

    Ok(loaded)
}
