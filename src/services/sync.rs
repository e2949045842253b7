// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Write-through between the entity store and the remote backend.
//!
//! The backend is authoritative. Every mutation is reduced against the cached
//! state, replayed against the backend, and only then committed to the store.
//! A failed backend write leaves the store untouched, so the caller can retry
//! with the same entity IDs.

use futures_util::{stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::db::{load_collection, Backend, Collection};
use crate::error::AppError;
use crate::store::{Action, Change, EntityStore, StoreState};

/// Maximum concurrent backend writes for one transition.
const MAX_CONCURRENT_WRITES: usize = 8;

/// Where the store's state came from at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrateSource {
    /// Loaded from the backend.
    Remote,
    /// The backend was empty and received the cached state.
    Seeded,
    /// The backend was unreachable; the snapshot (or seed data) stays.
    Cached,
}

/// Write-through coordinator shared by all handlers.
pub struct SyncService {
    backend: Arc<dyn Backend>,
    store: Arc<EntityStore>,
}

impl SyncService {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<EntityStore>) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Apply an action: reduce, write to the backend, then commit.
    pub async fn apply(&self, action: Action) -> Result<Vec<Change>, AppError> {
        let _guard = self.store.begin_write().await;
        let transition = self.store.prepare(&action)?;

        if let Err(e) = self.write_changes(&transition.state, &transition.changes).await {
            tracing::warn!(
                action = action.name(),
                error = %e,
                "Backend write failed, store left unchanged"
            );
            return Err(e);
        }

        let changes = self.store.commit(transition);
        tracing::debug!(
            action = action.name(),
            changes = changes.len(),
            "Applied store action"
        );
        Ok(changes)
    }

    /// Replay changed documents against the backend.
    ///
    /// Inserts and updates are both written as full-document upserts, so a
    /// retry after a partial failure converges instead of failing on
    /// documents that already made it.
    async fn write_changes(&self, state: &StoreState, changes: &[Change]) -> Result<(), AppError> {
        let writes = changes
            .iter()
            .map(|change| PendingWrite::from_change(state, change))
            .collect::<Result<Vec<_>, AppError>>()?;

        stream::iter(writes)
            .map(|write| {
                let backend = Arc::clone(&self.backend);
                async move {
                    match write {
                        PendingWrite::Upsert { collection, id, doc } => {
                            backend.update(collection.name(), &id, &doc).await
                        }
                        PendingWrite::Delete { collection, id } => {
                            backend.delete(collection.name(), &id).await
                        }
                    }
                }
            })
            .buffer_unordered(MAX_CONCURRENT_WRITES)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    /// Load every collection from the backend into the store.
    ///
    /// With `seed_on_empty`, an empty backend receives the cached state
    /// instead (the snapshot, or the seed dataset on first run).
    pub async fn hydrate(&self, seed_on_empty: bool) -> Result<HydrateSource, AppError> {
        self.store.set_loading(true);

        let remote = match self.load_remote().await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(error = %e, "Backend unavailable, serving cached state");
                self.store.set_loading(false);
                return Ok(HydrateSource::Cached);
            }
        };

        if remote.is_empty() && seed_on_empty {
            let _guard = self.store.begin_write().await;
            let cached = self.store.snapshot();
            let result = self.seed_backend(&cached).await;
            self.store.set_loading(false);
            result?;
            tracing::info!(
                roasters = cached.roasters.len(),
                beans = cached.beans.len(),
                "Seeded empty backend from cached state"
            );
            return Ok(HydrateSource::Seeded);
        }

        tracing::info!(
            users = remote.users.len(),
            roasters = remote.roasters.len(),
            beans = remote.beans.len(),
            reviews = remote.reviews.len(),
            "Hydrated entity store from backend"
        );
        self.store
            .dispatch(Action::Hydrate(Box::new(remote)))
            .await?;
        Ok(HydrateSource::Remote)
    }

    async fn load_remote(&self) -> Result<StoreState, AppError> {
        let backend = self.backend.as_ref();
        let (users, roasters, beans, reviews, review_likes, review_comments) = tokio::try_join!(
            load_collection(backend, Collection::Users),
            load_collection(backend, Collection::Roasters),
            load_collection(backend, Collection::Beans),
            load_collection(backend, Collection::Reviews),
            load_collection(backend, Collection::ReviewLikes),
            load_collection(backend, Collection::ReviewComments),
        )?;

        Ok(StoreState {
            users,
            roasters,
            beans,
            reviews,
            review_likes,
            review_comments,
            loading: false,
        })
    }

    async fn seed_backend(&self, state: &StoreState) -> Result<(), AppError> {
        let documents = all_documents(state)?;

        stream::iter(documents)
            .map(|(collection, id, doc)| {
                let backend = Arc::clone(&self.backend);
                async move { backend.insert(collection.name(), &id, &doc).await }
            })
            .buffer_unordered(MAX_CONCURRENT_WRITES)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }
}

/// A backend write with its document already serialized.
enum PendingWrite {
    Upsert {
        collection: Collection,
        id: String,
        doc: Value,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

impl PendingWrite {
    fn from_change(state: &StoreState, change: &Change) -> Result<Self, AppError> {
        match change {
            Change::Insert { collection, id } | Change::Update { collection, id } => {
                match document(state, *collection, id)? {
                    Some(doc) => Ok(Self::Upsert {
                        collection: *collection,
                        id: id.clone(),
                        doc,
                    }),
                    None => Err(AppError::Internal(anyhow::anyhow!(
                        "Changed document {}/{} missing from state",
                        collection.name(),
                        id
                    ))),
                }
            }
            Change::Delete { collection, id } => Ok(Self::Delete {
                collection: *collection,
                id: id.clone(),
            }),
        }
    }
}

fn to_document<T: Serialize>(entity: &T) -> Result<Value, AppError> {
    serde_json::to_value(entity)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize document: {}", e)))
}

/// The current document for `collection`/`id`, if present.
fn document(state: &StoreState, collection: Collection, id: &str) -> Result<Option<Value>, AppError> {
    match collection {
        Collection::Users => state.users.get(id).map(to_document).transpose(),
        Collection::Roasters => state.roasters.get(id).map(to_document).transpose(),
        Collection::Beans => state.beans.get(id).map(to_document).transpose(),
        Collection::Reviews => state.reviews.get(id).map(to_document).transpose(),
        Collection::ReviewLikes => state.review_likes.get(id).map(to_document).transpose(),
        Collection::ReviewComments => state.review_comments.get(id).map(to_document).transpose(),
    }
}

fn all_documents(state: &StoreState) -> Result<Vec<(Collection, String, Value)>, AppError> {
    let mut documents = Vec::new();
    for collection in Collection::ALL {
        let ids: Vec<&String> = match collection {
            Collection::Users => state.users.keys().collect(),
            Collection::Roasters => state.roasters.keys().collect(),
            Collection::Beans => state.beans.keys().collect(),
            Collection::Reviews => state.reviews.keys().collect(),
            Collection::ReviewLikes => state.review_likes.keys().collect(),
            Collection::ReviewComments => state.review_comments.keys().collect(),
        };
        for id in ids {
            if let Some(doc) = document(state, collection, id)? {
                documents.push((collection, id.clone(), doc));
            }
        }
    }
    Ok(documents)
}
