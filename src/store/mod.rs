// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Entity store: the in-memory cache of every collection.
//!
//! State changes only through [`reduce`]. Writers hold the store's write
//! guard across prepare -> backend write -> commit, so transitions never
//! interleave. Every commit is persisted to the snapshot slot.

pub mod action;
pub mod reduce;
pub mod seed;
pub mod snapshot;
pub mod state;

pub use action::{Action, ProfileUpdate, ReviewUpdate};
pub use reduce::{reduce, Change, StoreError, Transition};
pub use snapshot::{FileSlot, MemorySlot, SnapshotSlot, StorageError};
pub use state::StoreState;

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, MutexGuard};

/// Shared handle to the cached state.
pub struct EntityStore {
    state: RwLock<StoreState>,
    slot: Arc<dyn SnapshotSlot>,
    writer: Mutex<()>,
}

impl EntityStore {
    /// Open the store from its snapshot slot, falling back to the seed dataset
    /// when the slot is empty or holds an unusable snapshot.
    pub fn open(slot: Arc<dyn SnapshotSlot>) -> Self {
        let state = match slot.load() {
            Ok(Some(contents)) => match snapshot::decode(&contents) {
                Ok(state) => {
                    tracing::info!(
                        roasters = state.roasters.len(),
                        beans = state.beans.len(),
                        reviews = state.reviews.len(),
                        "Rehydrated entity store from snapshot"
                    );
                    state
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unusable snapshot, using seed data");
                    seed::seed_state()
                }
            },
            Ok(None) => {
                tracing::info!("No snapshot found, using seed data");
                seed::seed_state()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read snapshot, using seed data");
                seed::seed_state()
            }
        };

        Self::with_state(state, slot)
    }

    /// Store with an explicit initial state (not persisted until the first commit).
    pub fn with_state(state: StoreState, slot: Arc<dyn SnapshotSlot>) -> Self {
        Self {
            state: RwLock::new(state),
            slot,
            writer: Mutex::new(()),
        }
    }

    /// Run a read-only query against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.read(StoreState::clone)
    }

    /// Acquire the write guard. Hold it from `prepare` until `commit`.
    pub async fn begin_write(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Reduce `action` against the current state without applying it.
    pub fn prepare(&self, action: &Action) -> Result<Transition, StoreError> {
        self.read(|state| reduce(state, action))
    }

    /// Install a prepared transition and persist the new state.
    pub fn commit(&self, transition: Transition) -> Vec<Change> {
        let encoded = snapshot::encode(&transition.state);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = transition.state;

        // A failed save only costs the snapshot; the in-memory state stays valid.
        match encoded.and_then(|contents| self.slot.save(&contents)) {
            Ok(()) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to persist store snapshot"),
        }

        transition.changes
    }

    /// Apply an action locally: prepare and commit under the write guard.
    pub async fn dispatch(&self, action: Action) -> Result<Vec<Change>, StoreError> {
        let _guard = self.begin_write().await;
        let transition = self.prepare(&action)?;
        tracing::debug!(
            action = action.name(),
            changes = transition.changes.len(),
            "Dispatched store action"
        );
        Ok(self.commit(transition))
    }

    /// Flag an in-progress hydration. Not persisted.
    pub fn set_loading(&self, loading: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .loading = loading;
    }
}
