// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Brewlog: reviews of coffee beans and roasters.
//!
//! This crate provides the backend API and page host. Its two cores are the
//! session synchronizer in [`auth`] and the entity store in [`store`], a
//! write-through cache in front of the remote backend in [`db`].

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use auth::AuthApi;
use config::Config;
use db::Backend;
use services::SyncService;
use std::sync::Arc;
use store::EntityStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub store: Arc<EntityStore>,
    pub sync: SyncService,
    pub auth: Arc<dyn AuthApi>,
}

impl AppState {
    pub fn new(
        config: Config,
        backend: Arc<dyn Backend>,
        store: Arc<EntityStore>,
        auth: Arc<dyn AuthApi>,
    ) -> Self {
        let sync = SyncService::new(backend.clone(), store.clone());
        Self {
            config,
            backend,
            store,
            sync,
            auth,
        }
    }
}
