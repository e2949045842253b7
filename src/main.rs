// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Brewlog API Server
//!
//! Serves the coffee review API and the page bundle, caching the remote
//! backend in an entity store persisted to a local snapshot.

use brewlog::{
    auth::{AuthApi, GoTrueClient, LocalAuth},
    config::Config,
    db::{Backend, FirestoreDb, MemoryBackend},
    services::HydrateSource,
    store::{EntityStore, FileSlot},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Brewlog API");

    // Remote backend
    let backend: Arc<dyn Backend> = if config.use_firestore {
        Arc::new(FirestoreDb::new(&config.gcp_project_id).await?)
    } else {
        tracing::info!("Using in-process backend");
        Arc::new(MemoryBackend::new())
    };

    // Identity service
    let auth: Arc<dyn AuthApi> = match (&config.identity_url, &config.identity_api_key) {
        (Some(url), Some(key)) => {
            tracing::info!(url = %url, "Using hosted identity service");
            Arc::new(GoTrueClient::new(url, key))
        }
        _ => {
            tracing::info!("Using built-in identity service");
            Arc::new(LocalAuth::new(&config.jwt_signing_key))
        }
    };

    // Entity store, rehydrated from its snapshot
    tracing::info!(path = %config.snapshot_path.display(), "Opening entity store");
    let store = Arc::new(EntityStore::open(Arc::new(FileSlot::new(
        &config.snapshot_path,
    ))));

    let state = Arc::new(AppState::new(config.clone(), backend, store, auth));

    // Hydrate from the backend; the cached state keeps serving if it fails
    match state.sync.hydrate(config.seed_on_empty).await {
        Ok(HydrateSource::Cached) => {
            tracing::warn!("Serving cached state until the backend is reachable")
        }
        Ok(source) => tracing::info!(source = ?source, "Entity store ready"),
        Err(e) => tracing::error!(error = %e, "Failed to hydrate entity store"),
    }

    // Build router
    let app = brewlog::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("brewlog=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
