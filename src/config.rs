//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Where the entity store snapshot is written
    pub snapshot_path: PathBuf,
    /// Directory holding the page bundle
    pub static_dir: PathBuf,
    /// Hosted identity service; the built-in one is used when unset
    pub identity_url: Option<String>,
    pub identity_api_key: Option<String>,
    /// Use Firestore as the backend instead of the in-process one
    pub use_firestore: bool,
    /// Write the seed dataset into an empty backend at startup
    pub seed_on_empty: bool,
}

impl Config {
    /// Config for tests: in-process backend and identity service.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            snapshot_path: PathBuf::from("data/store.json"),
            static_dir: PathBuf::from("web/dist"),
            identity_url: None,
            identity_api_key: None,
            use_firestore: false,
            seed_on_empty: true,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let identity_url = non_empty("IDENTITY_URL");
        let identity_api_key = non_empty("IDENTITY_API_KEY");
        if identity_url.is_some() && identity_api_key.is_none() {
            return Err(ConfigError::Missing("IDENTITY_API_KEY"));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            snapshot_path: env::var("STORE_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/store.json")),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("web/dist")),
            identity_url,
            identity_api_key,
            use_firestore: flag("USE_FIRESTORE", false)?,
            seed_on_empty: flag("SEED_ON_EMPTY", true)?,
        })
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match non_empty(name).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no") => Ok(false),
        Some(_) => Err(ConfigError::Invalid(name)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
