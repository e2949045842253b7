// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Snapshot persistence of the entity store.
//!
//! The whole state is written as one versioned JSON document into a single
//! named slot. A snapshot with another version, or one that fails to parse,
//! is rejected rather than loaded half-understood.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::StoreState;

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors from snapshot storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to access snapshot: {0}")]
    Io(String),

    #[error("Failed to parse snapshot: {0}")]
    Parse(String),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

/// A single named storage slot holding the serialized snapshot.
pub trait SnapshotSlot: Send + Sync {
    /// Read the stored snapshot, `None` when the slot is empty.
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored snapshot.
    fn save(&self, contents: &str) -> Result<(), StorageError>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    state: &'a StoreState,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    state: serde_json::Value,
}

/// Serialize `state` into a versioned snapshot document.
pub fn encode(state: &StoreState) -> Result<String, StorageError> {
    serde_json::to_string(&EnvelopeRef {
        version: SNAPSHOT_VERSION,
        state,
    })
    .map_err(|e| StorageError::Parse(e.to_string()))
}

/// Parse a snapshot document, checking its version before its contents.
pub fn decode(contents: &str) -> Result<StoreState, StorageError> {
    let envelope: Envelope =
        serde_json::from_str(contents).map_err(|e| StorageError::Parse(e.to_string()))?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(StorageError::Version {
            found: envelope.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    serde_json::from_value(envelope.state).map_err(|e| StorageError::Parse(e.to_string()))
}

/// Snapshot slot backed by a file on disk.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSlot for FileSlot {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }

        // Write then rename so a crash never leaves a truncated snapshot.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents).map_err(|e| StorageError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StorageError::Io(e.to_string()))
    }
}

/// In-memory slot for tests.
#[derive(Default)]
pub struct MemorySlot {
    contents: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with raw contents.
    pub fn with_contents(contents: &str) -> Self {
        Self {
            contents: Mutex::new(Some(contents.to_string())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SnapshotSlot for MemorySlot {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents())
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        *self
            .contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::seed::seed_state;

    #[test]
    fn test_snapshot_roundtrip_is_deep_equal() {
        let state = seed_state();
        let encoded = encode(&state).unwrap();
        assert_eq!(decode(&encoded).unwrap(), state);
    }

    #[test]
    fn test_loading_flag_is_not_persisted() {
        let mut state = seed_state();
        state.loading = true;

        let decoded = decode(&encode(&state).unwrap()).unwrap();
        assert!(!decoded.loading);
    }

    #[test]
    fn test_other_version_is_rejected() {
        let contents = r#"{"version": 0, "state": {}}"#;
        assert!(matches!(
            decode(contents),
            Err(StorageError::Version {
                found: 0,
                expected: SNAPSHOT_VERSION
            })
        ));
    }

    #[test]
    fn test_unversioned_or_malformed_snapshot_is_rejected() {
        // Shape of an unversioned snapshot: the bare state.
        assert!(matches!(
            decode(r#"{"users": {}, "roasters": {}}"#),
            Err(StorageError::Parse(_))
        ));
        assert!(matches!(
            decode(r#"{"version": 1, "state": {"beans": {"1": {"id": 7}}}}"#),
            Err(StorageError::Parse(_))
        ));
    }

    #[test]
    fn test_file_slot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("nested").join("store.json"));

        assert_eq!(slot.load().unwrap(), None);
        slot.save("{\"version\":1}").unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("{\"version\":1}"));
    }
}
