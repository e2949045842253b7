// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend for local development and tests.
//!
//! Mirrors the query semantics of the hosted backend closely enough for the
//! application: equality filters on top-level fields, one ordering, a limit.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use super::{Backend, Direction, Query};
use crate::error::AppError;

/// Backend that keeps every collection in memory.
#[derive(Default)]
pub struct MemoryBackend {
    collections: DashMap<String, BTreeMap<String, Value>>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a network outage: every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Number of documents currently stored in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Raw document lookup, for tests and diagnostics.
    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(AppError::Database(
                "Backend unreachable (offline)".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, collection: &str, query: &Query) -> Result<Vec<Value>, AppError> {
        self.check_online()?;

        let mut documents: Vec<Value> = match self.collections.get(collection) {
            Some(docs) => docs
                .values()
                .filter(|doc| {
                    query
                        .filters
                        .iter()
                        .all(|(field, value)| doc.get(field) == Some(value))
                })
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if let Some((field, direction)) = &query.order {
            documents.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            documents.truncate(limit as usize);
        }

        Ok(documents)
    }

    async fn insert(&self, collection: &str, id: &str, document: &Value) -> Result<(), AppError> {
        self.check_online()?;

        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(AppError::Database(format!(
                "Document {collection}/{id} already exists"
            )));
        }
        docs.insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, document: &Value) -> Result<(), AppError> {
        self.check_online()?;

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.check_online()?;

        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

/// Order JSON scalars: missing < null < bool < number < string.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
