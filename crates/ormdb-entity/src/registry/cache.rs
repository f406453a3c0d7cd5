//! Definition cache backends.
//!
//! The registry caches the serialized [`DefinitionSchema`] of each class
//! under `definitions.<class>`, so a cache can outlive the registry (or be
//! shared between processes) without serializing any code.
//!
//! [`DefinitionSchema`]: crate::catalog::DefinitionSchema

use std::fmt;

use dashmap::DashMap;
use tracing::trace;

use crate::error::Result;

/// Key prefix of cached definition schemas.
pub const CACHE_PREFIX: &str = "definitions";

/// Cache key for a class.
pub fn cache_key(class: &str) -> String {
    format!("{}.{}", CACHE_PREFIX, class)
}

/// Compute-if-absent store of serialized schemas.
pub trait DefinitionCache: Send + Sync + fmt::Debug {
    /// Return the entry for `key`, calling `producer` and storing its output
    /// when there is none.
    fn fetch(&self, key: &str, producer: &mut dyn FnMut() -> Result<String>) -> Result<String>;

    /// Drop the entry for `key`.
    fn remove(&self, _key: &str) {}

    /// Drop every entry.
    fn clear(&self) {}
}

/// Cache that stores nothing; every fetch calls the producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl DefinitionCache for NullCache {
    fn fetch(&self, _key: &str, producer: &mut dyn FnMut() -> Result<String>) -> Result<String> {
        producer()
    }
}

/// In-process cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry directly.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Read an entry.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DefinitionCache for MemoryCache {
    fn fetch(&self, key: &str, producer: &mut dyn FnMut() -> Result<String>) -> Result<String> {
        if let Some(hit) = self.get(key) {
            trace!(key, "definition cache hit");
            return Ok(hit);
        }
        let value = producer()?;
        Ok(self
            .entries
            .entry(key.to_string())
            .or_insert(value)
            .value()
            .clone())
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
