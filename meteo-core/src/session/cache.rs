//! TTL response cache persisted as a single JSON file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub stored_at: DateTime<Utc>,
    pub status: u16,
    pub body: String,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        // A clock that went backwards makes the entry look fresh.
        let age = (now - self.stored_at).to_std().unwrap_or(Duration::ZERO);
        age >= ttl
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    path: Option<PathBuf>,
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl ResponseCache {
    /// Open the cache file at `path`, dropping entries that already expired.
    ///
    /// A missing file starts an empty cache. An unreadable or corrupt one is
    /// logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let mut entries = load_entries(&path);

        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(ttl, now));
        if before != entries.len() {
            tracing::debug!(purged = before - entries.len(), "Dropped expired cache entries");
        }

        Self { path: Some(path), ttl, entries }
    }

    /// A cache that lives only as long as the process.
    pub fn in_memory(ttl: Duration) -> Self {
        Self { path: None, ttl, entries: HashMap::new() }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired(self.ttl, now))
    }

    pub fn insert(&mut self, key: String, status: u16, body: String) {
        self.insert_at(key, status, body, Utc::now());
    }

    /// Store a response and drop whatever expired since the last write.
    pub fn insert_at(&mut self, key: String, status: u16, body: String, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| !entry.is_expired(ttl, now));
        self.entries.insert(key, CacheEntry { stored_at: now, status, body });
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let result = serde_json::to_string(&self.entries)
            .map_err(std::io::Error::other)
            .and_then(|json| {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, json)
            });

        if let Err(e) = result {
            tracing::warn!("Failed to write HTTP cache {}: {}", path.display(), e);
        }
    }
}

fn load_entries(path: &Path) -> HashMap<String, CacheEntry> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            tracing::warn!("Failed to read HTTP cache {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Ignoring corrupt HTTP cache {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}
